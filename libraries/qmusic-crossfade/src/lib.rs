//! QMusic - Crossfade Control
//!
//! Toolkit-independent volume crossfade for track transitions.
//!
//! This crate provides:
//! - End-of-track detection from position ticks (1s fade window)
//! - Linear one-unit volume ramps on background tokio tasks
//! - Fade-out abort and volume restore when the track changes mid-fade
//! - Explicit precedence between user volume changes and active ramps
//! - Cancellable ramps for clean shutdown
//! - Broadcast events for UI feedback
//!
//! # Architecture
//!
//! `qmusic-crossfade` knows nothing about widgets or media frameworks. The
//! host implements [`PlaybackObserver`] over its player and forwards
//! position, track and volume-slider events to a [`CrossfadeController`].
//!
//! # Example
//!
//! ```rust
//! use qmusic_crossfade::{CrossfadeConfig, CrossfadeController, MemoryPlayer, PlaybackObserver};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread", start_paused = true)]
//! # async fn main() -> qmusic_crossfade::Result<()> {
//! let player = Arc::new(MemoryPlayer::new(100, Some(0)));
//! let controller = CrossfadeController::new(player.clone(), CrossfadeConfig::default())?;
//!
//! // Last second of a 10s track: volume ramps down to silence
//! controller.on_position_changed(9_100, 10_000);
//! tokio::time::sleep(Duration::from_secs(1)).await;
//! assert_eq!(player.volume(), 0);
//!
//! // Next track is underway: volume ramps back up
//! player.advance_track();
//! controller.on_position_changed(50, 8_000);
//! tokio::time::sleep(Duration::from_secs(1)).await;
//! assert_eq!(player.volume(), 100);
//!
//! controller.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod crossfade;
mod error;
pub mod events;
mod player;
mod ramp;
mod state;
pub mod types;
pub mod volume;

// Public exports
pub use crossfade::CrossfadeController;
pub use error::{CrossfadeError, Result};
pub use events::CrossfadeEvent;
pub use player::{MemoryPlayer, PlaybackObserver};
pub use ramp::RampOutcome;
pub use state::CrossfadeState;
pub use types::{CancelReason, CrossfadeConfig, ManualVolumePolicy, RampDirection};
