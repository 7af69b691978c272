//! Volume ramp tasks
//!
//! One tokio task per ramp. Every tick takes the shared lock, decides whether
//! to stop, applies a single one-unit volume step and then sleeps for
//! `1/rate` seconds or until cancelled. Stepping under the lock keeps ramp
//! writes and user volume changes strictly ordered.

use crate::error::Result;
use crate::events::CrossfadeEvent;
use crate::player::PlaybackObserver;
use crate::state::{self, RampControl, Shared};
use crate::types::{CancelReason, RampDirection};
use crate::volume;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// How a ramp ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RampOutcome {
    /// Reached its target volume
    Completed { volume: u8 },

    /// Fade-out stopped because the playlist moved to another track
    Aborted { restored_volume: Option<u8> },

    /// Stopped from outside before reaching the target
    Cancelled { reason: CancelReason, volume: u8 },
}

enum FadeOutStop {
    Silent,
    TrackChanged,
    Cancelled(CancelReason),
}

/// A scheduled ramp, consumed by [`Ramp::run`]
pub(crate) struct Ramp {
    pub(crate) direction: RampDirection,
    pub(crate) generation: u64,
    pub(crate) tick: Duration,
    pub(crate) control: RampControl,
    pub(crate) player: Arc<dyn PlaybackObserver>,
    pub(crate) shared: Arc<Mutex<Shared>>,
    pub(crate) events: broadcast::Sender<CrossfadeEvent>,
}

impl Ramp {
    pub(crate) async fn run(self) -> Result<RampOutcome> {
        let result = match self.direction {
            RampDirection::FadeOut => self.fade_out().await,
            RampDirection::FadeIn => self.fade_in().await,
        };

        self.settle(&result);
        self.report(&result);
        result
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        state::lock(&self.shared)
    }

    fn emit(&self, event: CrossfadeEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    async fn wait_tick(&self) {
        tokio::select! {
            _ = self.control.token().cancelled() => {}
            _ = tokio::time::sleep(self.tick) => {}
        }
    }

    async fn fade_out(&self) -> Result<RampOutcome> {
        let (last_volume, track_index) = {
            let shared = self.lock();
            (shared.state.last_volume, shared.state.last_track_index)
        };

        info!(
            generation = self.generation,
            from_volume = last_volume,
            ?track_index,
            "Fade-out started"
        );
        self.emit(CrossfadeEvent::FadeOutStarted {
            from_volume: last_volume,
            track_index,
        });

        let mut volume = last_volume;
        let mut steps = 0u32;

        let stop = loop {
            {
                let _shared = self.lock();

                if self.control.is_cancelled() {
                    break match self.control.reason() {
                        CancelReason::TrackChanged => FadeOutStop::TrackChanged,
                        reason => FadeOutStop::Cancelled(reason),
                    };
                }
                if volume == 0 {
                    break FadeOutStop::Silent;
                }
                // Checked every tick so a manual skip stops the ramp promptly
                if self.player.current_track_index() != track_index {
                    break FadeOutStop::TrackChanged;
                }

                volume -= 1;
                self.player.set_volume(volume)?;
                steps += 1;
            }

            self.wait_tick().await;
        };

        match stop {
            FadeOutStop::Silent => Ok(RampOutcome::Completed { volume }),
            FadeOutStop::Cancelled(reason) => Ok(RampOutcome::Cancelled { reason, volume }),
            FadeOutStop::TrackChanged => {
                let restored_volume = {
                    let shared = self.lock();
                    // A detached ramp lost the volume to whoever detached it
                    if steps > 0 && shared.generation == self.generation {
                        self.player.set_volume(last_volume)?;
                        Some(last_volume)
                    } else {
                        None
                    }
                };

                Ok(RampOutcome::Aborted { restored_volume })
            }
        }
    }

    async fn fade_in(&self) -> Result<RampOutcome> {
        let target = self.lock().state.last_volume;
        let mut volume = self.player.volume().min(volume::MAX_VOLUME);

        info!(
            generation = self.generation,
            from_volume = volume,
            target_volume = target,
            "Fade-in started"
        );
        self.emit(CrossfadeEvent::FadeInStarted {
            from_volume: volume,
            target_volume: target,
        });

        let cancelled = loop {
            {
                let _shared = self.lock();

                if self.control.is_cancelled() {
                    break Some(self.control.reason());
                }
                if volume == target {
                    break None;
                }

                volume = volume::step_toward(volume, target);
                self.player.set_volume(volume)?;
            }

            self.wait_tick().await;
        };

        Ok(match cancelled {
            Some(reason) => RampOutcome::Cancelled { reason, volume },
            None => RampOutcome::Completed { volume },
        })
    }

    /// Release the fade flags, unless a newer ramp owns them now
    fn settle(&self, result: &Result<RampOutcome>) {
        let mut shared = self.lock();
        if shared.generation != self.generation {
            debug!(
                generation = self.generation,
                current = shared.generation,
                "Detached ramp finished"
            );
            return;
        }

        shared.state.is_fading = false;

        let ends_transition = self.direction == RampDirection::FadeIn
            && matches!(result, Ok(RampOutcome::Completed { .. }) | Err(_));
        if ends_transition {
            shared.state.is_transitioning = false;
        }
    }

    fn report(&self, result: &Result<RampOutcome>) {
        let direction = self.direction;
        let event = match result {
            Ok(RampOutcome::Completed { volume }) => {
                info!(
                    generation = self.generation,
                    volume = *volume,
                    "{} completed",
                    direction.display_name()
                );
                match direction {
                    RampDirection::FadeOut => CrossfadeEvent::FadeOutCompleted,
                    RampDirection::FadeIn => CrossfadeEvent::FadeInCompleted { volume: *volume },
                }
            }
            Ok(RampOutcome::Aborted { restored_volume }) => {
                warn!(
                    generation = self.generation,
                    ?restored_volume,
                    "Track changed during fade-out"
                );
                CrossfadeEvent::FadeOutAborted {
                    restored_volume: *restored_volume,
                }
            }
            Ok(RampOutcome::Cancelled { reason, volume }) => {
                info!(
                    generation = self.generation,
                    ?reason,
                    volume = *volume,
                    "{} cancelled",
                    direction.display_name()
                );
                CrossfadeEvent::RampCancelled {
                    direction,
                    reason: *reason,
                }
            }
            Err(e) => {
                error!(
                    generation = self.generation,
                    "{} failed: {}",
                    direction.display_name(),
                    e
                );
                CrossfadeEvent::RampFailed {
                    direction,
                    message: e.to_string(),
                }
            }
        };

        self.emit(event);
    }
}
