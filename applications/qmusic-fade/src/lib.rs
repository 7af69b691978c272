//! QMusic Fade Library
//!
//! Headless host for the crossfade controller: layered configuration and a
//! simulated playlist that feeds position, track and volume signals to it.
//!
//! This library exposes the host components for testing purposes.

pub mod config;
pub mod error;
pub mod simulation;
pub mod timefmt;

// Re-export commonly used types for convenience
pub use config::{HostConfig, PlayerSettings, SimulationSettings, TrackSkip, VolumeChange};
pub use error::{HostError, Result};
pub use simulation::{Simulation, SimulationReport};
