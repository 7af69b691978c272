//! Core types for crossfade control

use crate::error::{CrossfadeError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Trailing part of a track (ms) during which a fade-out may start
pub const DEFAULT_FADE_WINDOW_MS: i64 = 1000;

/// Volume steps per second for both ramps
pub const DEFAULT_RAMP_RATE_HZ: u32 = 200;

/// Upper bound for ramp rates (one step per millisecond)
pub const MAX_RAMP_RATE_HZ: u32 = 1000;

/// Direction of a volume ramp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RampDirection {
    /// Volume stepped down toward silence
    FadeOut,

    /// Volume stepped back up toward the pre-fade level
    FadeIn,
}

impl RampDirection {
    /// Get a human-readable name for the direction
    pub fn display_name(&self) -> &'static str {
        match self {
            RampDirection::FadeOut => "fade-out",
            RampDirection::FadeIn => "fade-in",
        }
    }
}

/// Why a ramp was stopped from outside
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// The playlist moved to another track while fading out
    TrackChanged,

    /// The user moved the volume slider
    UserVolume,

    /// The controller is shutting down
    Shutdown,
}

/// What happens when the user changes volume while a ramp is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManualVolumePolicy {
    /// User input cancels the ramp and becomes the restore target
    #[default]
    CancelRamp,

    /// The ramp keeps going and overwrites the user's change on its next tick
    FollowRamp,
}

/// Configuration for the crossfade controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossfadeConfig {
    /// Whether position ticks may start ramps at all (default: true)
    pub enabled: bool,

    /// Fade window in milliseconds (default: 1000)
    pub fade_window_ms: i64,

    /// Fade-out steps per second (default: 200)
    pub fade_out_rate_hz: u32,

    /// Fade-in steps per second (default: 200)
    pub fade_in_rate_hz: u32,

    /// Precedence between the volume slider and an active ramp
    pub manual_volume: ManualVolumePolicy,
}

impl Default for CrossfadeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fade_window_ms: DEFAULT_FADE_WINDOW_MS,
            fade_out_rate_hz: DEFAULT_RAMP_RATE_HZ,
            fade_in_rate_hz: DEFAULT_RAMP_RATE_HZ,
            manual_volume: ManualVolumePolicy::CancelRamp,
        }
    }
}

impl CrossfadeConfig {
    /// Check rates and fade window
    pub fn validate(&self) -> Result<()> {
        for (name, rate) in [
            ("fade_out_rate_hz", self.fade_out_rate_hz),
            ("fade_in_rate_hz", self.fade_in_rate_hz),
        ] {
            if rate == 0 || rate > MAX_RAMP_RATE_HZ {
                return Err(CrossfadeError::InvalidConfig(format!(
                    "{} must be within 1..={}, got {}",
                    name, MAX_RAMP_RATE_HZ, rate
                )));
            }
        }

        if self.fade_window_ms < 0 {
            return Err(CrossfadeError::InvalidConfig(format!(
                "fade_window_ms must not be negative, got {}",
                self.fade_window_ms
            )));
        }

        Ok(())
    }

    /// Steps per second for a ramp direction
    pub fn rate_hz(&self, direction: RampDirection) -> u32 {
        match direction {
            RampDirection::FadeOut => self.fade_out_rate_hz,
            RampDirection::FadeIn => self.fade_in_rate_hz,
        }
    }

    /// Wait between two volume steps
    pub fn tick_interval(&self, direction: RampDirection) -> Duration {
        let rate = u64::from(self.rate_hz(direction).max(1));
        Duration::from_nanos(1_000_000_000 / rate)
    }

    /// Wall time a ramp of `steps` volume units takes
    ///
    /// A full 100-step ramp at the default rate lasts 500ms.
    pub fn ramp_duration(&self, direction: RampDirection, steps: u32) -> Duration {
        self.tick_interval(direction) * steps
    }
}
