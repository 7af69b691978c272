//! Crossfade Events
//!
//! Broadcast to subscribers so a UI can follow a transition:
//! - Ramp start/finish for both directions
//! - Fade-outs aborted by a track change (volume restored)
//! - Ramps cancelled by the user or by shutdown
//! - Player failures inside a ramp

use crate::types::{CancelReason, RampDirection};
use serde::{Deserialize, Serialize};

/// Events emitted by the crossfade controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CrossfadeEvent {
    /// Fade-out scheduled near the end of a track
    FadeOutStarted {
        /// Volume captured as the restore target
        from_volume: u8,
        /// Playlist index of the ending track
        track_index: Option<usize>,
    },

    /// Fade-out reached silence on the ending track
    FadeOutCompleted,

    /// Playlist moved on mid fade-out
    FadeOutAborted {
        /// Volume written back, `None` if the ramp never stepped
        restored_volume: Option<u8>,
    },

    /// Fade-in scheduled on the next track
    FadeInStarted {
        /// Volume at ramp start
        from_volume: u8,
        /// Pre-fade volume the ramp climbs back to
        target_volume: u8,
    },

    /// Fade-in reached its target, transition over
    FadeInCompleted {
        /// Final volume
        volume: u8,
    },

    /// A ramp stopped because something outside told it to
    RampCancelled {
        direction: RampDirection,
        reason: CancelReason,
    },

    /// The player rejected a volume step
    RampFailed {
        direction: RampDirection,
        message: String,
    },
}

impl CrossfadeEvent {
    /// Direction of the ramp this event belongs to
    pub fn direction(&self) -> RampDirection {
        match self {
            CrossfadeEvent::FadeOutStarted { .. }
            | CrossfadeEvent::FadeOutCompleted
            | CrossfadeEvent::FadeOutAborted { .. } => RampDirection::FadeOut,
            CrossfadeEvent::FadeInStarted { .. } | CrossfadeEvent::FadeInCompleted { .. } => {
                RampDirection::FadeIn
            }
            CrossfadeEvent::RampCancelled { direction, .. }
            | CrossfadeEvent::RampFailed { direction, .. } => *direction,
        }
    }

    /// Whether this event ends a ramp
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            CrossfadeEvent::FadeOutStarted { .. } | CrossfadeEvent::FadeInStarted { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_directions() {
        assert_eq!(
            CrossfadeEvent::FadeOutAborted {
                restored_volume: Some(100)
            }
            .direction(),
            RampDirection::FadeOut
        );
        assert_eq!(
            CrossfadeEvent::FadeInCompleted { volume: 100 }.direction(),
            RampDirection::FadeIn
        );
        assert_eq!(
            CrossfadeEvent::RampCancelled {
                direction: RampDirection::FadeIn,
                reason: CancelReason::UserVolume,
            }
            .direction(),
            RampDirection::FadeIn
        );
    }

    #[test]
    fn only_start_events_are_non_terminal() {
        assert!(!CrossfadeEvent::FadeOutStarted {
            from_volume: 100,
            track_index: Some(0)
        }
        .is_terminal());
        assert!(!CrossfadeEvent::FadeInStarted {
            from_volume: 0,
            target_volume: 100
        }
        .is_terminal());
        assert!(CrossfadeEvent::FadeOutCompleted.is_terminal());
        assert!(CrossfadeEvent::RampFailed {
            direction: RampDirection::FadeOut,
            message: "gone".to_string()
        }
        .is_terminal());
    }

    #[test]
    fn events_serialize_with_tag() {
        let json = serde_json::to_string(&CrossfadeEvent::FadeOutStarted {
            from_volume: 90,
            track_index: Some(3),
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"event":"fade_out_started","from_volume":90,"track_index":3}"#
        );

        let json = serde_json::to_string(&CrossfadeEvent::RampCancelled {
            direction: RampDirection::FadeIn,
            reason: CancelReason::Shutdown,
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"event":"ramp_cancelled","direction":"fade_in","reason":"shutdown"}"#
        );
    }
}
