//! Crossfade state and the position-tick decision

use crate::error::Result;
use crate::ramp::RampOutcome;
use crate::types::{CancelReason, RampDirection};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Snapshot of the controller's fade bookkeeping
///
/// `is_fading` implies `is_transitioning`. `last_volume` is the restore
/// target and is only meaningful while transitioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossfadeState {
    /// From fade-out start until fade-in completes
    pub is_transitioning: bool,

    /// While a ramp is scheduled or stepping
    pub is_fading: bool,

    /// Volume captured when the fade-out started
    pub last_volume: u8,

    /// Playlist index captured when the fade-out started
    pub last_track_index: Option<usize>,
}

impl CrossfadeState {
    /// Idle state remembering the player's current volume
    pub fn new(volume: u8) -> Self {
        Self {
            is_transitioning: false,
            is_fading: false,
            last_volume: volume.min(crate::volume::MAX_VOLUME),
            last_track_index: None,
        }
    }

    /// Decide which ramp, if any, a position tick should start
    ///
    /// Edge-triggered: once a fade-out is underway the same tick decides
    /// nothing, and a fade-in only starts after the previous ramp settled.
    /// Unknown durations (`<= 0`) never start anything.
    pub fn decide(
        &self,
        position_ms: i64,
        duration_ms: i64,
        fade_window_ms: i64,
    ) -> Option<RampDirection> {
        if duration_ms <= 0 {
            return None;
        }

        let threshold = duration_ms.saturating_sub(fade_window_ms);

        if !self.is_transitioning && position_ms > threshold {
            Some(RampDirection::FadeOut)
        } else if self.is_transitioning && !self.is_fading && position_ms < threshold {
            Some(RampDirection::FadeIn)
        } else {
            None
        }
    }

    /// Whether the fading/transitioning invariant holds
    pub fn is_consistent(&self) -> bool {
        !self.is_fading || self.is_transitioning
    }
}

/// Cancellation handle shared between the controller and one ramp task
///
/// The first recorded reason wins.
#[derive(Debug, Clone, Default)]
pub(crate) struct RampControl {
    token: CancellationToken,
    reason: Arc<OnceLock<CancelReason>>,
}

impl RampControl {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn cancel(&self, reason: CancelReason) {
        let _ = self.reason.set(reason);
        self.token.cancel();
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) fn reason(&self) -> CancelReason {
        self.reason.get().copied().unwrap_or(CancelReason::Shutdown)
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// The ramp most recently scheduled
#[derive(Debug)]
pub(crate) struct ActiveRamp {
    pub(crate) generation: u64,
    pub(crate) direction: RampDirection,
    pub(crate) control: RampControl,
    pub(crate) handle: JoinHandle<Result<RampOutcome>>,
}

/// Everything the controller and its ramps share behind one lock
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) state: CrossfadeState,

    /// Bumped for every scheduled ramp and whenever a ramp is detached;
    /// a ramp only touches `state` while its generation is current
    pub(crate) generation: u64,

    pub(crate) active: Option<ActiveRamp>,

    /// Cancelled ramps that may still be winding down
    pub(crate) retired: Vec<JoinHandle<Result<RampOutcome>>>,
}

impl Shared {
    pub(crate) fn new(volume: u8) -> Self {
        Self {
            state: CrossfadeState::new(volume),
            generation: 0,
            active: None,
            retired: Vec::new(),
        }
    }

    /// Cancel the active ramp and stop it from touching shared state
    ///
    /// A ramp that already settled is left in place for `shutdown` to join.
    pub(crate) fn detach_active(&mut self, reason: CancelReason) -> Option<RampDirection> {
        if !self.state.is_fading {
            return None;
        }
        let active = self.active.take()?;
        active.control.cancel(reason);
        self.retired.push(active.handle);
        self.generation += 1;
        self.state.is_fading = false;
        Some(active.direction)
    }
}

/// Lock shared state, recovering from a poisoned mutex
///
/// Every writer leaves `Shared` consistent between statements, so a panic
/// elsewhere does not invalidate it.
pub(crate) fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}
