//! Player collaborator seam
//!
//! The controller never owns the player. The host implements
//! [`PlaybackObserver`] over whatever media framework it uses.

use crate::error::{CrossfadeError, Result};
use crate::volume::MAX_VOLUME;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Player/playlist surface the crossfade controller reads and drives
///
/// Implementations are called from ramp tasks as well as from the host's
/// event thread, hence `Send + Sync`. Calls must not block for long and must
/// not call back into the controller.
#[cfg_attr(test, mockall::automock)]
pub trait PlaybackObserver: Send + Sync {
    /// Current output volume (0-100)
    fn volume(&self) -> u8;

    /// Apply a new output volume (0-100) immediately
    fn set_volume(&self, volume: u8) -> Result<()>;

    /// Current playlist position, `None` when nothing is selected
    fn current_track_index(&self) -> Option<usize>;
}

#[derive(Debug, Default)]
struct MemoryPlayerInner {
    volume: u8,
    track_index: Option<usize>,
    journal: Vec<u8>,
    fail_writes: bool,
}

/// In-memory player used by the simulation host and tests
///
/// Every successful `set_volume` call is appended to a journal so ramps can
/// be inspected step by step.
#[derive(Debug, Default)]
pub struct MemoryPlayer {
    inner: Mutex<MemoryPlayerInner>,
}

impl MemoryPlayer {
    /// Create a player at `volume` positioned on `track_index`
    pub fn new(volume: u8, track_index: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(MemoryPlayerInner {
                volume: volume.min(MAX_VOLUME),
                track_index,
                ..Default::default()
            }),
        }
    }

    fn inner(&self) -> MutexGuard<'_, MemoryPlayerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move the playlist to another track
    pub fn set_track_index(&self, index: Option<usize>) {
        self.inner().track_index = index;
    }

    /// Advance to the next playlist entry and return it
    pub fn advance_track(&self) -> Option<usize> {
        let mut inner = self.inner();
        inner.track_index = Some(inner.track_index.map_or(0, |index| index + 1));
        inner.track_index
    }

    /// Volumes applied through `set_volume`, oldest first
    pub fn journal(&self) -> Vec<u8> {
        self.inner().journal.clone()
    }

    /// Forget recorded volumes
    pub fn clear_journal(&self) {
        self.inner().journal.clear();
    }

    /// Make subsequent `set_volume` calls fail (simulates a lost output device)
    pub fn fail_writes(&self, fail: bool) {
        self.inner().fail_writes = fail;
    }
}

impl PlaybackObserver for MemoryPlayer {
    fn volume(&self) -> u8 {
        self.inner().volume
    }

    fn set_volume(&self, volume: u8) -> Result<()> {
        let mut inner = self.inner();
        if inner.fail_writes {
            return Err(CrossfadeError::Player(
                "output device unavailable".to_string(),
            ));
        }

        let volume = volume.min(MAX_VOLUME);
        inner.volume = volume;
        inner.journal.push(volume);
        Ok(())
    }

    fn current_track_index(&self) -> Option<usize> {
        self.inner().track_index
    }
}
