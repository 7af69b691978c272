//! Crossfade controller for automatic track transitions
//!
//! Ducks the volume when playback enters the last second of a track and
//! restores it once the next track is comfortably underway:
//! - Position ticks decide when to start a fade-out or fade-in
//! - Ramps run as background tokio tasks, one volume unit per tick
//! - A track change mid fade-out stops the ramp and restores the volume
//! - User volume changes follow [`ManualVolumePolicy`]

use crate::error::Result;
use crate::events::CrossfadeEvent;
use crate::player::PlaybackObserver;
use crate::ramp::Ramp;
use crate::state::{self, CrossfadeState, RampControl, Shared};
use crate::types::{CancelReason, CrossfadeConfig, ManualVolumePolicy, RampDirection};
use crate::volume;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Buffered events per subscriber before old ones are dropped
const EVENT_CAPACITY: usize = 64;

/// Crossfade controller
///
/// Callbacks are cheap and never block on a ramp: they take a short lock and
/// hand the stepping to a task on the runtime captured at construction, so
/// they can be called straight from a UI event thread.
pub struct CrossfadeController {
    player: Arc<dyn PlaybackObserver>,
    config: CrossfadeConfig,
    shared: Arc<Mutex<Shared>>,
    runtime: Handle,
    events: broadcast::Sender<CrossfadeEvent>,
}

impl CrossfadeController {
    /// Create a controller on the current tokio runtime
    pub fn new(player: Arc<dyn PlaybackObserver>, config: CrossfadeConfig) -> Result<Self> {
        Self::with_runtime(player, config, Handle::try_current()?)
    }

    /// Create a controller that spawns its ramps on `runtime`
    pub fn with_runtime(
        player: Arc<dyn PlaybackObserver>,
        config: CrossfadeConfig,
        runtime: Handle,
    ) -> Result<Self> {
        config.validate()?;

        let volume = player.volume();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        debug!(volume, ?config, "Crossfade controller created");

        Ok(Self {
            player,
            config,
            shared: Arc::new(Mutex::new(Shared::new(volume))),
            runtime,
            events,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        state::lock(&self.shared)
    }

    /// Get current configuration
    pub fn config(&self) -> &CrossfadeConfig {
        &self.config
    }

    /// Copy of the current fade bookkeeping
    pub fn state(&self) -> CrossfadeState {
        self.lock().state
    }

    /// Check if a ramp is scheduled or stepping
    pub fn is_fading(&self) -> bool {
        self.lock().state.is_fading
    }

    /// Subscribe to crossfade events
    pub fn subscribe(&self) -> broadcast::Receiver<CrossfadeEvent> {
        self.events.subscribe()
    }

    /// Feed a playback position tick
    ///
    /// # Arguments
    /// * `position_ms` - Current position in the track
    /// * `duration_ms` - Track length, `<= 0` when not known yet
    ///
    /// # Returns
    /// The ramp started by this tick, if any
    pub fn on_position_changed(&self, position_ms: i64, duration_ms: i64) -> Option<RampDirection> {
        if !self.config.enabled {
            return None;
        }

        let mut shared = self.lock();
        let direction = shared
            .state
            .decide(position_ms, duration_ms, self.config.fade_window_ms)?;

        if direction == RampDirection::FadeOut {
            shared.state.is_transitioning = true;
            shared.state.last_volume = self.player.volume().min(volume::MAX_VOLUME);
            shared.state.last_track_index = self.player.current_track_index();
        }

        debug!(
            position_ms,
            duration_ms,
            direction = direction.display_name(),
            "Position tick starts ramp"
        );

        self.schedule(&mut shared, direction);
        Some(direction)
    }

    /// Notify the controller that the playlist moved to `index`
    ///
    /// Stops an in-flight fade-out right away instead of waiting for its next
    /// tick to notice; the ramp still restores the pre-fade volume.
    ///
    /// # Returns
    /// True if a fade-out was interrupted
    pub fn on_track_changed(&self, index: Option<usize>) -> bool {
        let shared = self.lock();

        let Some(active) = shared.active.as_ref() else {
            return false;
        };

        let interrupt = shared.state.is_fading
            && active.direction == RampDirection::FadeOut
            && index != shared.state.last_track_index;

        if interrupt {
            debug!(
                ?index,
                generation = active.generation,
                "Track changed, interrupting fade-out"
            );
            active.control.cancel(CancelReason::TrackChanged);
        }

        interrupt
    }

    /// Apply a volume chosen by the user
    ///
    /// With [`ManualVolumePolicy::CancelRamp`] an active ramp is cancelled and
    /// the new volume becomes the restore target for the rest of the
    /// transition; cancelling a fade-in ends the transition outright. With
    /// [`ManualVolumePolicy::FollowRamp`] the ramp keeps running and
    /// overwrites the change on its next tick.
    pub fn on_user_volume(&self, volume: u8) -> Result<()> {
        let volume = volume.min(volume::MAX_VOLUME);
        let mut shared = self.lock();

        if self.config.manual_volume == ManualVolumePolicy::CancelRamp {
            if let Some(direction) = shared.detach_active(CancelReason::UserVolume) {
                info!(
                    volume,
                    direction = direction.display_name(),
                    "User volume cancels ramp"
                );
                // The user's level is final, the next track end may fade again
                if direction == RampDirection::FadeIn {
                    shared.state.is_transitioning = false;
                }
            }
            if shared.state.is_transitioning {
                shared.state.last_volume = volume;
            }
        }

        // Still under the lock so no ramp step can land in between
        self.player.set_volume(volume)
    }

    /// Cancel any ramp and wait for every ramp task to finish
    ///
    /// Returns the first error a joined ramp reported. The controller stays
    /// usable afterwards.
    pub async fn shutdown(&self) -> Result<()> {
        let handles = {
            let mut shared = self.lock();
            let mut handles = std::mem::take(&mut shared.retired);
            if let Some(active) = shared.active.take() {
                active.control.cancel(CancelReason::Shutdown);
                handles.push(active.handle);
            }
            handles
        };

        debug!(tasks = handles.len(), "Shutting down crossfade ramps");

        let mut first_error = None;
        for handle in handles {
            let result = match handle.await {
                Ok(result) => result.map(|_| ()),
                Err(e) => Err(e.into()),
            };
            if let Err(e) = result {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    fn schedule(&self, shared: &mut Shared, direction: RampDirection) {
        shared.retired.retain(|handle| !handle.is_finished());

        // The previous ramp has settled (is_fading was false), keep its
        // handle so shutdown can still collect its result
        if let Some(previous) = shared.active.take() {
            shared.retired.push(previous.handle);
        }

        shared.generation += 1;
        shared.state.is_fading = true;

        let control = RampControl::new();
        let ramp = Ramp {
            direction,
            generation: shared.generation,
            tick: self.config.tick_interval(direction),
            control: control.clone(),
            player: Arc::clone(&self.player),
            shared: Arc::clone(&self.shared),
            events: self.events.clone(),
        };

        debug_assert!(shared.state.is_consistent());
        let handle = self.runtime.spawn(ramp.run());
        shared.active = Some(state::ActiveRamp {
            generation: shared.generation,
            direction,
            control,
            handle,
        });
    }
}

impl Drop for CrossfadeController {
    fn drop(&mut self) {
        let shared = self.lock();
        if let Some(active) = shared.active.as_ref() {
            active.control.cancel(CancelReason::Shutdown);
        }
    }
}
