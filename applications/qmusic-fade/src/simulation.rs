//! Playlist simulation
//!
//! Plays a list of track durations against a [`MemoryPlayer`] on a fixed
//! position tick and forwards every tick, track change and slider move to a
//! [`CrossfadeController`], the way a media player UI would.

use crate::config::{HostConfig, SimulationSettings};
use crate::error::{HostError, Result};
use crate::timefmt::format_position;
use qmusic_crossfade::volume::{self, MAX_VOLUME};
use qmusic_crossfade::{
    CrossfadeController, CrossfadeEvent, CrossfadeState, MemoryPlayer, PlaybackObserver,
    RampDirection,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationReport {
    /// Tracks started, including a skipped one
    pub tracks_played: usize,

    /// Position ticks delivered to the controller
    pub ticks: u64,

    /// Playback time covered by the ticks
    pub elapsed_ms: i64,

    /// Whether the configured skip happened
    pub skipped: bool,

    /// Fade-outs started
    pub fade_outs: usize,

    /// Fade-ins started
    pub fade_ins: usize,

    /// Fade-outs stopped by a track change
    pub aborted_fade_outs: usize,

    /// Player volume after the last ramp finished
    pub final_volume: u8,

    /// Controller bookkeeping after shutdown
    pub final_state: CrossfadeState,

    /// Every event the controller emitted, in order
    pub events: Vec<CrossfadeEvent>,
}

pub struct Simulation {
    settings: SimulationSettings,
    player: Arc<MemoryPlayer>,
    controller: CrossfadeController,
}

impl Simulation {
    /// Build the player and controller on the current tokio runtime
    pub fn new(config: &HostConfig) -> Result<Self> {
        config.validate()?;

        let player = Arc::new(MemoryPlayer::new(config.player.volume, Some(0)));
        let controller = CrossfadeController::new(player.clone(), config.crossfade.clone())?;

        Ok(Self {
            settings: config.simulation.clone(),
            player,
            controller,
        })
    }

    pub fn player(&self) -> &Arc<MemoryPlayer> {
        &self.player
    }

    pub fn controller(&self) -> &CrossfadeController {
        &self.controller
    }

    pub async fn run(&self) -> Result<SimulationReport> {
        self.run_with(|_| {}).await
    }

    /// Play the whole playlist, handing each controller event to `on_event`
    ///
    /// Returns once the last track ended and every ramp has finished.
    pub async fn run_with<F>(&self, mut on_event: F) -> Result<SimulationReport>
    where
        F: FnMut(&CrossfadeEvent),
    {
        let mut events = self.controller.subscribe();
        let mut collected = Vec::new();

        let tick_ms = i64::try_from(self.settings.tick_ms).map_err(|_| {
            HostError::Config(format!("Tick of {} ms is too long", self.settings.tick_ms))
        })?;
        let mut interval = tokio::time::interval(Duration::from_millis(self.settings.tick_ms));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut ticks = 0u64;
        let mut elapsed_ms = 0i64;
        let mut skipped = false;
        let mut volume_change = self.settings.volume_change;

        let crossfade = self.controller.config();
        info!(
            fade_out = ?crossfade.ramp_duration(RampDirection::FadeOut, u32::from(MAX_VOLUME)),
            fade_in = ?crossfade.ramp_duration(RampDirection::FadeIn, u32::from(MAX_VOLUME)),
            "Full ramps"
        );

        for (index, &duration_ms) in self.settings.tracks_ms.iter().enumerate() {
            if index > 0 {
                let current = self.player.advance_track();
                self.controller.on_track_changed(current);
            }

            info!(
                track = index,
                duration = %format_position(duration_ms),
                "Track started"
            );

            let skip_at = self
                .settings
                .skip
                .filter(|skip| skip.track == index)
                .map(|skip| skip.at_ms);

            let mut position_ms = 0i64;
            loop {
                interval.tick().await;
                ticks += 1;

                let level = self.player.volume();
                debug!(
                    track = index,
                    volume = level,
                    db = volume::level_to_db(level),
                    "{} / {}",
                    format_position(position_ms),
                    format_position(duration_ms)
                );
                self.controller.on_position_changed(position_ms, duration_ms);

                if let Some(change) = volume_change {
                    if elapsed_ms >= change.at_ms {
                        info!(volume = change.volume, "Volume slider moved");
                        self.controller.on_user_volume(change.volume)?;
                        volume_change = None;
                    }
                }

                drain(&mut events, &mut collected, &mut on_event);

                if skip_at.is_some_and(|at_ms| position_ms >= at_ms) {
                    info!(
                        track = index,
                        position = %format_position(position_ms),
                        "Skipping to next track"
                    );
                    skipped = true;
                    break;
                }

                position_ms = position_ms.saturating_add(tick_ms);
                elapsed_ms = elapsed_ms.saturating_add(tick_ms);
                if position_ms > duration_ms {
                    break;
                }
            }
        }

        // Playlist exhausted, let the last ramp run out
        while self.controller.is_fading() {
            interval.tick().await;
            drain(&mut events, &mut collected, &mut on_event);
        }

        self.controller.shutdown().await?;
        drain(&mut events, &mut collected, &mut on_event);

        let count = |is_kind: fn(&CrossfadeEvent) -> bool| {
            collected.iter().filter(|event| is_kind(event)).count()
        };
        let fade_outs = count(|e| matches!(e, CrossfadeEvent::FadeOutStarted { .. }));
        let fade_ins = count(|e| matches!(e, CrossfadeEvent::FadeInStarted { .. }));
        let aborted_fade_outs = count(|e| matches!(e, CrossfadeEvent::FadeOutAborted { .. }));

        let report = SimulationReport {
            tracks_played: self
                .player
                .current_track_index()
                .map_or(0, |index| index + 1),
            ticks,
            elapsed_ms,
            skipped,
            fade_outs,
            fade_ins,
            aborted_fade_outs,
            final_volume: self.player.volume(),
            final_state: self.controller.state(),
            events: collected,
        };

        info!(
            tracks = report.tracks_played,
            fade_outs = report.fade_outs,
            fade_ins = report.fade_ins,
            aborted = report.aborted_fade_outs,
            final_volume = report.final_volume,
            "Simulated {} of playback",
            format_position(report.elapsed_ms)
        );

        Ok(report)
    }
}

fn drain<F>(
    events: &mut broadcast::Receiver<CrossfadeEvent>,
    collected: &mut Vec<CrossfadeEvent>,
    on_event: &mut F,
) where
    F: FnMut(&CrossfadeEvent),
{
    loop {
        match events.try_recv() {
            Ok(event) => {
                on_event(&event);
                collected.push(event);
            }
            Err(TryRecvError::Lagged(skipped)) => {
                warn!(skipped, "Dropped crossfade events");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
}
