//! Property-based tests for the crossfade decision and volume stepping
//!
//! Uses proptest to check the trigger rules and ramp arithmetic across
//! arbitrary positions, durations and volumes.

use proptest::prelude::*;
use qmusic_crossfade::volume::{self, MAX_VOLUME};
use qmusic_crossfade::{
    CrossfadeConfig, CrossfadeController, CrossfadeState, MemoryPlayer, PlaybackObserver,
    RampDirection,
};
use std::sync::Arc;
use std::time::Duration;

const WINDOW: i64 = 1000;

// ===== Helpers =====

fn arbitrary_state() -> impl Strategy<Value = CrossfadeState> {
    (any::<bool>(), any::<bool>(), 0u8..=100).prop_map(|(transitioning, fading, volume)| {
        CrossfadeState {
            is_transitioning: transitioning || fading,
            is_fading: fading,
            last_volume: volume,
            last_track_index: Some(0),
        }
    })
}

// ===== Property Tests =====

proptest! {
    /// Property: An idle state fades out exactly inside the last second
    #[test]
    fn idle_fades_out_only_in_window(
        duration in 1i64..3_600_000,
        position in -10_000i64..3_700_000,
    ) {
        let state = CrossfadeState::new(100);
        let decided = state.decide(position, duration, WINDOW);

        if position > duration - WINDOW {
            prop_assert_eq!(decided, Some(RampDirection::FadeOut));
        } else {
            prop_assert_eq!(decided, None);
        }
    }

    /// Property: Unknown durations never start a ramp
    #[test]
    fn unknown_duration_decides_nothing(
        state in arbitrary_state(),
        duration in i64::MIN..=0,
        position in any::<i64>(),
    ) {
        prop_assert_eq!(state.decide(position, duration, WINDOW), None);
    }

    /// Property: Nothing starts while a ramp is in flight
    #[test]
    fn fading_state_decides_nothing(
        duration in any::<i64>(),
        position in any::<i64>(),
    ) {
        let state = CrossfadeState {
            is_transitioning: true,
            is_fading: true,
            last_volume: 100,
            last_track_index: None,
        };
        prop_assert_eq!(state.decide(position, duration, WINDOW), None);
    }

    /// Property: The exact threshold position never triggers either ramp
    #[test]
    fn threshold_is_exclusive(state in arbitrary_state(), duration in 1i64..3_600_000) {
        prop_assert_eq!(state.decide(duration - WINDOW, duration, WINDOW), None);
    }

    /// Property: Fade-in needs a settled transition and a position before the window
    #[test]
    fn fade_in_requires_settled_transition(
        state in arbitrary_state(),
        duration in 1i64..3_600_000,
        position in 0i64..3_600_000,
    ) {
        if state.decide(position, duration, WINDOW) == Some(RampDirection::FadeIn) {
            prop_assert!(state.is_transitioning);
            prop_assert!(!state.is_fading);
            prop_assert!(position < duration - WINDOW);
        }
    }

    /// Property: Decisions never panic on extreme inputs
    #[test]
    fn decide_handles_extremes(
        state in arbitrary_state(),
        position in any::<i64>(),
        duration in any::<i64>(),
        window in any::<i64>(),
    ) {
        let _ = state.decide(position, duration, window);
    }

    /// Property: A step moves exactly one unit toward the target and stays in range
    #[test]
    fn step_toward_moves_one_unit(current in any::<u8>(), target in any::<u8>()) {
        let next = volume::step_toward(current, target);
        let current = current.min(MAX_VOLUME);
        let target = target.min(MAX_VOLUME);

        prop_assert!(next <= MAX_VOLUME);
        prop_assert_eq!(u32::from(current.abs_diff(next)), u32::from(current != target));
        prop_assert!(next.abs_diff(target) <= current.abs_diff(target));
    }

    /// Property: Repeated steps reach the target in exactly steps_between ticks
    #[test]
    fn repeated_steps_reach_target(from in 0u8..=100, to in 0u8..=100) {
        let mut level = from;
        let mut ticks = 0u32;
        while level != to {
            level = volume::step_toward(level, to);
            ticks += 1;
            prop_assert!(ticks <= 100);
        }
        prop_assert_eq!(ticks, volume::steps_between(from, to));
    }

    /// Property: Clamping is always in range and idempotent
    #[test]
    fn clamp_level_in_range(level in any::<i32>()) {
        let clamped = volume::clamp_level(level);
        prop_assert!(clamped <= MAX_VOLUME);
        prop_assert_eq!(volume::clamp_level(i32::from(clamped)), clamped);
    }

    /// Property: dB mapping is monotonic and never above 0 dB
    #[test]
    fn level_to_db_monotonic(a in 0u8..=100, b in 0u8..=100) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(volume::level_to_db(low) <= volume::level_to_db(high));
        prop_assert!(volume::level_to_db(high) <= 0.0);
    }
}

// ===== Round trip over every starting volume =====

/// A full fade-out and fade-in cycle always lands back on the starting volume
#[test]
fn every_volume_survives_a_transition() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap();

    runtime.block_on(async {
        for start in 0..=MAX_VOLUME {
            let player = Arc::new(MemoryPlayer::new(start, Some(0)));
            let controller =
                CrossfadeController::new(player.clone(), CrossfadeConfig::default()).unwrap();

            controller.on_position_changed(9_500, 10_000);
            tokio::time::sleep(Duration::from_secs(1)).await;
            assert_eq!(player.volume(), 0, "fade-out from {}", start);

            player.advance_track();
            controller.on_position_changed(0, 10_000);
            tokio::time::sleep(Duration::from_secs(1)).await;
            assert_eq!(player.volume(), start, "fade-in back to {}", start);

            let state = controller.state();
            assert!(!state.is_transitioning);
            assert!(!state.is_fading);

            controller.shutdown().await.unwrap();
        }
    });
}
