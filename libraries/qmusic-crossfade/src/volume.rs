//! Volume levels on the player's 0-100 scale
//!
//! Ramps move one unit per tick, so everything here works on whole levels.
//! The dB mapping mirrors what the player applies and is only used for display.

/// Loudest level the player accepts
pub const MAX_VOLUME: u8 = 100;

/// Clamp an arbitrary level into 0-100
pub fn clamp_level(level: i32) -> u8 {
    level.clamp(0, i32::from(MAX_VOLUME)) as u8
}

/// Move one unit from `current` toward `target`
///
/// Returns `current` unchanged once the target is reached. The result never
/// leaves 0-100, even if `current` was out of range.
pub fn step_toward(current: u8, target: u8) -> u8 {
    let current = current.min(MAX_VOLUME);
    let target = target.min(MAX_VOLUME);

    match current.cmp(&target) {
        std::cmp::Ordering::Less => current + 1,
        std::cmp::Ordering::Greater => current - 1,
        std::cmp::Ordering::Equal => current,
    }
}

/// Number of one-unit steps between two levels
pub fn steps_between(from: u8, to: u8) -> u32 {
    u32::from(from.min(MAX_VOLUME).abs_diff(to.min(MAX_VOLUME)))
}

/// Convert a level to dB
///
/// 0% maps to -60 dB (treated as silence), 100% to 0 dB.
pub fn level_to_db(level: u8) -> f32 {
    let level = level.min(MAX_VOLUME);
    if level == 0 {
        return -60.0;
    }

    (f32::from(level) - 100.0) * 0.6
}
