/// Position formatting for log lines

/// Format a position as `m:ss`, or `h:mm:ss` once it reaches an hour
///
/// Milliseconds round to the nearest second, ties to even. Negative
/// positions format as `0:00`.
pub fn format_position(ms: i64) -> String {
    let total_seconds = round_to_seconds(ms.max(0));
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

fn round_to_seconds(ms: i64) -> i64 {
    let seconds = ms / 1000;
    let rem = ms % 1000;

    if rem > 500 || (rem == 500 && seconds % 2 == 1) {
        seconds + 1
    } else {
        seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minutes_and_seconds() {
        assert_eq!(format_position(0), "0:00");
        assert_eq!(format_position(9_000), "0:09");
        assert_eq!(format_position(61_000), "1:01");
        assert_eq!(format_position(3_599_000), "59:59");
    }

    #[test]
    fn hours_only_when_present() {
        assert_eq!(format_position(3_600_000), "1:00:00");
        assert_eq!(format_position(3_725_000), "1:02:05");
        assert_eq!(format_position(36_000_000), "10:00:00");
    }

    #[test]
    fn rounds_to_nearest_second() {
        assert_eq!(format_position(1_499), "0:01");
        assert_eq!(format_position(1_501), "0:02");
        assert_eq!(format_position(59_600), "1:00");
        assert_eq!(format_position(3_599_500), "1:00:00");
    }

    #[test]
    fn half_seconds_round_to_even() {
        assert_eq!(format_position(500), "0:00");
        assert_eq!(format_position(1_500), "0:02");
        assert_eq!(format_position(2_500), "0:02");
    }

    #[test]
    fn negative_is_zero() {
        assert_eq!(format_position(-2_000), "0:00");
    }
}
