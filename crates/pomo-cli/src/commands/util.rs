//! Shared formatting for CLI commands.

use std::time::Duration;

/// Formats a duration as "Xh Ym" if >= 1 hour, "Xm" otherwise.
pub fn format_duration(duration: Duration) -> String {
    let total_minutes = duration.as_secs() / 60;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Formats a duration as a countdown clock, "MM:SS".
pub fn format_clock(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_under_an_hour_shows_minutes() {
        assert_eq!(format_duration(Duration::ZERO), "0m");
        assert_eq!(format_duration(Duration::from_secs(59)), "0m");
        assert_eq!(format_duration(Duration::from_secs(2400)), "40m");
    }

    #[test]
    fn duration_over_an_hour_shows_hours() {
        assert_eq!(format_duration(Duration::from_secs(5400)), "1h 30m");
        assert_eq!(format_duration(Duration::from_secs(7200)), "2h 0m");
    }

    #[test]
    fn clock_pads_minutes_and_seconds() {
        assert_eq!(format_clock(Duration::from_secs(1500)), "25:00");
        assert_eq!(format_clock(Duration::from_secs(61)), "01:01");
        assert_eq!(format_clock(Duration::ZERO), "00:00");
    }
}
