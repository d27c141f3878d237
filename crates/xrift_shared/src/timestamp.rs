//! Timestamp labels.
//!
//! Entries store a pre-formatted label, never an instant. The format is a
//! presentation choice and plays no part in deduplication.

use chrono::{DateTime, Local, Timelike};

/// Turns a creation instant into the label stored on an entry.
pub trait TimestampFormat: Send + Sync {
    /// Formats `at`.
    fn format(&self, at: &DateTime<Local>) -> String;
}

impl<F> TimestampFormat for F
where
    F: Fn(&DateTime<Local>) -> String + Send + Sync,
{
    fn format(&self, at: &DateTime<Local>) -> String {
        self(at)
    }
}

/// Zero-padded `HH:MM` in local time.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClockFormat;

impl TimestampFormat for ClockFormat {
    fn format(&self, at: &DateTime<Local>) -> String {
        format!("{:02}:{:02}", at.hour(), at.minute())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_clock_format_pads() {
        assert_eq!(ClockFormat.format(&at(9, 5)), "09:05");
        assert_eq!(ClockFormat.format(&at(0, 0)), "00:00");
    }

    #[test]
    fn test_clock_format_afternoon() {
        assert_eq!(ClockFormat.format(&at(14, 30)), "14:30");
    }

    #[test]
    fn test_closure_format() {
        let fixed = |_: &DateTime<Local>| "12:34".to_owned();
        assert_eq!(fixed.format(&at(1, 2)), "12:34");
    }
}
