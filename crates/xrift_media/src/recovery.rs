//! # Stream Recovery Throttling
//!
//! Errors that keep coming within a short window mean recovery is not
//! working. Each attempt inside [`RECOVERY_THROTTLE`] of the previous one
//! counts towards [`MAX_RECOVERY_ATTEMPTS`]; a quiet gap starts the count
//! over.

use std::time::{Duration, Instant};

use tracing::{error, info};

/// Window in which consecutive recovery attempts accumulate.
pub const RECOVERY_THROTTLE: Duration = Duration::from_secs(5);

/// Attempts allowed within one window.
pub const MAX_RECOVERY_ATTEMPTS: u32 = 3;

/// Tracks recovery attempts for one stream.
#[derive(Clone, Debug, Default)]
pub struct RecoveryTracker {
    last_attempt: Option<Instant>,
    attempts: u32,
    error_reported: bool,
}

impl RecoveryTracker {
    /// Creates a tracker with no attempts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets every attempt and the reported flag.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// True once a fatal error was surfaced.
    #[must_use]
    pub fn is_error_reported(&self) -> bool {
        self.error_reported
    }

    /// Records that a fatal error was surfaced.
    pub fn mark_error_reported(&mut self) {
        self.error_reported = true;
    }

    /// Attempts counted in the current window.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Counts an attempt at `now` and returns whether to go ahead with it.
    pub fn should_attempt_recovery(&mut self, now: Instant) -> bool {
        let within_window = self
            .last_attempt
            .is_some_and(|last| now.saturating_duration_since(last) < RECOVERY_THROTTLE);
        self.attempts = if within_window { self.attempts.saturating_add(1) } else { 1 };
        self.last_attempt = Some(now);

        if self.attempts > MAX_RECOVERY_ATTEMPTS {
            error!(max = MAX_RECOVERY_ATTEMPTS, "Stream recovery failed");
            return false;
        }
        info!(attempt = self.attempts, max = MAX_RECOVERY_ATTEMPTS, "Attempting stream recovery");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gives_up_after_max_attempts_in_window() {
        let mut tracker = RecoveryTracker::new();
        let t0 = Instant::now();

        assert!(tracker.should_attempt_recovery(t0));
        assert!(tracker.should_attempt_recovery(t0 + Duration::from_secs(1)));
        assert!(tracker.should_attempt_recovery(t0 + Duration::from_secs(2)));
        assert!(!tracker.should_attempt_recovery(t0 + Duration::from_secs(3)));
        assert_eq!(tracker.attempts(), 4);
    }

    #[test]
    fn test_quiet_gap_restarts_count() {
        let mut tracker = RecoveryTracker::new();
        let t0 = Instant::now();

        for i in 0..3 {
            assert!(tracker.should_attempt_recovery(t0 + Duration::from_secs(i)));
        }
        let later = t0 + Duration::from_secs(2) + RECOVERY_THROTTLE;
        assert!(tracker.should_attempt_recovery(later));
        assert_eq!(tracker.attempts(), 1);
    }

    #[test]
    fn test_window_slides_with_each_attempt() {
        let mut tracker = RecoveryTracker::new();
        let t0 = Instant::now();

        // Each attempt is 4s after the previous one, so the window never lapses.
        assert!(tracker.should_attempt_recovery(t0));
        assert!(tracker.should_attempt_recovery(t0 + Duration::from_secs(4)));
        assert!(tracker.should_attempt_recovery(t0 + Duration::from_secs(8)));
        assert!(!tracker.should_attempt_recovery(t0 + Duration::from_secs(12)));
    }

    #[test]
    fn test_reset_and_error_flag() {
        let mut tracker = RecoveryTracker::new();
        let t0 = Instant::now();
        for _ in 0..4 {
            tracker.should_attempt_recovery(t0);
        }
        tracker.mark_error_reported();
        assert!(tracker.is_error_reported());

        tracker.reset();
        assert!(!tracker.is_error_reported());
        assert_eq!(tracker.attempts(), 0);
        assert!(tracker.should_attempt_recovery(t0));
    }
}
