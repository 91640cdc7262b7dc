//! # Duplicate Tag Suppression
//!
//! Readers report the same card many times while it sits on the antenna.
//! `Debouncer` lets the first read through and drops repeats of the same tag
//! until the window has elapsed.
//!
//! ```text
//!  t=0      t=0.4    t=1.2    t=1.5    t=1.6
//!  04A1 ✔   04A1 ✘   04A1 ✘   04A1 ✔   (window 1500ms, measured from
//!                                       the last ACCEPTED read)
//! ```
//!
//! A different tag is always accepted.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last_accepted: Option<(String, Instant)>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: None,
        }
    }

    /// Returns true when the read should be processed.
    pub fn accept(&mut self, tag_id: &str, at: Instant) -> bool {
        if let Some((last_tag, last_at)) = &self.last_accepted {
            if last_tag.eq_ignore_ascii_case(tag_id)
                && at.saturating_duration_since(*last_at) < self.window
            {
                return false;
            }
        }
        self.last_accepted = Some((tag_id.to_string(), at));
        true
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn reset(&mut self) {
        self.last_accepted = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_within_window_dropped() {
        let mut debouncer = Debouncer::new(Duration::from_millis(1500));
        let t0 = Instant::now();

        assert!(debouncer.accept("04A1B2C3", t0));
        assert!(!debouncer.accept("04A1B2C3", t0 + Duration::from_millis(400)));
        assert!(!debouncer.accept("04a1b2c3", t0 + Duration::from_millis(1499)));
        assert!(debouncer.accept("04A1B2C3", t0 + Duration::from_millis(1500)));
    }

    #[test]
    fn test_window_measured_from_last_accepted() {
        let mut debouncer = Debouncer::new(Duration::from_millis(1500));
        let t0 = Instant::now();

        assert!(debouncer.accept("AAAA", t0));
        assert!(!debouncer.accept("AAAA", t0 + Duration::from_millis(1000)));
        // The dropped read above does not extend the window.
        assert!(debouncer.accept("AAAA", t0 + Duration::from_millis(1600)));
    }

    #[test]
    fn test_different_tag_always_accepted() {
        let mut debouncer = Debouncer::new(Duration::from_millis(1500));
        let t0 = Instant::now();

        assert!(debouncer.accept("AAAA", t0));
        assert!(debouncer.accept("BBBB", t0 + Duration::from_millis(10)));
        assert!(debouncer.accept("AAAA", t0 + Duration::from_millis(20)));
    }

    #[test]
    fn test_reset_forgets_last_tag() {
        let mut debouncer = Debouncer::new(Duration::from_secs(5));
        let t0 = Instant::now();
        assert!(debouncer.accept("AAAA", t0));
        debouncer.reset();
        assert!(debouncer.accept("AAAA", t0));
    }
}
