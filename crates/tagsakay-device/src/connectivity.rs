//! # Connectivity Monitor
//!
//! Tracks whether the kiosk considers itself online and spaces out
//! reconnection probes while it is not.
//!
//! ```text
//!   Online ──(failure threshold)──▶ Offline ──probe ok──▶ Online
//!                                     │  ▲
//!                                     └──┘ probe failed: wait next backoff
//!                                          (initial × 2ⁿ, capped, jittered)
//! ```

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub struct ConnectivityMonitor {
    online: bool,
    backoff: ExponentialBackoff,
    next_check: Option<Instant>,
}

impl ConnectivityMonitor {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            online: true,
            backoff: ExponentialBackoff {
                initial_interval: initial,
                max_interval: max,
                multiplier: 2.0,
                max_elapsed_time: None,
                ..Default::default()
            },
            next_check: None,
        }
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    /// When the next probe is due, if offline.
    pub fn next_check(&self) -> Option<Instant> {
        self.next_check
    }

    /// Switches to offline. Returns false if already offline.
    pub fn mark_offline(&mut self, now: Instant) -> bool {
        if !self.online {
            return false;
        }
        self.online = false;
        self.backoff.reset();
        self.schedule(now);
        info!("Connectivity lost, entering offline mode");
        true
    }

    pub fn should_check(&self, now: Instant) -> bool {
        !self.online && self.next_check.map_or(true, |due| now >= due)
    }

    /// Records a probe result. Returns true when the kiosk just came back
    /// online.
    pub fn record_check(&mut self, success: bool, now: Instant) -> bool {
        if self.online {
            return false;
        }
        if success {
            self.online = true;
            self.next_check = None;
            self.backoff.reset();
            info!("Connectivity restored");
            return true;
        }
        self.schedule(now);
        false
    }

    fn schedule(&mut self, now: Instant) {
        let wait = self
            .backoff
            .next_backoff()
            .unwrap_or(self.backoff.max_interval);
        debug!(wait_ms = wait.as_millis() as u64, "Next connectivity probe scheduled");
        self.next_check = Some(now + wait);
    }
}
