// Rate-limited progress notifications
//
// Chunks arrive far faster than the platform allows message edits, so every
// progress source goes through a `ProgressThrottle` that remembers when and
// at which byte count it last let a notification through.

use std::time::{Duration, Instant};

use crate::core::messenger::ProgressFn;

#[derive(Debug)]
pub struct ProgressThrottle {
    min_interval: Duration,
    last_at: Option<Instant>,
    last_bytes: u64,
    notified: u64,
}

impl ProgressThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_at: None,
            last_bytes: 0,
            notified: 0,
        }
    }

    /// Returns true when a notification for `bytes` should be emitted now
    ///
    /// The first report and the completing report (`bytes == total`) always
    /// pass; in between, at least `min_interval` must have elapsed and the
    /// byte count must have moved.
    pub fn should_notify(&mut self, bytes: u64, total: Option<u64>) -> bool {
        self.should_notify_at(Instant::now(), bytes, total)
    }

    pub fn should_notify_at(&mut self, now: Instant, bytes: u64, total: Option<u64>) -> bool {
        let complete = total.is_some_and(|t| bytes >= t);
        let pass = match self.last_at {
            None => true,
            Some(_) if bytes == self.last_bytes => false,
            Some(_) if complete => true,
            Some(at) => now.saturating_duration_since(at) >= self.min_interval,
        };
        if pass {
            self.last_at = Some(now);
            self.last_bytes = bytes;
            self.notified += 1;
        }
        pass
    }

    /// Number of notifications let through so far
    pub fn notified(&self) -> u64 {
        self.notified
    }
}

/// Wraps `sink` so it is only invoked when the throttle allows it
pub fn throttled(min_interval: Duration, sink: ProgressFn) -> ProgressFn {
    let throttle = parking_lot::Mutex::new(ProgressThrottle::new(min_interval));
    std::sync::Arc::new(move |bytes, total| {
        let known = (total > 0).then_some(total);
        if throttle.lock().should_notify(bytes, known) {
            sink(bytes, total);
        }
    })
}

/// Percentage of `bytes` over `total`, clamped to 100
pub fn percent(bytes: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    (bytes.saturating_mul(100) / total).min(100)
}
