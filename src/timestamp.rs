// src/timestamp.rs

use std::time::{Duration, Instant};

/// Strictly increasing millisecond timestamps for video-mode detection.
///
/// Derived from a monotonic clock, but never repeats or goes backwards even
/// when two frames arrive within the same millisecond.
pub struct TimestampSequencer {
    start: Instant,
    last_ms: Option<i64>,
}

impl TimestampSequencer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            last_ms: None,
        }
    }

    pub fn next_timestamp_ms(&mut self) -> i64 {
        let elapsed = self.start.elapsed();
        self.next_from_elapsed(elapsed)
    }

    pub fn next_from_elapsed(&mut self, elapsed: Duration) -> i64 {
        let mut ts = (elapsed.as_secs_f64() * 1000.0).round() as i64;
        if let Some(last) = self.last_ms {
            if ts <= last {
                ts = last + 1;
            }
        }
        self.last_ms = Some(ts);
        ts
    }
}

impl Default for TimestampSequencer {
    fn default() -> Self {
        Self::new()
    }
}
