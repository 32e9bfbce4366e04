//! Ping bookkeeping: failure streaks and backoff.

use std::time::Duration;

use tracing::{info, warn};

/// Result of a single keep-alive ping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingResult {
    /// The target answered 2xx.
    Ok,
    /// The target answered, but not with 2xx.
    BadStatus,
    /// No answer (connect error, protocol error, timeout).
    Failed,
}

impl PingResult {
    pub fn is_ok(self) -> bool {
        self == PingResult::Ok
    }
}

/// Failure streaks at or above this count are logged as warnings.
const WARN_THRESHOLD: u32 = 3;

/// Backoff ceiling as a multiple of the base interval.
const MAX_BACKOFF_FACTOR: u32 = 10;

/// Tracks consecutive ping results for one target.
#[derive(Debug)]
pub struct PingTracker {
    consecutive_failures: u32,
    total_pings: u64,
    current_interval: Duration,
    base_interval: Duration,
    max_interval: Duration,
}

impl PingTracker {
    pub fn new(base_interval: Duration) -> Self {
        Self {
            consecutive_failures: 0,
            total_pings: 0,
            current_interval: base_interval,
            base_interval,
            max_interval: base_interval
                .checked_mul(MAX_BACKOFF_FACTOR)
                .unwrap_or(Duration::MAX),
        }
    }

    /// Record a ping result and return the interval until the next ping.
    pub fn record(&mut self, result: PingResult) -> Duration {
        self.total_pings += 1;

        if result.is_ok() {
            if self.consecutive_failures >= WARN_THRESHOLD {
                info!(
                    failures = self.consecutive_failures,
                    "keep-alive target reachable again"
                );
            }
            self.consecutive_failures = 0;
            self.current_interval = self.base_interval;
        } else {
            self.consecutive_failures += 1;
            self.current_interval = self
                .current_interval
                .checked_mul(2)
                .unwrap_or(self.max_interval)
                .min(self.max_interval);

            if self.consecutive_failures == WARN_THRESHOLD {
                warn!(
                    failures = self.consecutive_failures,
                    ?result,
                    "keep-alive target keeps failing"
                );
            }
        }

        self.current_interval
    }

    pub fn next_interval(&self) -> Duration {
        self.current_interval
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn total_pings(&self) -> u64 {
        self.total_pings
    }
}
