//! Injectable time source.
//!
//! Batch-age and timeout decisions never read the wall clock directly; they go
//! through a [`Clock`] handed to the processor at construction, so timeout
//! logic is testable without sleeping.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A source of monotonic and wall-clock time.
pub trait Clock: Send + Sync {
    /// Monotonic instant, used for batch age and timeouts.
    fn now(&self) -> Instant;

    /// Wall-clock unix timestamp in seconds, used in payloads.
    fn unix_timestamp(&self) -> i64;
}

/// The real system clock.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn unix_timestamp(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Manually advanced clock for deterministic tests.
#[derive(Debug, Clone)]
pub struct ManualClock {
    inner: Arc<Mutex<ManualState>>,
}

#[derive(Debug)]
struct ManualState {
    now: Instant,
    unix: i64,
}

impl ManualClock {
    /// Create a clock frozen at the current time.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ManualState {
                now: Instant::now(),
                unix: chrono::Utc::now().timestamp(),
            })),
        }
    }

    /// Advance both the monotonic and wall clock.
    pub fn advance(&self, delta: Duration) {
        let mut state = self.inner.lock().unwrap();
        state.now += delta;
        state.unix += delta.as_secs() as i64;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.inner.lock().unwrap().now
    }

    fn unix_timestamp(&self) -> i64 {
        self.inner.lock().unwrap().unix
    }
}
