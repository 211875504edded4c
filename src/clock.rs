//! Clock seam for deterministic timestamps.
//!
//! All timestamps used in entry metadata and eviction scoring come from an
//! injected [`Clock`] rather than a direct system-time call, so eviction
//! behavior is reproducible in tests. Production code uses [`SystemClock`];
//! tests use [`ManualClock`] and advance it explicitly.

use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Source of the current time as fractional epoch seconds.
pub trait Clock: Send + Sync {
    /// Current time in seconds since the Unix epoch.
    fn now(&self) -> f64;
}

/// System wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}

/// Manually advanced clock for deterministic tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<f64>,
}

impl ManualClock {
    /// Creates a clock frozen at `start` epoch seconds.
    pub fn new(start: f64) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock to an absolute time.
    pub fn set(&self, now: f64) {
        *self.now.lock() = now;
    }

    /// Advances the clock by `secs` seconds.
    pub fn advance(&self, secs: f64) {
        *self.now.lock() += secs;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.now.lock()
    }
}
