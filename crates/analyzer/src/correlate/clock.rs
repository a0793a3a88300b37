//! Time source for open-ended tasks.

use chrono::Local;

/// Provides "now" as epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Local wall-clock time, on the same scale as parsed log stamps.
///
/// Log stamps carry no offset and are read as if they were UTC, so "now"
/// is the local wall-clock reading taken the same way.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Local::now().naive_local().and_utc().timestamp_millis()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.0
    }
}
