//! Time source used for cache expiry and store-assigned timestamps.

use chrono::{DateTime, Utc};

/// Injectable time source, so TTL expiry and `created_at` can be driven
/// deterministically in tests.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
