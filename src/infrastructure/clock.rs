//! Clock adapters for time operations.
//!
//! [`SystemClock`] reads the wall clock. [`ManualClock`] only moves when told
//! to, which makes window rollover and lock expiry testable without sleeping.

use crate::application::ports::Clock;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

/// System clock implementation using `SystemTime::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Clock that only advances explicitly.
///
/// All clones share the same time, so a test can hand one clone to the store
/// and one to the coordinator and move both at once.
///
/// # Examples
///
/// ```
/// use atomic_coord::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::at_unix_seconds(1_000);
/// let shared = clock.clone();
///
/// clock.advance(Duration::from_secs(61));
/// assert_eq!(shared.unix_seconds(), 1_061);
/// ```
#[derive(Debug, Clone)]
pub struct ManualClock {
    current_time: Arc<Mutex<SystemTime>>,
}

impl ManualClock {
    /// Create a clock starting at `start`.
    pub fn new(start: SystemTime) -> Self {
        Self {
            current_time: Arc::new(Mutex::new(start)),
        }
    }

    /// Create a clock starting `seconds` after the Unix epoch.
    pub fn at_unix_seconds(seconds: u64) -> Self {
        Self::new(SystemTime::UNIX_EPOCH + Duration::from_secs(seconds))
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, duration: Duration) {
        let mut time = self
            .current_time
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *time += duration;
    }

    /// Set the clock to a specific time.
    pub fn set(&self, time: SystemTime) {
        *self
            .current_time
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = time;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(SystemTime::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        *self
            .current_time
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
