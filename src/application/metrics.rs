//! Observability metrics for the coordination primitives.
//!
//! Counts are local to this process; they describe what this process's
//! callers saw, not global store state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Outcome counters shared by every component of a coordinator.
///
/// All metrics use atomic operations for thread-safe updates and reads.
/// Clones share the same counters.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    counter_accepted: AtomicU64,
    counter_rejected: AtomicU64,
    requests_allowed: AtomicU64,
    requests_limited: AtomicU64,
    locks_acquired: AtomicU64,
    locks_renewed: AtomicU64,
    locks_contended: AtomicU64,
    locks_released: AtomicU64,
    releases_refused: AtomicU64,
    orders_confirmed: AtomicU64,
    orders_rejected: AtomicU64,
    store_failures: AtomicU64,
}

macro_rules! counter {
    ($record:ident, $read:ident, $field:ident, $doc:literal $(,)?) => {
        pub(crate) fn $record(&self) {
            self.inner.$field.fetch_add(1, Ordering::Relaxed);
        }

        #[doc = $doc]
        pub fn $read(&self) -> u64 {
            self.inner.$field.load(Ordering::Relaxed)
        }
    };
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self::default()
    }

    counter!(record_counter_accepted, counter_accepted, counter_accepted, "Increments applied.");
    counter!(
        record_counter_rejected,
        counter_rejected,
        counter_rejected,
        "Increments refused at the max.",
    );
    counter!(
        record_request_allowed,
        requests_allowed,
        requests_allowed,
        "Rate-limited requests admitted.",
    );
    counter!(
        record_request_limited,
        requests_limited,
        requests_limited,
        "Rate-limited requests refused.",
    );
    counter!(record_lock_acquired, locks_acquired, locks_acquired, "Locks taken while free.");
    counter!(record_lock_renewed, locks_renewed, locks_renewed, "Locks renewed by their owner.");
    counter!(
        record_lock_contended,
        locks_contended,
        locks_contended,
        "Acquires refused because another token held the lock.",
    );
    counter!(
        record_lock_released,
        locks_released,
        locks_released,
        "Locks released by their owner.",
    );
    counter!(
        record_release_refused,
        releases_refused,
        releases_refused,
        "Releases refused (not found or not owner).",
    );
    counter!(
        record_order_confirmed,
        orders_confirmed,
        orders_confirmed,
        "Stock decrements applied.",
    );
    counter!(record_order_rejected, orders_rejected, orders_rejected, "Stock decrements refused.");
    counter!(
        record_store_failure,
        store_failures,
        store_failures,
        "Calls that failed against the store.",
    );

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counter_accepted: self.counter_accepted(),
            counter_rejected: self.counter_rejected(),
            requests_allowed: self.requests_allowed(),
            requests_limited: self.requests_limited(),
            locks_acquired: self.locks_acquired(),
            locks_renewed: self.locks_renewed(),
            locks_contended: self.locks_contended(),
            locks_released: self.locks_released(),
            releases_refused: self.releases_refused(),
            orders_confirmed: self.orders_confirmed(),
            orders_rejected: self.orders_rejected(),
            store_failures: self.store_failures(),
        }
    }

    /// Reset all metrics to zero.
    ///
    /// Useful for testing or when starting a new monitoring period.
    pub fn reset(&self) {
        let inner = &self.inner;
        for counter in [
            &inner.counter_accepted,
            &inner.counter_rejected,
            &inner.requests_allowed,
            &inner.requests_limited,
            &inner.locks_acquired,
            &inner.locks_renewed,
            &inner.locks_contended,
            &inner.locks_released,
            &inner.releases_refused,
            &inner.orders_confirmed,
            &inner.orders_rejected,
            &inner.store_failures,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Increments applied
    pub counter_accepted: u64,
    /// Increments refused at the max
    pub counter_rejected: u64,
    /// Rate-limited requests admitted
    pub requests_allowed: u64,
    /// Rate-limited requests refused
    pub requests_limited: u64,
    /// Locks taken while free
    pub locks_acquired: u64,
    /// Locks renewed by their owner
    pub locks_renewed: u64,
    /// Acquires refused because another token held the lock
    pub locks_contended: u64,
    /// Locks released by their owner
    pub locks_released: u64,
    /// Releases refused
    pub releases_refused: u64,
    /// Stock decrements applied
    pub orders_confirmed: u64,
    /// Stock decrements refused
    pub orders_rejected: u64,
    /// Calls that failed against the store
    pub store_failures: u64,
}

impl MetricsSnapshot {
    /// Fraction of rate-limited requests that were refused (0.0 to 1.0).
    pub fn limited_rate(&self) -> f64 {
        let total = self.requests_allowed.saturating_add(self.requests_limited);
        if total == 0 {
            0.0
        } else {
            self.requests_limited as f64 / total as f64
        }
    }
}
