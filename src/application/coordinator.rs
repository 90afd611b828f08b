//! Entry point tying the primitives to one store.

use crate::application::batch::AtomicBatch;
use crate::application::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::application::counter::AtomicCounter;
use crate::application::inventory::InventoryLedger;
use crate::application::lock::DistributedLock;
use crate::application::metrics::Metrics;
use crate::application::ports::{AtomicStore, Clock};
use crate::application::rate_limiter::RateLimiter;
use crate::application::runner::Runner;
use crate::domain::batch::DEFAULT_MAX_BATCH_OPS;
use crate::domain::keys::KeySpace;
use crate::domain::lock::DEFAULT_LOCK_TTL_SECONDS;
use crate::domain::rate_window::DEFAULT_WINDOW_SECONDS;
use crate::infrastructure::clock::SystemClock;
use std::sync::Arc;
use thiserror::Error;

/// Error returned when building a coordinator with invalid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// No store was configured
    #[error("a store is required")]
    MissingStore,
    /// Maximum batch size must be greater than zero
    #[error("max_batch_ops must be greater than 0")]
    ZeroMaxBatchOps,
    /// Default lock TTL must be greater than zero
    #[error("default_lock_ttl must be greater than 0")]
    ZeroLockTtl,
    /// Default window must be greater than zero
    #[error("default_window must be greater than 0")]
    ZeroWindow,
}

/// Settings shared by every primitive of a coordinator.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CoordinatorConfig {
    /// Prepended to every store key
    pub key_prefix: String,
    /// Lock TTL in seconds when the caller does not pass one
    pub default_lock_ttl: u64,
    /// Rate window in seconds when the caller does not pass one
    pub default_window: u64,
    /// Largest accepted batch
    pub max_batch_ops: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            key_prefix: String::new(),
            default_lock_ttl: DEFAULT_LOCK_TTL_SECONDS,
            default_window: DEFAULT_WINDOW_SECONDS,
            max_batch_ops: DEFAULT_MAX_BATCH_OPS,
        }
    }
}

/// Builder for [`Coordinator`].
#[derive(Debug, Default)]
pub struct CoordinatorBuilder {
    store: Option<Arc<dyn AtomicStore>>,
    clock: Option<Arc<dyn Clock>>,
    config: CoordinatorConfig,
    circuit_breaker: CircuitBreakerConfig,
}

impl CoordinatorBuilder {
    /// Store every primitive runs against. Required.
    pub fn with_store<S: AtomicStore + 'static>(mut self, store: S) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Share an already wrapped store, e.g. between several coordinators.
    pub fn with_shared_store(mut self, store: Arc<dyn AtomicStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set a custom clock (primarily for testing).
    ///
    /// The clock must be the same one the store uses for expiry, or at least
    /// agree with it, otherwise rate windows drift.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Replace the whole configuration.
    pub fn with_config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Namespace all keys under `prefix`.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.key_prefix = prefix.into();
        self
    }

    /// Lock TTL used by [`DistributedLock::acquire_default_ttl`].
    pub fn with_default_lock_ttl(mut self, seconds: u64) -> Self {
        self.config.default_lock_ttl = seconds;
        self
    }

    /// Window used by [`RateLimiter::allow_default_window`].
    pub fn with_default_window(mut self, seconds: u64) -> Self {
        self.config.default_window = seconds;
        self
    }

    /// Largest batch [`AtomicBatch::execute`] accepts.
    pub fn with_max_batch_ops(mut self, max: usize) -> Self {
        self.config.max_batch_ops = max;
        self
    }

    /// Configure when the store circuit opens and how long it stays open.
    pub fn with_circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = config;
        self
    }

    /// Build the coordinator.
    ///
    /// # Errors
    ///
    /// Returns `BuildError` if no store was set or a limit is zero.
    pub fn build(self) -> Result<Coordinator, BuildError> {
        let store = self.store.ok_or(BuildError::MissingStore)?;
        if self.config.max_batch_ops == 0 {
            return Err(BuildError::ZeroMaxBatchOps);
        }
        if self.config.default_lock_ttl == 0 {
            return Err(BuildError::ZeroLockTtl);
        }
        if self.config.default_window == 0 {
            return Err(BuildError::ZeroWindow);
        }

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()));
        let breaker = Arc::new(CircuitBreaker::with_config(self.circuit_breaker));
        let metrics = Metrics::new();
        let runner = Runner::new(
            store,
            clock,
            Arc::clone(&breaker),
            metrics.clone(),
            KeySpace::new(self.config.key_prefix.clone()),
        );

        tracing::debug!(
            prefix = %self.config.key_prefix,
            max_batch_ops = self.config.max_batch_ops,
            "coordinator built"
        );

        Ok(Coordinator {
            counter: AtomicCounter::new(runner.clone()),
            rate_limiter: RateLimiter::new(runner.clone(), self.config.default_window),
            lock: DistributedLock::new(runner.clone(), self.config.default_lock_ttl),
            inventory: InventoryLedger::new(runner.clone()),
            batch: AtomicBatch::new(runner, self.config.max_batch_ops),
            metrics,
            circuit_breaker: breaker,
            config: self.config,
        })
    }
}

/// The coordination primitives, bound to one store.
///
/// Cheap to clone; clones share the store handle, metrics and circuit breaker.
///
/// # Examples
///
/// ```
/// use atomic_coord::{Coordinator, MemoryStore};
///
/// let coord = Coordinator::builder()
///     .with_store(MemoryStore::new())
///     .with_key_prefix("shop:")
///     .build()
///     .unwrap();
///
/// assert_eq!(coord.config().key_prefix, "shop:");
/// ```
#[derive(Debug, Clone)]
pub struct Coordinator {
    counter: AtomicCounter,
    rate_limiter: RateLimiter,
    lock: DistributedLock,
    inventory: InventoryLedger,
    batch: AtomicBatch,
    metrics: Metrics,
    circuit_breaker: Arc<CircuitBreaker>,
    config: CoordinatorConfig,
}

impl Coordinator {
    /// Start building a coordinator.
    pub fn builder() -> CoordinatorBuilder {
        CoordinatorBuilder::default()
    }

    /// Bounded atomic counters.
    pub fn counter(&self) -> &AtomicCounter {
        &self.counter
    }

    /// Fixed-window rate limiter.
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Distributed lock.
    pub fn lock(&self) -> &DistributedLock {
        &self.lock
    }

    /// Inventory ledger.
    pub fn inventory(&self) -> &InventoryLedger {
        &self.inventory
    }

    /// Atomic batches.
    pub fn batch(&self) -> &AtomicBatch {
        &self.batch
    }

    /// Outcome metrics for everything run through this coordinator.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// The store circuit breaker.
    pub fn circuit_breaker(&self) -> &Arc<CircuitBreaker> {
        &self.circuit_breaker
    }

    /// Configuration the coordinator was built with.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory_store::MemoryStore;

    #[test]
    fn test_store_required() {
        assert_eq!(
            Coordinator::builder().build().unwrap_err(),
            BuildError::MissingStore
        );
    }

    #[test]
    fn test_zero_limits_rejected() {
        let result = Coordinator::builder()
            .with_store(MemoryStore::new())
            .with_max_batch_ops(0)
            .build();
        assert_eq!(result.unwrap_err(), BuildError::ZeroMaxBatchOps);

        let result = Coordinator::builder()
            .with_store(MemoryStore::new())
            .with_default_lock_ttl(0)
            .build();
        assert_eq!(result.unwrap_err(), BuildError::ZeroLockTtl);

        let result = Coordinator::builder()
            .with_store(MemoryStore::new())
            .with_default_window(0)
            .build();
        assert_eq!(result.unwrap_err(), BuildError::ZeroWindow);
    }

    #[test]
    fn test_defaults_reach_components() {
        let coord = Coordinator::builder()
            .with_store(MemoryStore::new())
            .build()
            .unwrap();

        assert_eq!(coord.config(), &CoordinatorConfig::default());
        assert_eq!(coord.lock().default_ttl_seconds(), 30);
        assert_eq!(coord.rate_limiter().default_window_seconds(), 60);
        assert_eq!(coord.batch().max_ops(), 64);
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: CoordinatorConfig =
            serde_json::from_str(r#"{"keyPrefix":"app:","maxBatchOps":8}"#).unwrap();
        assert_eq!(config.key_prefix, "app:");
        assert_eq!(config.max_batch_ops, 8);
        assert_eq!(config.default_lock_ttl, 30);
    }
}
