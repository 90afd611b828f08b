//! # atomic-coord
//!
//! Coordination primitives for processes that share nothing but a key-value
//! store: a distributed lock, a fixed-window rate limiter, bounded counters
//! and an inventory ledger that cannot oversell.
//!
//! Every check-then-act sequence (read stock, compare, write) runs as one
//! atomic procedure inside the store. Callers never read, decide and write in
//! separate round trips, so concurrent callers can only observe each other
//! through well-defined rejections, never through corrupted state.
//!
//! ## Quick Start
//!
//! ```rust
//! use atomic_coord::{Coordinator, MemoryStore, OwnerToken, AcquireStatus};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let coord = Coordinator::builder()
//!     .with_store(MemoryStore::new())
//!     .with_key_prefix("shop:")
//!     .build()?;
//!
//! // Mutual exclusion
//! let token = OwnerToken::generate();
//! let lock = coord.lock().acquire("lock:checkout", &token, 30).await?;
//! assert_eq!(lock.status, AcquireStatus::Acquired);
//! coord.lock().release("lock:checkout", &token).await?;
//!
//! // Throttling: 100 requests per user per minute
//! let decision = coord.rate_limiter().allow("api", "user123", 100, 60).await?;
//! assert!(decision.allowed);
//!
//! // Oversell-safe stock
//! coord.inventory().restock("laptop", 10).await?;
//! let order = coord.inventory().decrement("laptop", 2, "ord_1").await?;
//! assert_eq!(order.new_stock, 8);
//! # Ok(())
//! # }
//! ```
//!
//! ## Stores
//!
//! - [`MemoryStore`]: in-process, every procedure under one mutex. For
//!   single-process deployments and tests.
//! - `RedisStore` (feature `redis-store`): every procedure is a Lua script, so
//!   any number of processes can share one Redis.
//!
//! Both implement [`AtomicStore`]. Stores only run the closed set of
//! [`Procedure`]s; there is no way to send an arbitrary command through this
//! crate.
//!
//! ## Rejections Are Data
//!
//! A refused request is a normal outcome, reported with enough state to act
//! on it:
//!
//! | Primitive | Refusal | Reported state |
//! |-----------|---------|----------------|
//! | Counter | `accepted: false` | current value |
//! | Rate limiter | `allowed: false` | count, seconds to reset |
//! | Lock | `LockedByOther`, `NotOwner` | holder's remaining TTL |
//! | Inventory | `InsufficientStock`, `DuplicateOrder` | current stock and sold |
//!
//! Errors ([`CoordinationError`]) are reserved for bad input and for store
//! failures. When [`CoordinationError::outcome_unknown`] is true the store may
//! have applied the call: treat lock ownership and stock as unknown and
//! never assume the call did not happen.
//!
//! ## Fail-Closed Circuit Breaker
//!
//! After repeated connection failures or timeouts the coordinator stops
//! contacting the store and fails fast with
//! [`StoreError::CircuitOpen`] until the recovery timeout elapses:
//!
//! ```rust,no_run
//! # use atomic_coord::{Coordinator, MemoryStore, CircuitState};
//! # let coord = Coordinator::builder().with_store(MemoryStore::new()).build().unwrap();
//! match coord.circuit_breaker().state() {
//!     CircuitState::Closed => println!("Normal operation"),
//!     CircuitState::Open => println!("Shedding calls, store unhealthy"),
//!     CircuitState::HalfOpen => println!("Probing the store"),
//! }
//! ```
//!
//! Unlike a cache, a coordination primitive never degrades to "allow" while
//! the store is unreachable: no lock is granted and no request admitted
//! without the store having agreed.
//!
//! ## Observability
//!
//! Decisions are emitted as `tracing` events at `debug` level and store
//! failures at `warn`. Outcome counts are kept in [`Metrics`]:
//!
//! ```rust,no_run
//! # use atomic_coord::{Coordinator, MemoryStore};
//! # let coord = Coordinator::builder().with_store(MemoryStore::new()).build().unwrap();
//! let snapshot = coord.metrics().snapshot();
//! println!("locks contended: {}", snapshot.locks_contended);
//! println!("limited: {:.2}%", snapshot.limited_rate() * 100.0);
//! ```

// Domain layer - pure coordination logic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    batch::{BatchOp, BatchResult},
    counter::CounterOutcome,
    inventory::{
        DecrementOutcome, InventoryRejection, InventorySnapshot, OrderRecord, OrderStatus,
        SaleRecord,
    },
    keys::KeySpace,
    lock::{AcquireOutcome, AcquireStatus, LockHolder, OwnerToken, ReleaseOutcome, ReleaseStatus},
    procedure::Procedure,
    rate_window::{RateLimitDecision, WindowStatus},
    reply::{KeyTtl, Reply},
    validation::ValidationError,
};

pub use application::{
    batch::AtomicBatch,
    circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState},
    coordinator::{BuildError, Coordinator, CoordinatorBuilder, CoordinatorConfig},
    counter::AtomicCounter,
    error::{CoordinationError, Result},
    inventory::InventoryLedger,
    lock::DistributedLock,
    metrics::{Metrics, MetricsSnapshot},
    ports::{AtomicStore, Clock, StoreError},
    rate_limiter::RateLimiter,
};

pub use infrastructure::{
    clock::{ManualClock, SystemClock},
    memory_store::MemoryStore,
};

#[cfg(feature = "redis-store")]
pub use infrastructure::redis_store::{RedisStore, RedisStoreConfig};
