//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters implement these ports.

use crate::domain::procedure::Procedure;
use crate::domain::reply::{KeyTtl, Reply};
use async_trait::async_trait;
use std::fmt::Debug;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Port for obtaining the current wall-clock time.
///
/// Wall-clock (not monotonic) time is required because window indices and
/// order timestamps must agree across processes that share the store.
/// Infrastructure provides concrete implementations (SystemClock, ManualClock).
pub trait Clock: Send + Sync + Debug {
    /// Get the current time.
    fn now(&self) -> SystemTime;

    /// Whole seconds since the Unix epoch.
    fn unix_seconds(&self) -> u64 {
        self.now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }

    /// Milliseconds since the Unix epoch.
    fn unix_millis(&self) -> u64 {
        self.now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis()
            .try_into()
            .unwrap_or(u64::MAX)
    }
}

/// Failure talking to the shared store.
///
/// Every variant means the outcome of a mutating procedure is unknown to the
/// caller: it may or may not have been applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The connection could not be established or was lost
    #[error("connection failed: {0}")]
    Connection(String),
    /// No reply arrived within the configured deadline
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    /// The store rejected the command (wrong type, script error, ...)
    #[error("command failed: {0}")]
    Command(String),
    /// Requests are being shed after repeated store failures
    #[error("circuit open after repeated store failures")]
    CircuitOpen,
}

impl StoreError {
    /// Whether this failure says something about store health (as opposed to
    /// a bad command against a healthy store).
    pub fn is_transport(&self) -> bool {
        matches!(self, StoreError::Connection(_) | StoreError::Timeout(_))
    }
}

/// Port for the shared key-value store.
///
/// Implementations must run each [`Procedure`] as one indivisible unit with
/// respect to every other operation touching the same keys. `get` and `ttl`
/// are plain single-key reads used for inspection only; nothing that decides
/// and then writes may be built from them.
#[async_trait]
pub trait AtomicStore: Send + Sync + Debug {
    /// Read a string value.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Remaining lifetime of a key.
    async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError>;

    /// Run an atomic procedure with positional keys and arguments.
    async fn atomic_exec(
        &self,
        procedure: Procedure,
        keys: &[String],
        args: &[String],
    ) -> Result<Reply, StoreError>;
}
