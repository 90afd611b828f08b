//! Circuit breaker shedding load from an unhealthy store.
//!
//! After a run of consecutive transport failures the circuit opens and
//! operations fail fast with [`StoreError::CircuitOpen`](crate::StoreError::CircuitOpen)
//! instead of piling more round trips onto a store that is not answering.
//! Once the recovery timeout has passed a single probe call is let through;
//! its result decides whether the circuit closes or opens again.
//!
//! The breaker fails closed: a coordination primitive never grants a lock or
//! admits a request it could not check.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Externally visible breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls reach the store
    Closed,
    /// Calls are shed without contacting the store
    Open,
    /// One probe call is in flight; everything else is shed
    HalfOpen,
}

/// Configuration for circuit breaker behavior.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive transport failures before opening the circuit
    pub failure_threshold: u32,
    /// How long the circuit stays open before a probe is allowed, and how
    /// long a probe may stay unanswered before another one is sent
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Closed,
    Open { since: Instant },
    Probing { since: Instant },
}

#[derive(Debug)]
struct Inner {
    phase: Phase,
    consecutive_failures: u64,
}

/// Circuit breaker shared by all primitives of a coordinator.
#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<Inner>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    /// Breaker with [`CircuitBreakerConfig::default`].
    pub fn new() -> Self {
        Self::with_config(CircuitBreakerConfig::default())
    }

    /// Breaker with a custom threshold and recovery timeout.
    pub fn with_config(config: CircuitBreakerConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                phase: Phase::Closed,
                consecutive_failures: 0,
            }),
            config,
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state.
    pub fn state(&self) -> CircuitState {
        match self.inner().phase {
            Phase::Closed => CircuitState::Closed,
            Phase::Open { .. } => CircuitState::Open,
            Phase::Probing { .. } => CircuitState::HalfOpen,
        }
    }

    /// Whether the next call may go to the store.
    ///
    /// Exactly one caller is admitted as the probe once the circuit has been
    /// open for the recovery timeout. A probe that never reports back (its
    /// future was dropped) is replaced after another recovery timeout.
    pub fn allow_request(&self) -> bool {
        let mut inner = self.inner();
        match inner.phase {
            Phase::Closed => true,
            Phase::Open { since } => {
                if since.elapsed() < self.config.recovery_timeout {
                    return false;
                }
                inner.phase = Phase::Probing {
                    since: Instant::now(),
                };
                tracing::info!("store circuit half-open, probing");
                true
            }
            Phase::Probing { since } => {
                if since.elapsed() < self.config.recovery_timeout {
                    return false;
                }
                inner.phase = Phase::Probing {
                    since: Instant::now(),
                };
                tracing::debug!("store probe unanswered, sending another");
                true
            }
        }
    }

    /// Record a round trip that reached the store.
    pub fn record_success(&self) {
        let mut inner = self.inner();
        inner.consecutive_failures = 0;
        if let Phase::Probing { .. } = inner.phase {
            inner.phase = Phase::Closed;
            tracing::info!("store circuit closed, store reachable again");
        }
    }

    /// Record a transport failure.
    pub fn record_failure(&self) {
        let mut inner = self.inner();
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        let failures = inner.consecutive_failures;
        let now = Instant::now();

        match inner.phase {
            Phase::Closed if failures >= u64::from(self.config.failure_threshold) => {
                inner.phase = Phase::Open { since: now };
                tracing::warn!(
                    failures,
                    recovery_timeout = ?self.config.recovery_timeout,
                    "store circuit opened, shedding requests"
                );
            }
            Phase::Closed => {}
            Phase::Probing { .. } => {
                inner.phase = Phase::Open { since: now };
                tracing::warn!(failures, "store probe failed, circuit re-opened");
            }
            // Late failures from calls admitted before opening extend the open period
            Phase::Open { .. } => inner.phase = Phase::Open { since: now },
        }
    }

    /// Transport failures since the last call that reached the store.
    pub fn consecutive_failures(&self) -> u64 {
        self.inner().consecutive_failures
    }

    /// Force the circuit closed.
    pub fn reset(&self) {
        let mut inner = self.inner();
        inner.phase = Phase::Closed;
        inner.consecutive_failures = 0;
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}
