//! Shared execution path for every primitive.
//!
//! Each component holds a [`Runner`] and goes through it for all store round
//! trips, so the circuit breaker, failure metrics and reply decoding errors
//! are handled in one place.

use crate::application::circuit_breaker::CircuitBreaker;
use crate::application::error::{CoordinationError, Result};
use crate::application::metrics::Metrics;
use crate::application::ports::{AtomicStore, Clock, StoreError};
use crate::domain::keys::KeySpace;
use crate::domain::procedure::Procedure;
use crate::domain::reply::{KeyTtl, Reply, ReplyError};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub(crate) struct Runner {
    store: Arc<dyn AtomicStore>,
    clock: Arc<dyn Clock>,
    breaker: Arc<CircuitBreaker>,
    metrics: Metrics,
    keys: KeySpace,
}

impl Runner {
    pub(crate) fn new(
        store: Arc<dyn AtomicStore>,
        clock: Arc<dyn Clock>,
        breaker: Arc<CircuitBreaker>,
        metrics: Metrics,
        keys: KeySpace,
    ) -> Self {
        Self {
            store,
            clock,
            breaker,
            metrics,
            keys,
        }
    }

    pub(crate) fn keys(&self) -> &KeySpace {
        &self.keys
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub(crate) fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Run one atomic procedure and decode its reply.
    pub(crate) async fn exec<T>(
        &self,
        procedure: Procedure,
        keys: Vec<String>,
        args: Vec<String>,
        decode: impl FnOnce(Reply) -> std::result::Result<T, ReplyError>,
    ) -> Result<T> {
        let reply = self
            .guard(procedure.name(), self.store.atomic_exec(procedure, &keys, &args))
            .await?;
        decode(reply).map_err(|e| {
            tracing::warn!(%procedure, keys = ?keys, error = %e, "store returned malformed reply");
            CoordinationError::UnexpectedReply {
                procedure,
                detail: e.detail().to_string(),
            }
        })
    }

    /// Plain read of a single key.
    pub(crate) async fn get(&self, key: &str) -> Result<Option<String>> {
        self.guard("get", self.store.get(key)).await
    }

    /// Read an integer key written by `owner`, 0 when absent.
    pub(crate) async fn get_integer(&self, key: &str, owner: Procedure) -> Result<i64> {
        match self.get(key).await? {
            None => Ok(0),
            Some(raw) => Reply::Text(raw).as_integer().map_err(|e| {
                CoordinationError::UnexpectedReply {
                    procedure: owner,
                    detail: format!("{}: {}", key, e),
                }
            }),
        }
    }

    /// Remaining lifetime of a single key.
    pub(crate) async fn ttl(&self, key: &str) -> Result<KeyTtl> {
        self.guard("ttl", self.store.ttl(key)).await
    }

    async fn guard<T>(
        &self,
        operation: &'static str,
        call: impl std::future::Future<Output = std::result::Result<T, StoreError>>,
    ) -> Result<T> {
        if !self.breaker.allow_request() {
            self.metrics.record_store_failure();
            tracing::debug!(operation, "store circuit open, shedding call");
            return Err(StoreError::CircuitOpen.into());
        }

        match call.await {
            Ok(value) => {
                self.breaker.record_success();
                Ok(value)
            }
            Err(e) => {
                // Command errors come from a healthy store rejecting the call
                if e.is_transport() {
                    self.breaker.record_failure();
                } else {
                    self.breaker.record_success();
                }
                self.metrics.record_store_failure();
                tracing::warn!(operation, error = %e, "store call failed");
                Err(e.into())
            }
        }
    }
}
