//! Distributed lock with owner tokens, TTL and renewal.

use crate::application::error::Result;
use crate::application::runner::Runner;
use crate::domain::lock::{
    acquire_args, AcquireOutcome, AcquireStatus, LockHolder, OwnerToken, ReleaseOutcome,
    ReleaseStatus,
};
use crate::domain::procedure::Procedure;
use crate::domain::validation::{non_empty, positive_u64};

/// Mutual-exclusion lock over a named resource.
///
/// Acquire and release each run as one atomic procedure in the store.
/// When either call fails with an error whose
/// [`outcome_unknown`](crate::CoordinationError::outcome_unknown) is true,
/// the caller must treat lock ownership as unknown and must not proceed as
/// the holder.
#[derive(Debug, Clone)]
pub struct DistributedLock {
    runner: Runner,
    default_ttl_seconds: u64,
}

impl DistributedLock {
    pub(crate) fn new(runner: Runner, default_ttl_seconds: u64) -> Self {
        Self {
            runner,
            default_ttl_seconds,
        }
    }

    /// TTL used by [`acquire_default_ttl`](Self::acquire_default_ttl).
    pub fn default_ttl_seconds(&self) -> u64 {
        self.default_ttl_seconds
    }

    /// Take the lock for `token`, or renew it if `token` already holds it.
    ///
    /// Returns [`AcquireStatus::LockedByOther`] with the holder's remaining
    /// TTL when a different token holds the lock.
    pub async fn acquire(
        &self,
        resource: &str,
        token: &OwnerToken,
        ttl_seconds: u64,
    ) -> Result<AcquireOutcome> {
        non_empty("resource", resource)?;
        non_empty("token", token.as_str())?;
        positive_u64("ttl_seconds", ttl_seconds)?;

        let key = self.runner.keys().lock(resource);
        let outcome = self
            .runner
            .exec(
                Procedure::LockAcquire,
                vec![key],
                acquire_args(token, ttl_seconds),
                AcquireOutcome::from_reply,
            )
            .await?;

        let metrics = self.runner.metrics();
        match outcome.status {
            AcquireStatus::Acquired => metrics.record_lock_acquired(),
            AcquireStatus::Renewed => metrics.record_lock_renewed(),
            AcquireStatus::LockedByOther => metrics.record_lock_contended(),
        }
        tracing::debug!(
            resource,
            status = outcome.status.as_str(),
            ttl = outcome.ttl_seconds,
            "lock acquire"
        );
        Ok(outcome)
    }

    /// [`acquire`](Self::acquire) with the configured default TTL.
    pub async fn acquire_default_ttl(
        &self,
        resource: &str,
        token: &OwnerToken,
    ) -> Result<AcquireOutcome> {
        self.acquire(resource, token, self.default_ttl_seconds).await
    }

    /// Delete the lock if and only if `token` holds it.
    pub async fn release(&self, resource: &str, token: &OwnerToken) -> Result<ReleaseOutcome> {
        non_empty("resource", resource)?;
        non_empty("token", token.as_str())?;

        let key = self.runner.keys().lock(resource);
        let outcome = self
            .runner
            .exec(
                Procedure::LockRelease,
                vec![key],
                vec![token.as_str().to_string()],
                ReleaseOutcome::from_reply,
            )
            .await?;

        match outcome.status {
            ReleaseStatus::Released => self.runner.metrics().record_lock_released(),
            ReleaseStatus::NotFound | ReleaseStatus::NotOwner => {
                self.runner.metrics().record_release_refused()
            }
        }
        tracing::debug!(
            resource,
            status = outcome.status.as_str(),
            remaining_ttl = outcome.remaining_ttl,
            "lock release"
        );
        Ok(outcome)
    }

    /// Who holds the lock right now, if anyone.
    ///
    /// Advisory only: the answer may be stale by the time it is read.
    /// Never acquire or release based on it.
    pub async fn holder(&self, resource: &str) -> Result<Option<LockHolder>> {
        non_empty("resource", resource)?;

        let key = self.runner.keys().lock(resource);
        let token = match self.runner.get(&key).await? {
            Some(token) => OwnerToken::from(token),
            None => return Ok(None),
        };
        let ttl = self.runner.ttl(&key).await?;
        Ok(Some(LockHolder {
            token,
            ttl_seconds: ttl.seconds(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::error::CoordinationError;
    use crate::application::ports::StoreError;
    use crate::application::runner::tests::{runner_over, CannedStore, FailingStore};
    use crate::domain::reply::Reply;
    use crate::domain::validation::ValidationError;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_validation() {
        let store = Arc::new(FailingStore::new(StoreError::Connection("down".into())));
        let lock = DistributedLock::new(runner_over(store.clone(), 5), 30);
        let token = OwnerToken::new("worker-1");

        assert_eq!(
            lock.acquire("orders", &token, 0).await.unwrap_err(),
            CoordinationError::Validation(ValidationError::NotPositive {
                field: "ttl_seconds",
                value: 0
            })
        );
        assert_eq!(
            lock.release("orders", &OwnerToken::new("")).await.unwrap_err(),
            CoordinationError::Validation(ValidationError::Empty { field: "token" })
        );
        assert_eq!(
            lock.holder("").await.unwrap_err(),
            CoordinationError::Validation(ValidationError::Empty { field: "resource" })
        );
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_acquire_has_unknown_outcome() {
        let store = Arc::new(FailingStore::new(StoreError::Timeout(
            std::time::Duration::from_secs(2),
        )));
        let lock = DistributedLock::new(runner_over(store, 5), 30);

        let err = lock
            .acquire_default_ttl("orders", &OwnerToken::generate())
            .await
            .unwrap_err();
        assert!(err.outcome_unknown());
    }

    #[tokio::test]
    async fn test_contention_counts_in_metrics() {
        let reply = Reply::Array(vec![Reply::text("locked_by_other"), Reply::Integer(12)]);
        let lock = DistributedLock::new(runner_over(Arc::new(CannedStore(reply)), 5), 30);

        let outcome = lock
            .acquire("orders", &OwnerToken::new("b"), 30)
            .await
            .unwrap();
        assert!(!outcome.is_held());
        assert_eq!(outcome.ttl_seconds, 12);
        assert_eq!(lock.runner.metrics().locks_contended(), 1);
    }
}
