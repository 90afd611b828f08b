//! Bounded atomic counters.

use crate::application::error::Result;
use crate::application::runner::Runner;
use crate::domain::counter::{increment_args, CounterOutcome};
use crate::domain::procedure::Procedure;
use crate::domain::validation::non_empty;

/// Atomic counter with an optional upper bound.
///
/// Obtained from [`Coordinator::counter`](crate::Coordinator::counter).
#[derive(Debug, Clone)]
pub struct AtomicCounter {
    runner: Runner,
}

impl AtomicCounter {
    pub(crate) fn new(runner: Runner) -> Self {
        Self { runner }
    }

    /// Add `delta` to the counter at `key` unless that would exceed `max`.
    ///
    /// A missing counter starts at 0. `delta` may be negative. With `max`
    /// set, the check and the add happen in one atomic procedure, so the
    /// value never exceeds `max` however many callers race.
    ///
    /// # Examples
    ///
    /// ```
    /// use atomic_coord::{Coordinator, MemoryStore};
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let coord = Coordinator::builder().with_store(MemoryStore::new()).build()?;
    /// let counter = coord.counter();
    ///
    /// assert!(counter.increment("seats", 2, Some(3)).await?.accepted);
    /// let outcome = counter.increment("seats", 2, Some(3)).await?;
    /// assert!(!outcome.accepted);
    /// assert_eq!(outcome.value, 2);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn increment(
        &self,
        key: &str,
        delta: i64,
        max: Option<i64>,
    ) -> Result<CounterOutcome> {
        non_empty("key", key)?;

        let store_key = self.runner.keys().counter(key);
        let outcome = self
            .runner
            .exec(
                Procedure::CounterIncrement,
                vec![store_key],
                increment_args(delta, max),
                CounterOutcome::from_reply,
            )
            .await?;

        if outcome.accepted {
            self.runner.metrics().record_counter_accepted();
        } else {
            self.runner.metrics().record_counter_rejected();
        }
        tracing::debug!(
            key,
            delta,
            ?max,
            value = outcome.value,
            accepted = outcome.accepted,
            "counter increment"
        );
        Ok(outcome)
    }

    /// Current value of the counter, 0 if it was never written.
    pub async fn current(&self, key: &str) -> Result<i64> {
        non_empty("key", key)?;

        let store_key = self.runner.keys().counter(key);
        self.runner
            .get_integer(&store_key, Procedure::CounterIncrement)
            .await
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
    async fn test_empty_key_never_reaches_store() {
        let store = Arc::new(FailingStore::new(StoreError::Connection("down".into())));
        let counter = AtomicCounter::new(runner_over(store.clone(), 5));

        let err = counter.increment("", 1, None).await.unwrap_err();
        assert_eq!(
            err,
            CoordinationError::Validation(ValidationError::Empty { field: "key" })
        );
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_store_failure_surfaces() {
        let store = Arc::new(FailingStore::new(StoreError::Timeout(
            std::time::Duration::from_secs(2),
        )));
        let counter = AtomicCounter::new(runner_over(store, 5));

        let err = counter.increment("views", 1, None).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(err.outcome_unknown());
    }

    #[tokio::test]
    async fn test_rejection_counts_in_metrics() {
        let reply = Reply::Array(vec![Reply::Integer(10), Reply::Integer(0)]);
        let counter = AtomicCounter::new(runner_over(Arc::new(CannedStore(reply)), 5));

        let outcome = counter.increment("views", 1, Some(10)).await.unwrap();
        assert!(!outcome.accepted);
        assert_eq!(counter.runner.metrics().counter_rejected(), 1);
    }
}
