//! Atomic batches of set/get/incr/del operations.

use crate::application::error::Result;
use crate::application::runner::Runner;
use crate::domain::batch::{decode, encode, BatchOp, BatchResult};
use crate::domain::procedure::Procedure;
use crate::domain::validation::{non_empty, ValidationError};

/// Runs a list of [`BatchOp`]s as one atomic unit, in order.
#[derive(Debug, Clone)]
pub struct AtomicBatch {
    runner: Runner,
    max_ops: usize,
}

impl AtomicBatch {
    pub(crate) fn new(runner: Runner, max_ops: usize) -> Self {
        Self { runner, max_ops }
    }

    /// Largest batch accepted.
    pub fn max_ops(&self) -> usize {
        self.max_ops
    }

    /// Execute `ops` atomically and return one result per operation.
    ///
    /// No other store operation interleaves with the batch. If one operation
    /// fails (e.g. `incr` on a non-integer value) the batch stops there with
    /// [`StoreError::Command`](crate::StoreError::Command); writes made by
    /// earlier operations stay applied.
    pub async fn execute(&self, ops: &[BatchOp]) -> Result<Vec<BatchResult>> {
        if ops.is_empty() {
            return Err(ValidationError::Empty { field: "ops" }.into());
        }
        if ops.len() > self.max_ops {
            return Err(ValidationError::BatchTooLarge {
                len: ops.len(),
                max: self.max_ops,
            }
            .into());
        }
        for op in ops {
            non_empty("key", op.key())?;
        }

        let (keys, args) = encode(ops, self.runner.keys());
        let results = self
            .runner
            .exec(Procedure::Batch, keys, args, |reply| decode(ops, reply))
            .await?;

        tracing::debug!(ops = ops.len(), "batch executed");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::error::CoordinationError;
    use crate::application::ports::StoreError;
    use crate::application::runner::tests::{runner_over, FailingStore};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_size_limits() {
        let store = Arc::new(FailingStore::new(StoreError::Connection("down".into())));
        let batch = AtomicBatch::new(runner_over(store.clone(), 5), 2);

        assert_eq!(
            batch.execute(&[]).await.unwrap_err(),
            CoordinationError::Validation(ValidationError::Empty { field: "ops" })
        );

        let ops = vec![BatchOp::get("a"), BatchOp::get("b"), BatchOp::get("c")];
        assert_eq!(
            batch.execute(&ops).await.unwrap_err(),
            CoordinationError::Validation(ValidationError::BatchTooLarge { len: 3, max: 2 })
        );

        assert_eq!(
            batch.execute(&[BatchOp::del("")]).await.unwrap_err(),
            CoordinationError::Validation(ValidationError::Empty { field: "key" })
        );
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }
}
