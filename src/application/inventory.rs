//! Oversell-safe inventory ledger.

use crate::application::error::Result;
use crate::application::runner::Runner;
use crate::domain::inventory::{
    decrement_args, history_args, DecrementOutcome, InventorySnapshot, OrderRecord, SaleRecord,
};
use crate::domain::procedure::Procedure;
use crate::domain::validation::{non_empty, positive, positive_u64};

/// Stock ledger whose decrements can never drive stock below zero.
///
/// Every write to a product's stock, sold count, order records and sales
/// history goes through one atomic procedure.
#[derive(Debug, Clone)]
pub struct InventoryLedger {
    runner: Runner,
}

impl InventoryLedger {
    pub(crate) fn new(runner: Runner) -> Self {
        Self { runner }
    }

    /// Take `quantity` units of `product_id` for order `order_id`.
    ///
    /// On success the stock and sold counters move together, an order record
    /// is written under `order_id` and a sale is prepended to the product's
    /// history. A refused decrement writes nothing.
    ///
    /// `order_id` is an idempotency key: reusing one is refused as
    /// [`DuplicateOrder`](crate::InventoryRejection::DuplicateOrder). That
    /// makes a retry after a timed-out call safe.
    pub async fn decrement(
        &self,
        product_id: &str,
        quantity: i64,
        order_id: &str,
    ) -> Result<DecrementOutcome> {
        non_empty("product_id", product_id)?;
        non_empty("order_id", order_id)?;
        positive("quantity", quantity)?;

        let keys = self.runner.keys().inventory(product_id, order_id);
        let timestamp_ms = self.runner.clock().unix_millis();
        let outcome = self
            .runner
            .exec(
                Procedure::InventoryDecrement,
                keys.into_vec(),
                decrement_args(product_id, quantity, order_id, timestamp_ms),
                DecrementOutcome::from_reply,
            )
            .await?;

        if outcome.accepted {
            self.runner.metrics().record_order_confirmed();
        } else {
            self.runner.metrics().record_order_rejected();
        }
        tracing::debug!(
            product_id,
            order_id,
            quantity,
            accepted = outcome.accepted,
            rejection = ?outcome.rejection,
            stock_before = outcome.stock_before,
            stock = outcome.new_stock,
            "inventory decrement"
        );
        Ok(outcome)
    }

    /// Add `quantity` units to the product's stock and return the new stock.
    pub async fn restock(&self, product_id: &str, quantity: i64) -> Result<i64> {
        non_empty("product_id", product_id)?;
        positive("quantity", quantity)?;

        let key = self.runner.keys().stock(product_id);
        let stock = self
            .runner
            .exec(
                Procedure::InventoryRestock,
                vec![key],
                vec![quantity.to_string()],
                |reply| reply.as_integer(),
            )
            .await?;

        tracing::debug!(product_id, quantity, stock, "inventory restock");
        Ok(stock)
    }

    /// Stock and sold count, read together.
    pub async fn snapshot(&self, product_id: &str) -> Result<InventorySnapshot> {
        non_empty("product_id", product_id)?;

        let keys = self.runner.keys();
        self.runner
            .exec(
                Procedure::InventorySnapshot,
                vec![keys.stock(product_id), keys.sold(product_id)],
                Vec::new(),
                InventorySnapshot::from_reply,
            )
            .await
    }

    /// The record written by a confirmed decrement, if one exists.
    pub async fn order(&self, order_id: &str) -> Result<Option<OrderRecord>> {
        non_empty("order_id", order_id)?;

        let key = self.runner.keys().order(order_id);
        self.runner
            .exec(Procedure::OrderLookup, vec![key], Vec::new(), |reply| {
                OrderRecord::from_reply(order_id, reply)
            })
            .await
    }

    /// Up to `limit` most recent sales of the product, newest first.
    ///
    /// Limits above [`MAX_HISTORY_LIMIT`](crate::domain::inventory::MAX_HISTORY_LIMIT)
    /// are clamped.
    pub async fn sales_history(
        &self,
        product_id: &str,
        limit: usize,
    ) -> Result<Vec<SaleRecord>> {
        non_empty("product_id", product_id)?;
        positive_u64("limit", u64::try_from(limit).unwrap_or(u64::MAX))?;

        let key = self.runner.keys().sales(product_id);
        self.runner
            .exec(
                Procedure::SalesHistory,
                vec![key],
                history_args(limit),
                SaleRecord::list_from_reply,
            )
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
    async fn test_validation() {
        let store = Arc::new(FailingStore::new(StoreError::Connection("down".into())));
        let ledger = InventoryLedger::new(runner_over(store.clone(), 5));

        assert_eq!(
            ledger.decrement("laptop", 0, "ord_1").await.unwrap_err(),
            CoordinationError::Validation(ValidationError::NotPositive {
                field: "quantity",
                value: 0
            })
        );
        assert_eq!(
            ledger.decrement("laptop", 1, "").await.unwrap_err(),
            CoordinationError::Validation(ValidationError::Empty { field: "order_id" })
        );
        assert_eq!(
            ledger.restock("laptop", -5).await.unwrap_err(),
            CoordinationError::Validation(ValidationError::NotPositive {
                field: "quantity",
                value: -5
            })
        );
        assert_eq!(
            ledger.sales_history("laptop", 0).await.unwrap_err(),
            CoordinationError::Validation(ValidationError::NotPositive {
                field: "limit",
                value: 0
            })
        );
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rejection_counts_in_metrics() {
        let reply = Reply::Array(vec![
            Reply::text("insufficient_stock"),
            Reply::Integer(1),
            Reply::Integer(9),
            Reply::Integer(1),
        ]);
        let ledger = InventoryLedger::new(runner_over(Arc::new(CannedStore(reply)), 5));

        let outcome = ledger.decrement("laptop", 2, "ord_1").await.unwrap();
        assert!(!outcome.accepted);
        assert_eq!(ledger.runner.metrics().orders_rejected(), 1);
        assert_eq!(ledger.runner.metrics().orders_confirmed(), 0);
    }
}
