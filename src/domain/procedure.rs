//! The closed set of atomic procedures a store must be able to run.
//!
//! Callers never hand the store an arbitrary program. Every multi-step
//! read-decide-write sequence is one of these variants, and each store
//! adapter executes it as a single indivisible unit. The positional
//! `keys`/`args` layout and reply shape of each procedure is documented on
//! its variant and is identical for every adapter.

use std::fmt;

/// An atomic procedure understood by every [`AtomicStore`](crate::AtomicStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Procedure {
    /// `keys = [counter]`, `args = [delta, max or ""]`
    ///
    /// Reply: `[value, accepted(0|1)]`. Rejected when `current + delta > max`;
    /// `value` is then the unchanged current value.
    CounterIncrement,
    /// `keys = [window]`, `args = [limit, window_seconds]`
    ///
    /// Reply: `[allowed(0|1), count, reset_seconds]`. The first hit of a window
    /// sets its expiry.
    RateLimitHit,
    /// `keys = [lock]`, `args = [token, ttl_seconds]`
    ///
    /// Reply: `["acquired"|"renewed"|"locked_by_other", ttl_seconds]`.
    LockAcquire,
    /// `keys = [lock]`, `args = [token]`
    ///
    /// Reply: `["released"|"not_found"|"not_owner", remaining_ttl]`.
    LockRelease,
    /// `keys = [stock, sold, order, sales]`,
    /// `args = [product_id, quantity, order_id, timestamp_ms]`
    ///
    /// Reply: `[status, stock, sold, stock_before]` where status is
    /// `"confirmed"`, `"insufficient_stock"` or `"duplicate_order"`.
    InventoryDecrement,
    /// `keys = [stock]`, `args = [quantity]`
    ///
    /// Reply: new stock.
    InventoryRestock,
    /// `keys = [stock, sold]`, `args = []`
    ///
    /// Reply: `[stock, sold]`.
    InventorySnapshot,
    /// `keys = [order]`, `args = []`
    ///
    /// Reply: `[product_id, quantity, timestamp, status, stock_before, stock_after]`,
    /// all nil when the order does not exist.
    OrderLookup,
    /// `keys = [sales]`, `args = [limit]`
    ///
    /// Reply: array of JSON sale entries, newest first.
    SalesHistory,
    /// `keys = [k1..kn]`, `args = [op1, value1, .., opn, valuen]`
    ///
    /// Reply: one entry per operation (see [`BatchOp`](crate::BatchOp)).
    Batch,
}

impl Procedure {
    /// Every procedure, in declaration order.
    pub const ALL: [Procedure; 10] = [
        Procedure::CounterIncrement,
        Procedure::RateLimitHit,
        Procedure::LockAcquire,
        Procedure::LockRelease,
        Procedure::InventoryDecrement,
        Procedure::InventoryRestock,
        Procedure::InventorySnapshot,
        Procedure::OrderLookup,
        Procedure::SalesHistory,
        Procedure::Batch,
    ];

    /// Stable identifier used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Procedure::CounterIncrement => "counter_increment",
            Procedure::RateLimitHit => "rate_limit_hit",
            Procedure::LockAcquire => "lock_acquire",
            Procedure::LockRelease => "lock_release",
            Procedure::InventoryDecrement => "inventory_decrement",
            Procedure::InventoryRestock => "inventory_restock",
            Procedure::InventorySnapshot => "inventory_snapshot",
            Procedure::OrderLookup => "order_lookup",
            Procedure::SalesHistory => "sales_history",
            Procedure::Batch => "batch",
        }
    }

    /// Whether the procedure may mutate the store.
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            Procedure::InventorySnapshot | Procedure::OrderLookup | Procedure::SalesHistory
        )
    }
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
