//! Oversell-safe stock ledger.
//!
//! A decrement reads stock, checks it and writes stock, sold count, order
//! record and sales history inside one atomic procedure. No concurrent
//! decrement can slip in between the check and the write, which is what
//! keeps stock from going negative.
//!
//! Order ids double as idempotency keys: a decrement whose order record
//! already exists is rejected as [`InventoryRejection::DuplicateOrder`]
//! without touching stock, so a caller that retries after an unknown
//! outcome cannot sell the same order twice.

use crate::domain::reply::{Reply, ReplyError};
use serde::{Deserialize, Serialize};

/// Why a decrement was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryRejection {
    /// Not enough stock for the requested quantity
    InsufficientStock,
    /// An order with this id was already recorded
    DuplicateOrder,
}

/// Status stored on an order record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Stock was taken for this order
    Confirmed,
}

impl OrderStatus {
    /// Wire name stored in the order hash.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Confirmed => "confirmed",
        }
    }

    fn parse(s: &str) -> Result<Self, ReplyError> {
        match s {
            "confirmed" => Ok(OrderStatus::Confirmed),
            other => Err(ReplyError::new(format!("unknown order status {:?}", other))),
        }
    }
}

/// Outcome of [`InventoryLedger::decrement`](crate::InventoryLedger::decrement).
///
/// On rejection nothing was written; `new_stock`/`new_sold` then carry the
/// current values observed by the procedure and `stock_before == new_stock`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecrementOutcome {
    /// Whether stock was taken
    pub accepted: bool,
    /// Stock after the call
    pub new_stock: i64,
    /// Sold count after the call
    pub new_sold: i64,
    /// Stock observed at the start of the atomic procedure
    pub stock_before: i64,
    /// Why the decrement was refused, if it was
    pub rejection: Option<InventoryRejection>,
}

impl DecrementOutcome {
    pub(crate) fn from_reply(reply: Reply) -> Result<Self, ReplyError> {
        let mut fields = reply.into_fields(4)?;
        let status = fields.text()?;
        let new_stock = fields.integer()?;
        let new_sold = fields.integer()?;
        let stock_before = fields.integer()?;
        let rejection = match status.as_str() {
            "confirmed" => None,
            "insufficient_stock" => Some(InventoryRejection::InsufficientStock),
            "duplicate_order" => Some(InventoryRejection::DuplicateOrder),
            other => {
                return Err(ReplyError::new(format!(
                    "unknown decrement status {:?}",
                    other
                )))
            }
        };
        Ok(Self {
            accepted: rejection.is_none(),
            new_stock,
            new_sold,
            stock_before,
            rejection,
        })
    }
}

/// Atomic read of a product's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySnapshot {
    /// Remaining stock
    pub stock: i64,
    /// Units sold
    pub sold: i64,
}

impl InventorySnapshot {
    pub(crate) fn from_reply(reply: Reply) -> Result<Self, ReplyError> {
        let mut fields = reply.into_fields(2)?;
        Ok(Self {
            stock: fields.integer()?,
            sold: fields.integer()?,
        })
    }
}

/// Immutable record written by a successful decrement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    /// Order id the record is stored under
    pub order_id: String,
    /// Product the stock was taken from
    pub product_id: String,
    /// Units taken
    pub quantity: i64,
    /// Unix time of the decrement in milliseconds
    pub timestamp_ms: u64,
    /// Record status
    pub status: OrderStatus,
    /// Stock before the decrement
    pub stock_before: i64,
    /// Stock after the decrement
    pub stock_after: i64,
}

/// Field names of the order hash, in the order the lookup returns them.
pub const ORDER_FIELDS: [&str; 6] = [
    "productId",
    "quantity",
    "timestamp",
    "status",
    "stockBefore",
    "stockAfter",
];

impl OrderRecord {
    pub(crate) fn from_reply(order_id: &str, reply: Reply) -> Result<Option<Self>, ReplyError> {
        let mut fields = reply.into_fields(ORDER_FIELDS.len())?;
        let product_id = match fields.optional_text()? {
            Some(product_id) => product_id,
            None => return Ok(None),
        };
        let quantity = fields.integer()?;
        let timestamp = fields.integer()?;
        let status = OrderStatus::parse(&fields.text()?)?;
        let stock_before = fields.integer()?;
        let stock_after = fields.integer()?;
        Ok(Some(Self {
            order_id: order_id.to_string(),
            product_id,
            quantity,
            timestamp_ms: u64::try_from(timestamp)
                .map_err(|_| ReplyError::new(format!("negative timestamp {}", timestamp)))?,
            status,
            stock_before,
            stock_after,
        }))
    }
}

/// One entry of a product's append-only sales history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRecord {
    /// Order that produced the sale
    pub order_id: String,
    /// Units sold
    pub quantity: i64,
    /// Unix time of the sale in milliseconds
    pub timestamp: u64,
    /// Stock right after the sale
    pub stock_after: i64,
}

impl SaleRecord {
    /// Parse one stored history entry.
    pub fn from_json(entry: &str) -> Result<Self, ReplyError> {
        serde_json::from_str(entry)
            .map_err(|e| ReplyError::new(format!("malformed sale entry {:?}: {}", entry, e)))
    }

    /// Encode for storage.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub(crate) fn list_from_reply(reply: Reply) -> Result<Vec<Self>, ReplyError> {
        reply
            .into_array()?
            .into_iter()
            .map(|entry| Self::from_json(&entry.into_text()?))
            .collect()
    }
}

pub(crate) fn decrement_args(
    product_id: &str,
    quantity: i64,
    order_id: &str,
    timestamp_ms: u64,
) -> Vec<String> {
    vec![
        product_id.to_string(),
        quantity.to_string(),
        order_id.to_string(),
        timestamp_ms.to_string(),
    ]
}

/// Largest sales-history limit sent to the store.
///
/// Lua numbers are doubles, so this is the largest count that survives the
/// trip into `LRANGE` exactly. Larger limits are clamped to it.
pub const MAX_HISTORY_LIMIT: u64 = (1 << 53) - 1;

pub(crate) fn history_args(limit: usize) -> Vec<String> {
    let limit = u64::try_from(limit).unwrap_or(u64::MAX);
    vec![limit.min(MAX_HISTORY_LIMIT).to_string()]
}
