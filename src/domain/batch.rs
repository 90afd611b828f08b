//! Atomic multi-key batches over a closed set of operations.
//!
//! Only the four operations below can be expressed, each tagged on the wire
//! by a fixed name. There is no way to smuggle an arbitrary store command
//! into a batch.

use crate::domain::keys::KeySpace;
use crate::domain::reply::{Reply, ReplyError};
use serde::{Deserialize, Serialize};

/// Largest batch accepted unless configured otherwise.
pub const DEFAULT_MAX_BATCH_OPS: usize = 64;

/// One operation inside a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchOp {
    /// Store `value` under `key`
    Set {
        /// Target key
        key: String,
        /// Value to store
        value: String,
    },
    /// Read `key`
    Get {
        /// Target key
        key: String,
    },
    /// Add `by` to the integer at `key`
    Incr {
        /// Target key
        key: String,
        /// Amount to add
        by: i64,
    },
    /// Delete `key`
    Del {
        /// Target key
        key: String,
    },
}

impl BatchOp {
    /// `Set` operation.
    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Self {
        BatchOp::Set {
            key: key.into(),
            value: value.into(),
        }
    }

    /// `Get` operation.
    pub fn get(key: impl Into<String>) -> Self {
        BatchOp::Get { key: key.into() }
    }

    /// `Incr` operation.
    pub fn incr(key: impl Into<String>, by: i64) -> Self {
        BatchOp::Incr {
            key: key.into(),
            by,
        }
    }

    /// `Del` operation.
    pub fn del(key: impl Into<String>) -> Self {
        BatchOp::Del { key: key.into() }
    }

    /// The key this operation touches.
    pub fn key(&self) -> &str {
        match self {
            BatchOp::Set { key, .. }
            | BatchOp::Get { key }
            | BatchOp::Incr { key, .. }
            | BatchOp::Del { key } => key,
        }
    }

    /// Wire tag of the operation.
    pub fn tag(&self) -> &'static str {
        match self {
            BatchOp::Set { .. } => "set",
            BatchOp::Get { .. } => "get",
            BatchOp::Incr { .. } => "incr",
            BatchOp::Del { .. } => "del",
        }
    }

    fn argument(&self) -> String {
        match self {
            BatchOp::Set { value, .. } => value.clone(),
            BatchOp::Incr { by, .. } => by.to_string(),
            BatchOp::Get { .. } | BatchOp::Del { .. } => String::new(),
        }
    }

    fn decode(&self, reply: Reply) -> Result<BatchResult, ReplyError> {
        match self {
            BatchOp::Set { .. } => match reply.into_text()?.as_str() {
                "OK" => Ok(BatchResult::Ok),
                other => Err(ReplyError::new(format!("unexpected set reply {:?}", other))),
            },
            BatchOp::Get { .. } => Ok(BatchResult::Value(reply.into_optional_text()?)),
            BatchOp::Incr { .. } => Ok(BatchResult::Integer(reply.as_integer()?)),
            BatchOp::Del { .. } => Ok(BatchResult::Deleted(reply.as_integer()?)),
        }
    }
}

/// Result of one batch operation, positionally matching the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum BatchResult {
    /// `Set` completed
    Ok,
    /// Value read by `Get`
    Value(Option<String>),
    /// New value after `Incr`
    Integer(i64),
    /// Number of keys removed by `Del`
    Deleted(i64),
}

/// Split a batch into the procedure's `keys` and `args` vectors.
pub(crate) fn encode(ops: &[BatchOp], keys: &KeySpace) -> (Vec<String>, Vec<String>) {
    let store_keys = ops.iter().map(|op| keys.plain(op.key())).collect();
    let args = ops
        .iter()
        .flat_map(|op| [op.tag().to_string(), op.argument()])
        .collect();
    (store_keys, args)
}

pub(crate) fn decode(ops: &[BatchOp], reply: Reply) -> Result<Vec<BatchResult>, ReplyError> {
    let items = reply.into_array()?;
    if items.len() != ops.len() {
        return Err(ReplyError::new(format!(
            "expected {} batch results, got {}",
            ops.len(),
            items.len()
        )));
    }
    ops.iter()
        .zip(items)
        .map(|(op, item)| op.decode(item))
        .collect()
}
