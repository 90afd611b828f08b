//! Store-neutral reply values returned by atomic procedures.
//!
//! Adapters convert their native reply type into [`Reply`]; the domain
//! decoders then read positional fields out of it.

use std::fmt;

/// A value returned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Missing value
    Nil,
    /// Integer value
    Integer(i64),
    /// String value
    Text(String),
    /// Ordered list of values
    Array(Vec<Reply>),
}

/// A reply did not have the shape a decoder expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyError {
    detail: String,
}

impl ReplyError {
    pub(crate) fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }

    /// Human readable description of the mismatch.
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl fmt::Display for ReplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.detail)
    }
}

impl std::error::Error for ReplyError {}

impl Reply {
    /// Convenience constructor for text replies.
    pub fn text(value: impl Into<String>) -> Self {
        Reply::Text(value.into())
    }

    /// Interpret as an integer. Numeric text is accepted since stores return
    /// counters as strings on plain reads.
    pub fn as_integer(&self) -> Result<i64, ReplyError> {
        match self {
            Reply::Integer(n) => Ok(*n),
            Reply::Text(s) => s
                .parse()
                .map_err(|_| ReplyError::new(format!("expected integer, got {:?}", s))),
            other => Err(ReplyError::new(format!("expected integer, got {:?}", other))),
        }
    }

    /// Interpret as an optional string; `Nil` maps to `None`.
    pub fn into_optional_text(self) -> Result<Option<String>, ReplyError> {
        match self {
            Reply::Nil => Ok(None),
            Reply::Text(s) => Ok(Some(s)),
            Reply::Integer(n) => Ok(Some(n.to_string())),
            Reply::Array(_) => Err(ReplyError::new("expected text, got array")),
        }
    }

    /// Interpret as a string.
    pub fn into_text(self) -> Result<String, ReplyError> {
        self.into_optional_text()?
            .ok_or_else(|| ReplyError::new("expected text, got nil"))
    }

    /// Interpret as an array of exactly `len` positional fields.
    pub fn into_fields(self, len: usize) -> Result<Fields, ReplyError> {
        match self {
            Reply::Array(items) if items.len() == len => Ok(Fields {
                items: items.into_iter(),
                position: 0,
            }),
            Reply::Array(items) => Err(ReplyError::new(format!(
                "expected {} fields, got {}",
                len,
                items.len()
            ))),
            other => Err(ReplyError::new(format!("expected array, got {:?}", other))),
        }
    }

    /// Interpret as an array of any length.
    pub fn into_array(self) -> Result<Vec<Reply>, ReplyError> {
        match self {
            Reply::Array(items) => Ok(items),
            other => Err(ReplyError::new(format!("expected array, got {:?}", other))),
        }
    }
}

/// Remaining lifetime of a key as reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// The key does not exist
    Missing,
    /// The key exists without an expiry
    Persistent,
    /// The key expires in this many seconds
    Seconds(u64),
}

impl KeyTtl {
    /// Decode the store's numeric convention: `-2` missing, `-1` persistent.
    pub fn from_code(code: i64) -> Self {
        match code {
            -2 => KeyTtl::Missing,
            c if c < 0 => KeyTtl::Persistent,
            c => KeyTtl::Seconds(c as u64),
        }
    }

    /// Encode back into the store's numeric convention.
    pub fn code(&self) -> i64 {
        match self {
            KeyTtl::Missing => -2,
            KeyTtl::Persistent => -1,
            KeyTtl::Seconds(s) => i64::try_from(*s).unwrap_or(i64::MAX),
        }
    }

    /// Seconds remaining, if the key expires at all.
    pub fn seconds(&self) -> Option<u64> {
        match self {
            KeyTtl::Seconds(s) => Some(*s),
            _ => None,
        }
    }
}

/// Cursor over the positional fields of an array reply.
#[derive(Debug)]
pub struct Fields {
    items: std::vec::IntoIter<Reply>,
    position: usize,
}

impl Fields {
    fn next_item(&mut self) -> Result<Reply, ReplyError> {
        self.position += 1;
        self.items
            .next()
            .ok_or_else(|| ReplyError::new(format!("missing field {}", self.position)))
    }

    /// Next field as an integer.
    pub fn integer(&mut self) -> Result<i64, ReplyError> {
        let position = self.position + 1;
        self.next_item()?
            .as_integer()
            .map_err(|e| ReplyError::new(format!("field {}: {}", position, e)))
    }

    /// Next field as text.
    pub fn text(&mut self) -> Result<String, ReplyError> {
        let position = self.position + 1;
        self.next_item()?
            .into_text()
            .map_err(|e| ReplyError::new(format!("field {}: {}", position, e)))
    }

    /// Next field as optional text.
    pub fn optional_text(&mut self) -> Result<Option<String>, ReplyError> {
        let position = self.position + 1;
        self.next_item()?
            .into_optional_text()
            .map_err(|e| ReplyError::new(format!("field {}: {}", position, e)))
    }
}
