//! Distributed mutual-exclusion lock state.
//!
//! ```text
//!            acquire (free)              release (owner) / ttl expiry
//!   FREE ───────────────────▶ HELD(token) ─────────────────────────▶ FREE
//!                               │    ▲
//!                               └────┘ acquire (same token): renew expiry
//! ```
//!
//! Holders only keep exclusivity for the TTL they asked for. Work that may
//! outlive it must renew (re-acquire with the same token) before expiry.

use crate::domain::reply::{Reply, ReplyError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lock TTL used when the caller does not pick one.
pub const DEFAULT_LOCK_TTL_SECONDS: u64 = 30;

/// Opaque proof of lock ownership.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerToken(String);

impl OwnerToken {
    /// Wrap an existing token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Generate a fresh random token.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// The token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for OwnerToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for OwnerToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

/// Result of an acquire attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquireStatus {
    /// The lock was free and now belongs to the caller
    Acquired,
    /// The caller already held the lock; its expiry was refreshed
    Renewed,
    /// Another token holds the lock; the caller must not proceed
    LockedByOther,
}

impl AcquireStatus {
    /// Wire name used by the store procedures.
    pub fn as_str(&self) -> &'static str {
        match self {
            AcquireStatus::Acquired => "acquired",
            AcquireStatus::Renewed => "renewed",
            AcquireStatus::LockedByOther => "locked_by_other",
        }
    }

    fn parse(s: &str) -> Result<Self, ReplyError> {
        match s {
            "acquired" => Ok(AcquireStatus::Acquired),
            "renewed" => Ok(AcquireStatus::Renewed),
            "locked_by_other" => Ok(AcquireStatus::LockedByOther),
            other => Err(ReplyError::new(format!("unknown acquire status {:?}", other))),
        }
    }
}

/// Outcome of [`DistributedLock::acquire`](crate::DistributedLock::acquire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcquireOutcome {
    /// What happened
    pub status: AcquireStatus,
    /// The caller's new TTL when held, or the holder's remaining TTL when
    /// locked by another token (`-1` if the holder's key never expires)
    pub ttl_seconds: i64,
}

impl AcquireOutcome {
    pub(crate) fn from_reply(reply: Reply) -> Result<Self, ReplyError> {
        let mut fields = reply.into_fields(2)?;
        let status = AcquireStatus::parse(&fields.text()?)?;
        let ttl_seconds = fields.integer()?;
        Ok(Self {
            status,
            ttl_seconds,
        })
    }

    /// Whether the caller holds the lock after this call.
    pub fn is_held(&self) -> bool {
        matches!(
            self.status,
            AcquireStatus::Acquired | AcquireStatus::Renewed
        )
    }
}

/// Result of a release attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseStatus {
    /// The caller owned the lock and it was deleted
    Released,
    /// No lock existed (never acquired, already released, or expired)
    NotFound,
    /// Another token holds the lock; it was left untouched
    NotOwner,
}

impl ReleaseStatus {
    /// Wire name used by the store procedures.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseStatus::Released => "released",
            ReleaseStatus::NotFound => "not_found",
            ReleaseStatus::NotOwner => "not_owner",
        }
    }

    fn parse(s: &str) -> Result<Self, ReplyError> {
        match s {
            "released" => Ok(ReleaseStatus::Released),
            "not_found" => Ok(ReleaseStatus::NotFound),
            "not_owner" => Ok(ReleaseStatus::NotOwner),
            other => Err(ReplyError::new(format!("unknown release status {:?}", other))),
        }
    }
}

/// Outcome of [`DistributedLock::release`](crate::DistributedLock::release).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseOutcome {
    /// What happened
    pub status: ReleaseStatus,
    /// Remaining TTL of the current holder when `NotOwner`, otherwise 0
    pub remaining_ttl: i64,
}

impl ReleaseOutcome {
    pub(crate) fn from_reply(reply: Reply) -> Result<Self, ReplyError> {
        let mut fields = reply.into_fields(2)?;
        let status = ReleaseStatus::parse(&fields.text()?)?;
        let remaining_ttl = fields.integer()?;
        Ok(Self {
            status,
            remaining_ttl,
        })
    }
}

/// Advisory snapshot of who holds a lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockHolder {
    /// Current owner token
    pub token: OwnerToken,
    /// Seconds until expiry, `None` if the key never expires
    pub ttl_seconds: Option<u64>,
}

pub(crate) fn acquire_args(token: &OwnerToken, ttl_seconds: u64) -> Vec<String> {
    vec![token.as_str().to_string(), ttl_seconds.to_string()]
}
