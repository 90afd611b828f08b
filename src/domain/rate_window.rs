//! Fixed-window rate limiting.
//!
//! Time is cut into non-overlapping windows of `window_seconds`. Every
//! (resource, identifier) pair gets one counter per window, addressed by
//! `floor(now / window_seconds)`, so all callers inside the same window hit
//! the same key no matter which process they run in. The window key expires
//! after `window_seconds`, which is the whole cleanup story: O(1) state per
//! active window and no sweeper.
//!
//! # Boundary bursts
//!
//! A fixed window resets abruptly. A client can spend its full `limit` in the
//! last instant of one window and again in the first instant of the next, so
//! up to `2 * limit` requests can pass within a span shorter than one window.
//! This is a known property of the scheme, not a bug. Callers that need a
//! strict bound over any sliding interval need a different algorithm.

use crate::domain::reply::{KeyTtl, Reply, ReplyError};
use serde::{Deserialize, Serialize};

/// Window length used when the caller does not pick one.
pub const DEFAULT_WINDOW_SECONDS: u64 = 60;

/// Identifier substituted when the caller passes an empty one.
pub const DEFAULT_IDENTIFIER: &str = "default";

/// Outcome of one rate-limited request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Hits recorded in the current window (including this one when allowed)
    pub current_count: u64,
    /// Configured limit
    pub limit: u64,
    /// Seconds until the current window resets
    pub reset_seconds: u64,
}

impl RateLimitDecision {
    pub(crate) fn from_reply(reply: Reply, limit: u64) -> Result<Self, ReplyError> {
        let mut fields = reply.into_fields(3)?;
        let allowed = fields.integer()? == 1;
        let current_count = non_negative(fields.integer()?, "count")?;
        let reset_seconds = non_negative(fields.integer()?, "reset_seconds")?;
        Ok(Self {
            allowed,
            current_count,
            limit,
            reset_seconds,
        })
    }

    /// Requests left in the current window.
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.current_count)
    }
}

/// Read-only view of a window, without recording a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowStatus {
    /// Hits recorded so far in the current window
    pub current_count: u64,
    /// Seconds until the current window resets
    pub reset_seconds: u64,
}

/// Index of the window containing `now_seconds`.
///
/// `window_seconds` must be non-zero; callers validate it first.
pub fn window_index(now_seconds: u64, window_seconds: u64) -> u64 {
    now_seconds / window_seconds
}

/// Seconds until reset: the key's remaining TTL, or a full window when the
/// key does not exist yet or carries no expiry.
pub fn reset_seconds(ttl: KeyTtl, window_seconds: u64) -> u64 {
    match ttl {
        KeyTtl::Seconds(s) if s > 0 => s,
        _ => window_seconds,
    }
}

/// Normalize an empty identifier to [`DEFAULT_IDENTIFIER`].
pub fn identifier_or_default(identifier: &str) -> &str {
    if identifier.is_empty() {
        DEFAULT_IDENTIFIER
    } else {
        identifier
    }
}

pub(crate) fn hit_args(limit: u64, window_seconds: u64) -> Vec<String> {
    vec![limit.to_string(), window_seconds.to_string()]
}

fn non_negative(value: i64, field: &str) -> Result<u64, ReplyError> {
    u64::try_from(value).map_err(|_| ReplyError::new(format!("negative {}: {}", field, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_index_is_shared_within_a_window() {
        assert_eq!(window_index(120, 60), 2);
        assert_eq!(window_index(179, 60), 2);
        assert_eq!(window_index(180, 60), 3);
        assert_eq!(window_index(0, 60), 0);
    }

    #[test]
    fn test_reset_seconds() {
        assert_eq!(reset_seconds(KeyTtl::Seconds(12), 60), 12);
        assert_eq!(reset_seconds(KeyTtl::Seconds(0), 60), 60);
        assert_eq!(reset_seconds(KeyTtl::Missing, 60), 60);
        assert_eq!(reset_seconds(KeyTtl::Persistent, 30), 30);
    }

    #[test]
    fn test_identifier_default() {
        assert_eq!(identifier_or_default(""), "default");
        assert_eq!(identifier_or_default("user123"), "user123");
    }

    #[test]
    fn test_decode_and_remaining() {
        let reply = Reply::Array(vec![Reply::Integer(1), Reply::Integer(3), Reply::Integer(41)]);
        let decision = RateLimitDecision::from_reply(reply, 5).unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.current_count, 3);
        assert_eq!(decision.reset_seconds, 41);
        assert_eq!(decision.remaining(), 2);
    }

    #[test]
    fn test_decode_rejects_negative_count() {
        let reply = Reply::Array(vec![Reply::Integer(0), Reply::Integer(-1), Reply::Integer(4)]);
        assert!(RateLimitDecision::from_reply(reply, 5).is_err());
    }
}
