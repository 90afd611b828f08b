//! Bounded and unbounded atomic counters.

use crate::domain::reply::{Reply, ReplyError};
use serde::{Deserialize, Serialize};

/// Default increment applied when the caller does not pick one.
pub const DEFAULT_DELTA: i64 = 1;

/// Result of an increment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterOutcome {
    /// New value when accepted, unchanged current value when rejected
    pub value: i64,
    /// Whether the delta was applied
    pub accepted: bool,
}

impl CounterOutcome {
    pub(crate) fn from_reply(reply: Reply) -> Result<Self, ReplyError> {
        let mut fields = reply.into_fields(2)?;
        let value = fields.integer()?;
        let accepted = fields.integer()? == 1;
        Ok(Self { value, accepted })
    }
}

/// Whether applying `delta` to `current` would overshoot `max`.
///
/// Compared in 128-bit so values near the `i64` edges cannot wrap.
pub fn exceeds_max(current: i64, delta: i64, max: Option<i64>) -> bool {
    match max {
        Some(max) => current as i128 + delta as i128 > max as i128,
        None => false,
    }
}

pub(crate) fn increment_args(delta: i64, max: Option<i64>) -> Vec<String> {
    vec![
        delta.to_string(),
        max.map(|m| m.to_string()).unwrap_or_default(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exceeds_max() {
        assert!(!exceeds_max(5, 5, Some(10)));
        assert!(exceeds_max(5, 6, Some(10)));
        assert!(!exceeds_max(i64::MAX - 1, 1, None));
        assert!(!exceeds_max(10, -3, Some(10)));
        assert!(exceeds_max(i64::MAX, 1, Some(i64::MAX)));
    }

    #[test]
    fn test_args_encode_missing_max_as_empty() {
        assert_eq!(increment_args(3, None), vec!["3".to_string(), String::new()]);
        assert_eq!(
            increment_args(-2, Some(100)),
            vec!["-2".to_string(), "100".to_string()]
        );
    }

    #[test]
    fn test_decode() {
        let reply = Reply::Array(vec![Reply::Integer(42), Reply::Integer(1)]);
        assert_eq!(
            CounterOutcome::from_reply(reply).unwrap(),
            CounterOutcome {
                value: 42,
                accepted: true
            }
        );

        let reply = Reply::Array(vec![Reply::Integer(9), Reply::Integer(0)]);
        assert!(!CounterOutcome::from_reply(reply).unwrap().accepted);
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_string(&CounterOutcome {
            value: 3,
            accepted: false,
        })
        .unwrap();
        assert_eq!(json, r#"{"value":3,"accepted":false}"#);
    }
}
