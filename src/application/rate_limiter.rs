//! Fixed-window rate limiting against the shared store.
//!
//! See [`crate::domain::rate_window`] for the window model and its
//! boundary-burst property.

use crate::application::error::Result;
use crate::application::runner::Runner;
use crate::domain::procedure::Procedure;
use crate::domain::rate_window::{
    hit_args, identifier_or_default, reset_seconds, window_index, RateLimitDecision, WindowStatus,
};
use crate::domain::validation::{non_empty, positive_u64};

/// Fixed-window rate limiter keyed by (resource, identifier).
#[derive(Debug, Clone)]
pub struct RateLimiter {
    runner: Runner,
    default_window_seconds: u64,
}

impl RateLimiter {
    pub(crate) fn new(runner: Runner, default_window_seconds: u64) -> Self {
        Self {
            runner,
            default_window_seconds,
        }
    }

    /// Window length used by [`allow_default_window`](Self::allow_default_window).
    pub fn default_window_seconds(&self) -> u64 {
        self.default_window_seconds
    }

    /// Record a hit for `identifier` on `resource` if it is under `limit`
    /// for the current window.
    ///
    /// An empty `identifier` is treated as `"default"`. A refused hit does
    /// not count against the window.
    pub async fn allow(
        &self,
        resource: &str,
        identifier: &str,
        limit: u64,
        window_seconds: u64,
    ) -> Result<RateLimitDecision> {
        non_empty("resource", resource)?;
        positive_u64("limit", limit)?;
        positive_u64("window_seconds", window_seconds)?;

        let identifier = identifier_or_default(identifier);
        let index = window_index(self.runner.clock().unix_seconds(), window_seconds);
        let key = self.runner.keys().rate_window(resource, identifier, index);

        let decision = self
            .runner
            .exec(
                Procedure::RateLimitHit,
                vec![key],
                hit_args(limit, window_seconds),
                |reply| RateLimitDecision::from_reply(reply, limit),
            )
            .await?;

        if decision.allowed {
            self.runner.metrics().record_request_allowed();
        } else {
            self.runner.metrics().record_request_limited();
        }
        tracing::debug!(
            resource,
            identifier,
            window = index,
            allowed = decision.allowed,
            count = decision.current_count,
            limit,
            reset_seconds = decision.reset_seconds,
            "rate limit decision"
        );
        Ok(decision)
    }

    /// [`allow`](Self::allow) with the configured default window.
    pub async fn allow_default_window(
        &self,
        resource: &str,
        identifier: &str,
        limit: u64,
    ) -> Result<RateLimitDecision> {
        self.allow(resource, identifier, limit, self.default_window_seconds)
            .await
    }

    /// Inspect the current window without recording a hit.
    ///
    /// Two plain reads; the count and TTL may belong to slightly different
    /// moments. Use for display, never to decide admission.
    pub async fn status(
        &self,
        resource: &str,
        identifier: &str,
        window_seconds: u64,
    ) -> Result<WindowStatus> {
        non_empty("resource", resource)?;
        positive_u64("window_seconds", window_seconds)?;

        let identifier = identifier_or_default(identifier);
        let index = window_index(self.runner.clock().unix_seconds(), window_seconds);
        let key = self.runner.keys().rate_window(resource, identifier, index);

        let count = self.runner.get_integer(&key, Procedure::RateLimitHit).await?;
        let ttl = self.runner.ttl(&key).await?;
        Ok(WindowStatus {
            current_count: u64::try_from(count).unwrap_or(0),
            reset_seconds: reset_seconds(ttl, window_seconds),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::error::CoordinationError;
    use crate::application::ports::StoreError;
    use crate::application::runner::tests::{runner_over, FailingStore};
    use crate::domain::validation::ValidationError;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    fn limiter() -> (RateLimiter, Arc<FailingStore>) {
        let store = Arc::new(FailingStore::new(StoreError::Connection("down".into())));
        (RateLimiter::new(runner_over(store.clone(), 5), 60), store)
    }

    #[tokio::test]
    async fn test_validation() {
        let (limiter, store) = limiter();

        assert_eq!(
            limiter.allow("", "u", 5, 60).await.unwrap_err(),
            CoordinationError::Validation(ValidationError::Empty { field: "resource" })
        );
        assert_eq!(
            limiter.allow("api", "u", 0, 60).await.unwrap_err(),
            CoordinationError::Validation(ValidationError::NotPositive {
                field: "limit",
                value: 0
            })
        );
        assert_eq!(
            limiter.status("api", "u", 0).await.unwrap_err(),
            CoordinationError::Validation(ValidationError::NotPositive {
                field: "window_seconds",
                value: 0
            })
        );
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_store_failure_is_not_an_allow() {
        let (limiter, _store) = limiter();

        let err = limiter.allow("api", "u", 5, 60).await.unwrap_err();
        assert!(matches!(err, CoordinationError::StoreUnavailable(_)));
        assert_eq!(limiter.runner.metrics().requests_allowed(), 0);
    }
}
