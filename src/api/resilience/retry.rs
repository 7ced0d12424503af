//! Refresh-and-retry-once policy for authentication failures
//!
//! An operation that fails with HTTP 401 gets exactly one more attempt, and only after the
//! credentials for its subscription were refreshed successfully. Any other failure, or a
//! failure of the second attempt, goes back to the caller as is.

use async_trait::async_trait;
use log::{debug, info, warn};
use std::future::Future;

use crate::api::error::{ErrorClass, ManagementError};

/// Something that can obtain a new token for a subscription after the current one was rejected
#[async_trait]
pub trait CredentialRefresh: Send + Sync {
    /// Returns `true` when a new token was stored and a retry may succeed
    async fn refresh(&self, subscription_id: &str) -> bool;
}

/// How a retried call ended, for diagnostics only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    Succeeded,
    SucceededAfterRefresh,
    /// Non-authentication failure, surfaced without a refresh
    OperationFailed,
    /// Refresh failed, or the retried call failed again
    AuthenticationRetryExhausted,
}

/// Runs `call`, refreshing credentials and repeating it once if it fails with a 401.
///
/// `call` is invoked at most twice. The error returned is always one produced by `call`:
/// the first one if the failure was not an authentication failure or the refresh failed,
/// otherwise the second one.
pub async fn run_with_retry<T, F, Fut>(
    refresher: &dyn CredentialRefresh,
    subscription_id: &str,
    operation: &str,
    call: F,
) -> Result<T, ManagementError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ManagementError>>,
{
    let error = match call().await {
        Ok(value) => {
            log_outcome(operation, subscription_id, RetryOutcome::Succeeded);
            return Ok(value);
        }
        Err(error) => error,
    };

    debug!("{} failed for subscription {}: {}", operation, subscription_id, error);

    if ErrorClass::of(&error) != ErrorClass::Authentication {
        log_outcome(operation, subscription_id, RetryOutcome::OperationFailed);
        return Err(error);
    }

    warn!(
        "{} was rejected as unauthorized for subscription {}, refreshing credentials",
        operation, subscription_id
    );

    if !refresher.refresh(subscription_id).await {
        log_outcome(operation, subscription_id, RetryOutcome::AuthenticationRetryExhausted);
        return Err(error);
    }

    match call().await {
        Ok(value) => {
            log_outcome(operation, subscription_id, RetryOutcome::SucceededAfterRefresh);
            Ok(value)
        }
        Err(retry_error) => {
            debug!("{} retry failed for subscription {}: {}", operation, subscription_id, retry_error);
            log_outcome(operation, subscription_id, RetryOutcome::AuthenticationRetryExhausted);
            Err(retry_error)
        }
    }
}

fn log_outcome(operation: &str, subscription_id: &str, outcome: RetryOutcome) {
    match outcome {
        RetryOutcome::Succeeded => {}
        RetryOutcome::SucceededAfterRefresh => {
            info!("{} succeeded after credential refresh for subscription {}", operation, subscription_id)
        }
        RetryOutcome::OperationFailed => {
            debug!("{} failed without retry for subscription {}", operation, subscription_id)
        }
        RetryOutcome::AuthenticationRetryExhausted => {
            warn!("{} still unauthorized for subscription {}, giving up", operation, subscription_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FixedRefresh {
        result: bool,
        calls: AtomicU32,
    }

    impl FixedRefresh {
        fn new(result: bool) -> Self {
            Self { result, calls: AtomicU32::new(0) }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CredentialRefresh for FixedRefresh {
        async fn refresh(&self, _subscription_id: &str) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result
        }
    }

    /// Builds a call that fails with the given statuses in order, then succeeds with the attempt number
    fn scripted(failures: Vec<u16>, attempts: &AtomicU32) -> impl Fn() -> std::future::Ready<Result<u32, ManagementError>> + '_ {
        move || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            std::future::ready(match failures.get(attempt as usize) {
                Some(status) => Err(ManagementError::service(*status, format!("attempt {}", attempt))),
                None => Ok(attempt),
            })
        }
    }

    #[tokio::test]
    async fn test_success_does_not_refresh() {
        let refresher = FixedRefresh::new(true);
        let attempts = AtomicU32::new(0);

        let result = run_with_retry(&refresher, "sub1", "op", scripted(vec![], &attempts)).await;

        assert_eq!(result.unwrap(), 0);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(refresher.calls(), 0);
    }

    #[tokio::test]
    async fn test_non_auth_failure_is_returned_untouched() {
        let refresher = FixedRefresh::new(true);
        let attempts = AtomicU32::new(0);

        let error = run_with_retry(&refresher, "sub1", "op", scripted(vec![403], &attempts))
            .await
            .unwrap_err();

        assert_eq!(error.status(), Some(403));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(refresher.calls(), 0);
    }

    #[tokio::test]
    async fn test_unauthorized_then_success_after_refresh() {
        let refresher = FixedRefresh::new(true);
        let attempts = AtomicU32::new(0);

        let result = run_with_retry(&refresher, "sub1", "op", scripted(vec![401], &attempts)).await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(refresher.calls(), 1);
    }

    #[tokio::test]
    async fn test_second_unauthorized_is_not_retried() {
        let refresher = FixedRefresh::new(true);
        let attempts = AtomicU32::new(0);

        let error = run_with_retry(&refresher, "sub1", "op", scripted(vec![401, 401, 401], &attempts))
            .await
            .unwrap_err();

        assert_eq!(error.to_string(), "service returned HTTP 401: attempt 1");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(refresher.calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_surfaces_original_error() {
        let refresher = FixedRefresh::new(false);
        let attempts = AtomicU32::new(0);

        let error = run_with_retry(&refresher, "sub1", "op", scripted(vec![401], &attempts))
            .await
            .unwrap_err();

        assert_eq!(error.to_string(), "service returned HTTP 401: attempt 0");
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(refresher.calls(), 1);
    }

    #[tokio::test]
    async fn test_retry_surfaces_second_failure_of_any_kind() {
        let refresher = FixedRefresh::new(true);
        let attempts = AtomicU32::new(0);

        let error = run_with_retry(&refresher, "sub1", "op", scripted(vec![401, 500], &attempts))
            .await
            .unwrap_err();

        assert_eq!(error.status(), Some(500));
        assert_eq!(refresher.calls(), 1);
    }
}
