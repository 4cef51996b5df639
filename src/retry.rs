use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::youtube::UpstreamError;

/// Retry behaviour for transient upstream failures. Rejections and fatal
/// responses are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub backoff: Duration,
    /// `None` keeps retrying until the call stops failing transiently.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(5),
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    pub fn immediate(max_attempts: Option<u32>) -> Self {
        Self {
            backoff: Duration::ZERO,
            max_attempts,
        }
    }

    fn exhausted(&self, attempt: u32) -> bool {
        matches!(self.max_attempts, Some(max) if attempt >= max)
    }
}

pub async fn retry_transient<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, UpstreamError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, UpstreamError>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match op().await {
            Err(UpstreamError::Transient(msg)) => {
                if policy.exhausted(attempt) {
                    warn!(label, attempt, error = %msg, "giving up after transient failures");
                    return Err(UpstreamError::Transient(msg));
                }
                warn!(
                    label,
                    attempt,
                    backoff_secs = policy.backoff.as_secs_f64(),
                    error = %msg,
                    "transient failure; sleeping before retry"
                );
                if !policy.backoff.is_zero() {
                    tokio::time::sleep(policy.backoff).await;
                }
            }
            other => return other,
        }
    }
}
