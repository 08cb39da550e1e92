use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};

use crate::error::LLMError;

/// Extracts the `Retry-After` header (in seconds) if present.
///
/// Providers occasionally instruct clients to wait before re-sending requests. When the
/// header is numeric this helper parses it into a [`Duration`]. HTTP-date values are
/// currently ignored because vendors primarily use the numeric form.
pub(crate) fn retry_after_from_headers(headers: &HashMap<String, String>) -> Option<Duration> {
    headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("retry-after"))
        .and_then(|(_, value)| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Backoff policy suited to the rate limits of hosted LLM APIs.
///
/// Starts at one second, grows by 1.5x up to a minute per wait and gives up after
/// five minutes in total.
pub fn default_backoff() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_millis(1000))
        .with_max_interval(Duration::from_secs(60))
        .with_multiplier(1.5)
        .with_max_elapsed_time(Some(Duration::from_secs(300)))
        .build()
}

/// Repeats `operation` while it fails with a retryable error.
///
/// Adapters never retry on their own; wrap
/// [`LLMProvider::chat`](crate::provider::LLMProvider::chat) or a credential
/// probe with this when a retry policy is wanted. Errors for which [`LLMError::is_retryable`] is false are
/// returned immediately, and a provider's `Retry-After` hint replaces the
/// computed delay.
///
/// # Examples
///
/// ```
/// # use std::sync::atomic::{AtomicUsize, Ordering};
/// # use std::time::Duration;
/// # use backoff::ExponentialBackoffBuilder;
/// # use kotoba_gateway::error::LLMError;
/// # use kotoba_gateway::provider::retry::retry_with_backoff;
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let attempts = AtomicUsize::new(0);
/// let policy = ExponentialBackoffBuilder::new()
///     .with_initial_interval(Duration::from_millis(1))
///     .build();
/// let value = retry_with_backoff(policy, || async {
///     if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
///         Err(LLMError::transport("connection reset"))
///     } else {
///         Ok(42)
///     }
/// })
/// .await
/// .unwrap();
/// assert_eq!(value, 42);
/// # });
/// ```
pub async fn retry_with_backoff<T, F, Fut>(
    policy: ExponentialBackoff,
    mut operation: F,
) -> Result<T, LLMError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LLMError>>,
{
    backoff::future::retry(policy, || {
        let attempt = operation();
        async move {
            attempt.await.map_err(|err| {
                if !err.is_retryable() {
                    return backoff::Error::permanent(err);
                }
                tracing::debug!(error = %err, "retrying after transient failure");
                match err.retry_after() {
                    Some(wait) => backoff::Error::retry_after(err, wait),
                    None => backoff::Error::transient(err),
                }
            })
        }
    })
    .await
}
