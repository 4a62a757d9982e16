//! Retry with exponential backoff for ledger calls.
//!
//! Transport failures, `429 Too Many Requests` and `5xx` responses are
//! retried. Any other response, including `4xx`, is handed back to the
//! caller on first sight.

use std::time::Duration;

use reqwest::StatusCode;

/// Maximum number of retry attempts after the initial request.
pub(crate) const MAX_RETRIES: u32 = 3;

/// Base delay between retries (doubles each attempt: 200ms, 400ms, 800ms).
const BASE_DELAY_MS: u64 = 200;

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Send an HTTP request, retrying transient failures.
///
/// The closure `f` is called up to `MAX_RETRIES + 1` times. The last
/// attempt's outcome is returned as-is, retryable status or not.
pub(crate) async fn retry_send<F, Fut>(f: F) -> Result<reqwest::Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    for attempt in 0..MAX_RETRIES {
        let delay = Duration::from_millis(BASE_DELAY_MS * 2u64.pow(attempt));
        match f().await {
            Ok(resp) if !is_retryable(resp.status()) => return Ok(resp),
            Ok(resp) => {
                tracing::warn!(
                    attempt = attempt + 1,
                    max_retries = MAX_RETRIES,
                    status = resp.status().as_u16(),
                    "notary request rejected, retrying in {delay:?}"
                );
            }
            Err(e) => {
                tracing::warn!(
                    attempt = attempt + 1,
                    max_retries = MAX_RETRIES,
                    "notary request failed, retrying in {delay:?}: {e}"
                );
            }
        }
        tokio::time::sleep(delay).await;
    }
    f().await
}
