use reqwest::{RequestBuilder, Response, StatusCode, header::RETRY_AFTER};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::MarketDataError;

/// Retry schedule for upstream GET requests.
/// Only 429, 5xx and transport failures are retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Upper bound on any single wait, including upstream `Retry-After`.
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub const NONE: RetryPolicy = RetryPolicy {
        max_retries: 0,
        base_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
    };

    /// Wait before the next attempt: the larger of the backoff and
    /// `Retry-After`, never above `max_delay`.
    fn wait_for(&self, backoff: Duration, retry_after: Option<Duration>) -> Duration {
        retry_after
            .map_or(backoff, |after| after.max(backoff))
            .min(self.max_delay)
    }

    fn next_backoff(&self, backoff: Duration) -> Duration {
        backoff.saturating_mul(2).min(self.max_delay)
    }
}

/// Send `request` and decode a JSON body, retrying transient failures with
/// exponential backoff. A larger `Retry-After` from the upstream wins over the
/// computed delay, up to the policy's `max_delay`.
pub async fn send_json<T: DeserializeOwned>(
    service: &'static str,
    request: RequestBuilder,
    retry: &RetryPolicy,
) -> Result<T, MarketDataError> {
    let mut delay = retry.base_delay;
    let mut attempt = 0;

    loop {
        // Requests with streaming bodies cannot be cloned; those get one attempt.
        let Some(current) = request.try_clone() else {
            return finish(service, request.send().await).await;
        };
        let outcome = current.send().await;

        if attempt >= retry.max_retries {
            return finish(service, outcome).await;
        }

        let retry_after = match outcome {
            Ok(response) if response.status().is_success() => {
                return decode(service, response).await;
            }
            Ok(response) if !is_retryable(response.status()) => {
                return Err(status_error(service, response).await);
            }
            Ok(response) => retry_after_delay(&response),
            Err(source) => {
                tracing::debug!("{} transport error: {}", service, source);
                None
            }
        };

        // Retry-After is capped so an upstream cannot park the request
        let wait = retry.wait_for(delay, retry_after);
        tracing::warn!(
            "{} retry {}/{}. Waiting {:?}",
            service,
            attempt + 1,
            retry.max_retries,
            wait
        );

        tokio::time::sleep(wait).await;
        delay = retry.next_backoff(delay);
        attempt += 1;
    }
}

async fn finish<T: DeserializeOwned>(
    service: &'static str,
    outcome: Result<Response, reqwest::Error>,
) -> Result<T, MarketDataError> {
    match outcome {
        Ok(response) if response.status().is_success() => decode(service, response).await,
        Ok(response) => Err(status_error(service, response).await),
        Err(source) => Err(MarketDataError::Request { service, source }),
    }
}

async fn status_error(service: &'static str, response: Response) -> MarketDataError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    MarketDataError::Status {
        service,
        status,
        body,
    }
}

async fn decode<T: DeserializeOwned>(
    service: &'static str,
    response: Response,
) -> Result<T, MarketDataError> {
    let text = response
        .text()
        .await
        .map_err(|source| MarketDataError::Request { service, source })?;

    serde_json::from_str(&text).map_err(|e| MarketDataError::Malformed {
        service,
        reason: e.to_string(),
    })
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Only the delta-seconds form of `Retry-After` is honoured.
fn retry_after_delay(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_retry_after)
}

fn parse_retry_after(raw: &str) -> Option<Duration> {
    raw.trim().parse::<u64>().ok().map(Duration::from_secs)
}
