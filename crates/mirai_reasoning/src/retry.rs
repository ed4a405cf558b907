//! Backoff for reply-backend HTTP calls.
//!
//! Transient failures (408, 429, 5xx gateway errors, network errors) are
//! retried; anything else is returned on the first attempt. A `Retry-After`
//! header in seconds stretches the wait, bounded by `max_delay`.

use mirai_core::GenerationError;
use reqwest::{Response, StatusCode};
use std::time::Duration;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Initial delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for each subsequent delay.
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }
}

/// Determine if a status code is retryable.
fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS         // 429
        || status == StatusCode::INTERNAL_SERVER_ERROR // 500
        || status == StatusCode::BAD_GATEWAY           // 502
        || status == StatusCode::SERVICE_UNAVAILABLE   // 503
        || status == StatusCode::GATEWAY_TIMEOUT       // 504
        || status == StatusCode::REQUEST_TIMEOUT // 408
}

/// Execute an async HTTP operation with retry logic.
///
/// The `operation` closure is called repeatedly until it succeeds, returns a
/// non-retryable error, or `max_attempts` is exhausted.
pub async fn with_retry<F, Fut>(
    config: &RetryConfig,
    provider: &'static str,
    operation: F,
) -> Result<Response, GenerationError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<Response, reqwest::Error>>,
{
    let mut delay = config.initial_delay;
    let mut server_hint: Option<Duration> = None;
    let mut last_error = GenerationError::Transport(format!("{}: no attempt made", provider));

    for attempt in 1..=config.max_attempts {
        match operation().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    if attempt > 1 {
                        tracing::info!("{} succeeded on attempt {}", provider, attempt);
                    }
                    return Ok(response);
                }

                server_hint = retry_after(&response);
                let body = response.text().await.unwrap_or_default();
                let error = GenerationError::Api {
                    provider,
                    status: status.as_u16(),
                    body: body.chars().take(500).collect(),
                };

                if !is_retryable_status(status) {
                    return Err(error);
                }

                tracing::warn!(
                    "{} returned {} on attempt {}/{}: {}",
                    provider,
                    status,
                    attempt,
                    config.max_attempts,
                    body.chars().take(200).collect::<String>()
                );
                last_error = error;
            }
            Err(e) => {
                server_hint = None;
                tracing::warn!(
                    "{} network error on attempt {}/{}: {}",
                    provider,
                    attempt,
                    config.max_attempts,
                    e
                );
                last_error = GenerationError::Transport(format!("{}: {}", provider, e));
            }
        }

        if attempt < config.max_attempts {
            let base = match server_hint {
                Some(hint) => hint.max(delay).min(config.max_delay),
                None => delay,
            };
            let sleep_time = base + Duration::from_millis(jitter_ms(base));

            tracing::info!(
                "{} retrying in {:.1}s (attempt {}/{})",
                provider,
                sleep_time.as_secs_f64(),
                attempt + 1,
                config.max_attempts
            );

            tokio::time::sleep(sleep_time).await;

            delay = Duration::from_secs_f64(
                (delay.as_secs_f64() * config.backoff_factor).min(config.max_delay.as_secs_f64()),
            );
        }
    }

    Err(last_error)
}

/// `Retry-After` given in whole seconds. HTTP dates are ignored.
fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Up to half the delay (capped at 500ms), using the clock as a poor-man's random.
fn jitter_ms(delay: Duration) -> u64 {
    let cap = (delay.as_millis() as u64 / 2).min(500);
    if cap == 0 {
        return 0;
    }
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    nanos as u64 % cap
}
