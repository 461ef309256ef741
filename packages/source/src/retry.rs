//! HTTP retry helpers for transient errors.
//!
//! Adapters never call `reqwest::RequestBuilder::send()` directly. They go
//! through [`send_text`], [`send_json`], or [`send_page`] so that every
//! request gets bounded retry with capped exponential backoff. A
//! [`Pacing`] makes every attempt, not just the first, wait for the
//! host's rate-limit slot.
//!
//! Transient failures (timeouts, connection resets, HTTP 429, HTTP 5xx) are
//! retried. HTTP 404 is a permanent, expected negative result: it surfaces
//! as [`SourceError::NotFound`] immediately and is not logged as a failure.
//! Other 4xx responses are permanent errors.
//!
//! ```ignore
//! let html = retry::send_text(|| client.get(&url), &policy, None).await?;
//! let body = retry::send_json(|| client.get(&url), &policy, Some(pacing)).await?;
//! let html = retry::send_text(|| client.post(&url).form(&fields), &policy, None).await?;
//! ```

use std::time::Duration;

use arrest_leads_source_models::RetryConfig;

use crate::SourceError;
use crate::rate_limit::HostRateLimiter;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 300;

/// Attempt cap and backoff curve for one county.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; at least 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// A policy that never retries.
    #[must_use]
    pub const fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (1-based): `base * 2^(retry-1)`,
    /// capped at `max_delay`.
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32
            .checked_shl(retry.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

/// A response whose status the caller interprets itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
}

impl FetchedPage {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Per-host spacing applied before every attempt, retries included.
#[derive(Debug, Clone, Copy)]
pub struct Pacing<'a> {
    pub limiter: &'a HostRateLimiter,
    pub url: &'a str,
    pub min_interval: Duration,
}

async fn pace(pacing: Option<Pacing<'_>>) {
    if let Some(pacing) = pacing {
        pacing.limiter.wait(pacing.url, pacing.min_interval).await;
    }
}

/// Sends a request and returns the body of a successful response.
///
/// The `build_request` closure is called on each attempt since builders
/// are consumed by `.send()`.
///
/// # Errors
///
/// Returns [`SourceError::NotFound`] on HTTP 404, [`SourceError::Status`]
/// for other permanent statuses or when retries are exhausted on 429/5xx,
/// and [`SourceError::Http`] when the transport keeps failing.
#[allow(clippy::future_not_send)]
pub async fn send_text<F>(
    build_request: F,
    policy: &RetryPolicy,
    pacing: Option<Pacing<'_>>,
) -> Result<String, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut body_attempt = 1;
    loop {
        let response = send_inner(&build_request, policy, pacing).await?;
        let url = response.url().to_string();

        match response.text().await {
            Ok(text) => return Ok(text),
            Err(e) if body_attempt < policy.max_attempts => {
                let delay = policy.delay_for(body_attempt);
                log::warn!(
                    "body read failed for {url} (retry {body_attempt}/{}), re-fetching in {delay:?}: {e}",
                    policy.max_attempts - 1,
                );
                tokio::time::sleep(delay).await;
                body_attempt += 1;
            }
            Err(e) => {
                log::error!("body read failed for {url} after {body_attempt} attempts: {e}");
                return Err(SourceError::Http(e));
            }
        }
    }
}

/// Sends a request and parses a successful response body as JSON.
///
/// A body that cannot be read or does not parse (truncated or garbled)
/// triggers a full re-fetch, bounded by the same attempt cap.
///
/// # Errors
///
/// As [`send_text`], plus [`SourceError::Json`] when the body still does
/// not parse after the last attempt.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(
    build_request: F,
    policy: &RetryPolicy,
    pacing: Option<Pacing<'_>>,
) -> Result<serde_json::Value, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut body_attempt = 1;
    loop {
        let response = send_inner(&build_request, policy, pacing).await?;
        let url = response.url().to_string();
        let last = body_attempt >= policy.max_attempts;

        let failure = match response.text().await {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(value) => return Ok(value),
                Err(e) if last => {
                    log::error!(
                        "JSON parse failed for {url} after {body_attempt} attempts: {e}\n  body preview: {}",
                        preview(&text)
                    );
                    return Err(SourceError::Json(e));
                }
                Err(e) => format!("JSON parse failed: {e}\n  body preview: {}", preview(&text)),
            },
            Err(e) if last => {
                log::error!("body read failed for {url} after {body_attempt} attempts: {e}");
                return Err(SourceError::Http(e));
            }
            Err(e) => format!("body read failed: {e}"),
        };

        let delay = policy.delay_for(body_attempt);
        log::warn!(
            "{url} (retry {body_attempt}/{}), re-fetching in {delay:?}: {failure}",
            policy.max_attempts - 1,
        );
        tokio::time::sleep(delay).await;
        body_attempt += 1;
    }
}

/// Sends a request and returns the status and body whatever the status.
///
/// Transport errors, HTTP 429 and 5xx are retried with backoff; the last
/// response is returned as-is for the caller to interpret.
///
/// # Errors
///
/// Returns [`SourceError::Http`] when the transport keeps failing.
#[allow(clippy::future_not_send)]
pub async fn send_page<F>(
    build_request: F,
    policy: &RetryPolicy,
    pacing: Option<Pacing<'_>>,
) -> Result<FetchedPage, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 1;
    loop {
        pace(pacing).await;
        match build_request().send().await {
            Ok(response) if is_retryable(response.status()) && attempt < policy.max_attempts => {
                log::warn!("  HTTP {} from {}", response.status(), response.url());
            }
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.text().await?;
                return Ok(FetchedPage { status, body });
            }
            Err(e) if is_transient(&e) && attempt < policy.max_attempts => {
                log::warn!("  transient error: {e}");
            }
            Err(e) => return Err(SourceError::Http(e)),
        }

        let delay = policy.delay_for(attempt);
        log::warn!("  retry {attempt}/{} in {delay:?}...", policy.max_attempts - 1);
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

/// Core retry loop shared by [`send_text`] and [`send_json`].
///
/// Returns the response once its status is 2xx or 3xx.
#[allow(clippy::future_not_send)]
async fn send_inner<F>(
    build_request: &F,
    policy: &RetryPolicy,
    pacing: Option<Pacing<'_>>,
) -> Result<reqwest::Response, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 1;
    loop {
        pace(pacing).await;
        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && attempt < policy.max_attempts {
                    log::warn!("  transient error: {e}");
                } else {
                    return Err(SourceError::Http(e));
                }
            }
            Ok(response) => {
                let status = response.status();
                let url = response.url().to_string();

                if status == reqwest::StatusCode::NOT_FOUND {
                    log::trace!("  HTTP 404 for {url}");
                    return Err(SourceError::NotFound { url });
                }

                let retryable = is_retryable(status);

                if retryable && attempt < policy.max_attempts {
                    log::warn!("  HTTP {status} from {url}");
                } else if retryable || status.is_client_error() {
                    return Err(SourceError::Status {
                        url,
                        status: status.as_u16(),
                    });
                } else {
                    return Ok(response);
                }
            }
        }

        let delay = policy.delay_for(attempt);
        log::warn!("  retry {attempt}/{} in {delay:?}...", policy.max_attempts - 1);
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

/// Whether a status is worth another attempt: 429 or any 5xx.
fn is_retryable(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_decode() || e.is_request()
}

fn preview(text: &str) -> &str {
    if text.len() <= BODY_PREVIEW_LEN {
        return text;
    }
    let mut end = BODY_PREVIEW_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CannedServer, response};

    fn quick(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    #[test]
    fn backoff_doubles_then_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_millis(3_000),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(1_000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2_000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(3_000));
        assert_eq!(policy.delay_for(40), Duration::from_millis(3_000));
    }

    #[test]
    fn policy_from_config_keeps_at_least_one_attempt() {
        let policy = RetryPolicy::from_config(&RetryConfig {
            max_attempts: 0,
            base_delay_ms: 10,
            max_delay_ms: 20,
        });
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(RetryPolicy::default().max_attempts, 3);
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let text = "é".repeat(BODY_PREVIEW_LEN);
        let cut = preview(&text);
        assert!(cut.len() <= BODY_PREVIEW_LEN);
        assert!(text.starts_with(cut));
    }

    #[test]
    fn page_success_range() {
        let ok = FetchedPage {
            status: 200,
            body: String::new(),
        };
        let blocked = FetchedPage {
            status: 403,
            body: String::new(),
        };
        assert!(ok.is_success());
        assert!(!blocked.is_success());
    }

    #[test]
    fn rate_limits_and_server_errors_are_retryable() {
        assert!(is_retryable(reqwest::StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(reqwest::StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_retryable(reqwest::StatusCode::FORBIDDEN));
        assert!(!is_retryable(reqwest::StatusCode::OK));
    }

    #[tokio::test]
    async fn page_retries_server_errors_and_paces_every_attempt() {
        let server = CannedServer::start(vec![
            response(503, "Service Unavailable", ""),
            response(200, "OK", "<table></table>"),
        ])
        .await;
        let limiter = HostRateLimiter::new();
        let pacing = Pacing {
            limiter: &limiter,
            url: &server.url,
            min_interval: Duration::from_millis(50),
        };
        let client = reqwest::Client::new();

        let started = tokio::time::Instant::now();
        let page = send_page(|| client.get(&server.url), &quick(3), Some(pacing))
            .await
            .unwrap();

        assert_eq!(page.status, 200);
        assert_eq!(page.body, "<table></table>");
        assert_eq!(server.hits(), 2);
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn page_returns_last_server_error_when_retries_run_out() {
        let server = CannedServer::start(vec![
            response(503, "Service Unavailable", ""),
            response(502, "Bad Gateway", ""),
        ])
        .await;
        let client = reqwest::Client::new();

        let page = send_page(|| client.get(&server.url), &quick(2), None)
            .await
            .unwrap();
        assert_eq!(page.status, 502);
        assert_eq!(server.hits(), 2);
    }

    #[tokio::test]
    async fn garbled_json_is_refetched_within_one_attempt_cap() {
        let server = CannedServer::start(vec![
            response(200, "OK", "{\"truncated"),
            response(200, "OK", "{\"ok\":true}"),
        ])
        .await;
        let client = reqwest::Client::new();

        let value = send_json(|| client.get(&server.url), &quick(2), None)
            .await
            .unwrap();
        assert_eq!(value["ok"], true);
        assert_eq!(server.hits(), 2);
    }

    #[tokio::test]
    async fn json_parse_failures_stop_at_the_attempt_cap() {
        let server = CannedServer::start(vec![
            response(200, "OK", "nope"),
            response(200, "OK", "nope"),
            response(200, "OK", "nope"),
            response(200, "OK", "nope"),
        ])
        .await;
        let client = reqwest::Client::new();

        let result = send_json(|| client.get(&server.url), &quick(2), None).await;
        assert!(matches!(result, Err(SourceError::Json(_))));
        assert_eq!(server.hits(), 2);
    }
}
