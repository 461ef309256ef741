//! Shared HTTP plumbing for adapters: client, per-attempt rate limit and
//! retry policy.

use std::sync::Arc;
use std::time::Duration;

use arrest_leads_source_models::SourceAdapterConfig;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, COOKIE, HeaderMap, HeaderValue, USER_AGENT};

use crate::SourceError;
use crate::rate_limit::HostRateLimiter;
use crate::retry::{self, FetchedPage, Pacing, RetryPolicy};

/// Browser-like user agent; several sheriff sites reject library defaults.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Everything an adapter needs to make a polite, bounded request.
#[derive(Debug, Clone)]
pub struct HttpContext {
    client: reqwest::Client,
    limiter: Arc<HostRateLimiter>,
    min_interval: Duration,
    policy: RetryPolicy,
}

impl HttpContext {
    /// Builds a client with the county's timeout, user agent, and a cookie
    /// jar (form postbacks need the session cookie from the initial GET).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the user agent is not a valid header value
    /// or the client cannot be built.
    pub fn new(
        config: &SourceAdapterConfig,
        limiter: Arc<HostRateLimiter>,
    ) -> Result<Self, SourceError> {
        let user_agent = config.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent).map_err(|e| SourceError::Config {
                message: format!("invalid user agent '{user_agent}': {e}"),
            })?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            limiter,
            min_interval: Duration::from_millis(config.rate_limit_ms),
            policy: RetryPolicy::from_config(&config.retry),
        })
    }

    /// A copy whose per-host spacing is at least `interval`.
    #[must_use]
    pub fn with_min_interval(&self, interval: Duration) -> Self {
        Self {
            min_interval: self.min_interval.max(interval),
            ..self.clone()
        }
    }

    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn pacing<'a>(&'a self, url: &'a str) -> Pacing<'a> {
        Pacing {
            limiter: &self.limiter,
            url,
            min_interval: self.min_interval,
        }
    }

    /// GET returning the body of a successful response.
    ///
    /// # Errors
    ///
    /// See [`retry::send_text`].
    pub async fn get_text(&self, url: &str) -> Result<String, SourceError> {
        retry::send_text(|| self.client.get(url), &self.policy, Some(self.pacing(url))).await
    }

    /// GET parsed as JSON.
    ///
    /// # Errors
    ///
    /// See [`retry::send_json`].
    pub async fn get_json(&self, url: &str) -> Result<serde_json::Value, SourceError> {
        retry::send_json(|| self.client.get(url), &self.policy, Some(self.pacing(url))).await
    }

    /// GET returning status and body regardless of status, optionally
    /// with a `Cookie` header.
    ///
    /// # Errors
    ///
    /// See [`retry::send_page`].
    pub async fn get_page(&self, url: &str, cookie: Option<&str>) -> Result<FetchedPage, SourceError> {
        retry::send_page(
            || {
                let request = self.client.get(url);
                match cookie {
                    Some(cookie) => request.header(COOKIE, cookie),
                    None => request,
                }
            },
            &self.policy,
            Some(self.pacing(url)),
        )
        .await
    }

    /// URL-encoded form POST returning the body of a successful response.
    ///
    /// # Errors
    ///
    /// See [`retry::send_text`].
    pub async fn post_form(
        &self,
        url: &str,
        form: &[(String, String)],
    ) -> Result<String, SourceError> {
        retry::send_text(
            || self.client.post(url).form(form),
            &self.policy,
            Some(self.pacing(url)),
        )
        .await
    }
}
