#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! County source adapters.
//!
//! Each county implements [`SourceAdapter`] through one of four transports
//! (plain listing GET, ASP.NET form POST, session-gated GET, JSON API).
//! Adapters only fetch and cut pages into [`RawBlock`]s; turning a block into
//! an arrest record is the normalizer's job.
//!
//! [`RawBlock`]: arrest_leads_source_models::RawBlock

pub mod form_post;
pub mod http;
pub mod json_api;
pub mod listing;
pub mod progress;
pub mod rate_limit;
pub mod registry;
pub mod retry;
pub mod session_gated;

#[cfg(test)]
mod test_support;

use std::ops::RangeInclusive;
use std::sync::Arc;

use arrest_leads_arrest_models::County;
use arrest_leads_source_models::{FetchOutcome, FetchWindow, SourceAdapterConfig, TransportConfig};
use async_trait::async_trait;

use crate::http::HttpContext;
use crate::progress::ProgressCallback;
use crate::rate_limit::HostRateLimiter;

/// Errors that can occur while fetching from a county source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed at the transport level.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Requested URL.
        url: String,
        /// Response status code.
        status: u16,
    },

    /// The requested record does not exist. Expected when probing ranges.
    #[error("not found: {url}")]
    NotFound {
        /// Requested URL.
        url: String,
    },

    /// A form page lacked a hidden field required for the postback.
    #[error("required hidden field '{field}' missing from form page")]
    MissingHiddenField {
        /// Field name or id.
        field: String,
    },

    /// No candidate JSON endpoint returned a usable list.
    #[error("no JSON endpoint answered (tried {tried})")]
    NoEndpoint {
        /// Number of candidate endpoints tried.
        tried: usize,
    },

    /// A configured regex failed to compile.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// The adapter does not support the requested operation.
    #[error("{county} source does not support {operation}")]
    Unsupported {
        /// County whose adapter was asked.
        county: County,
        /// Operation name.
        operation: &'static str,
    },

    /// Invalid configuration.
    #[error("configuration error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },
}

impl SourceError {
    /// Whether this is the expected "record does not exist" result.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// A county's booking source.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// County this adapter fetches.
    fn county(&self) -> County;

    /// Human-readable source name.
    fn name(&self) -> &str;

    /// Fetches raw per-booking blocks for bookings in `window`.
    ///
    /// An anti-bot refusal is not an error: it returns an empty
    /// [`FetchOutcome`] with `blocked` set.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the source is unreachable after all
    /// retries or the page is missing structure the protocol requires.
    async fn fetch_recent_records(&self, window: &FetchWindow) -> Result<FetchOutcome, SourceError>;

    /// Enumerates a booking-number range, skipping numbers that do not
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Unsupported`] unless the transport can look up
    /// bookings by number.
    async fn probe_bookings(
        &self,
        range: RangeInclusive<u64>,
        progress: Arc<dyn ProgressCallback>,
    ) -> Result<FetchOutcome, SourceError> {
        let _ = (range, progress);
        Err(SourceError::Unsupported {
            county: self.county(),
            operation: "booking range probes",
        })
    }
}

/// Builds the adapter for `config`'s transport.
///
/// # Errors
///
/// Returns [`SourceError`] if the HTTP client cannot be built or a
/// configured pattern is invalid.
pub fn build_adapter(
    config: &SourceAdapterConfig,
    limiter: Arc<HostRateLimiter>,
) -> Result<Box<dyn SourceAdapter>, SourceError> {
    let ctx = HttpContext::new(config, limiter)?;

    Ok(match &config.transport {
        TransportConfig::Listing(transport) => Box::new(listing::ListingAdapter::new(
            config,
            transport.clone(),
            ctx,
        )?),
        TransportConfig::FormPost(transport) => Box::new(form_post::FormPostAdapter::new(
            config,
            transport.clone(),
            ctx,
        )?),
        TransportConfig::SessionGated(transport) => Box::new(
            session_gated::SessionGatedAdapter::new(config, transport.clone(), ctx),
        ),
        TransportConfig::JsonApi(transport) => Box::new(json_api::JsonApiAdapter::new(
            config,
            transport.clone(),
            ctx,
        )?),
    })
}
