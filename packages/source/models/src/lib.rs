#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! County source configuration and the raw blocks adapters produce.
//!
//! A [`SourceAdapterConfig`] is read-only for the duration of a run. Its
//! [`TransportConfig`] selects how pages are fetched; each transport also
//! names the [`RecordLayout`] the normalizer should apply to the blocks it
//! emits.

use std::collections::BTreeMap;

use arrest_leads_arrest_models::County;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Placeholder substituted with a booking number in URL templates.
pub const BOOKING_PLACEHOLDER: &str = "{booking_number}";

/// Substitutes [`BOOKING_PLACEHOLDER`] in `template`.
#[must_use]
pub fn expand_booking_template(template: &str, booking_number: &str) -> String {
    template.replace(BOOKING_PLACEHOLDER, booking_number)
}

/// The page shape a raw block was cut from.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecordLayout {
    /// Lee County booking JSON (list item, charges array, detail object).
    LeeBooking,
    /// One `<tr>` of a booking search results table.
    BookingRow,
    /// One person section of an ASP.NET arrest report page.
    CollierReport,
    /// One header-keyed row of an inmate roster table.
    InmateTable,
}

/// Raw content of one block.
#[derive(Debug, Clone, PartialEq)]
pub enum RawBody {
    Html(String),
    Json(serde_json::Value),
}

/// One per-record unit of source content, not yet normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBlock {
    pub layout: RecordLayout,
    pub body: RawBody,
    /// Booking number already known from the page structure (e.g. an
    /// anchor), if any.
    pub booking_number: Option<String>,
    /// Public detail page for this booking, if the adapter knows it.
    pub detail_url: Option<String>,
}

impl RawBlock {
    #[must_use]
    pub const fn html(layout: RecordLayout, html: String) -> Self {
        Self {
            layout,
            body: RawBody::Html(html),
            booking_number: None,
            detail_url: None,
        }
    }

    #[must_use]
    pub const fn json(layout: RecordLayout, value: serde_json::Value) -> Self {
        Self {
            layout,
            body: RawBody::Json(value),
            booking_number: None,
            detail_url: None,
        }
    }

    #[must_use]
    pub fn with_booking_number(mut self, booking_number: impl Into<String>) -> Self {
        self.booking_number = Some(booking_number.into());
        self
    }

    #[must_use]
    pub fn with_detail_url(mut self, detail_url: impl Into<String>) -> Self {
        self.detail_url = Some(detail_url.into());
        self
    }
}

/// Inclusive booking-date range a fetch should cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl FetchWindow {
    /// The `lookback_days` days up to and including `today`.
    #[must_use]
    pub fn ending(today: NaiveDate, lookback_days: u32) -> Self {
        let from = today
            .checked_sub_days(Days::new(u64::from(lookback_days)))
            .unwrap_or(NaiveDate::MIN);
        Self { from, to: today }
    }
}

/// What an adapter produced for one window.
///
/// `blocked` distinguishes "the site refused us" from "no new arrests";
/// a blocked outcome always has no blocks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOutcome {
    pub blocks: Vec<RawBlock>,
    pub blocked: bool,
}

impl FetchOutcome {
    #[must_use]
    pub const fn fetched(blocks: Vec<RawBlock>) -> Self {
        Self {
            blocks,
            blocked: false,
        }
    }

    #[must_use]
    pub const fn blocked() -> Self {
        Self {
            blocks: Vec::new(),
            blocked: true,
        }
    }
}

/// Bounded retry settings for one county's HTTP calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 8_000,
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_lookback_days() -> u32 {
    3
}

fn default_home_state() -> String {
    "FL".to_string()
}

const fn default_rate_limit_ms() -> u64 {
    300
}

const fn default_timeout_secs() -> u64 {
    30
}

/// Per-county configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceAdapterConfig {
    pub county: County,
    /// Human-readable source name (e.g. "Lee County Sheriff's Office").
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Days of bookings before today to request.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    /// State assumed for addresses that carry a zip but no state.
    #[serde(default = "default_home_state")]
    pub home_state: String,
    /// Minimum delay between requests to the same host.
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,
    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Disqualifying charge terms added to the scorer's base set.
    #[serde(default)]
    pub extra_disqualifiers: Vec<String>,
    pub transport: TransportConfig,
}

/// How a county's pages are fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportConfig {
    /// One GET, booking numbers found by anchor regex.
    Listing(ListingTransport),
    /// GET, then POST the page's hidden fields back with a date range.
    FormPost(FormPostTransport),
    /// Direct GET with a pre-provisioned session cookie fallback.
    SessionGated(SessionGatedTransport),
    /// Candidate JSON endpoints with per-booking detail enrichment.
    JsonApi(JsonApiTransport),
}

impl TransportConfig {
    /// Short protocol name for listings.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Listing(_) => "listing",
            Self::FormPost(_) => "form_post",
            Self::SessionGated(_) => "session_gated",
            Self::JsonApi(_) => "json_api",
        }
    }
}

fn default_anchor_pattern() -> String {
    r"booking/\?id=(\d+)".to_string()
}

const fn default_booking_row_layout() -> RecordLayout {
    RecordLayout::BookingRow
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingTransport {
    pub url: String,
    /// Regex whose first capture group is a booking number.
    #[serde(default = "default_anchor_pattern")]
    pub anchor_pattern: String,
    #[serde(default)]
    pub detail_url_template: Option<String>,
    #[serde(default = "default_booking_row_layout")]
    pub layout: RecordLayout,
}

fn default_date_format() -> String {
    "%m/%d/%Y".to_string()
}

const fn default_report_layout() -> RecordLayout {
    RecordLayout::CollierReport
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormPostTransport {
    pub url: String,
    /// Hidden inputs that must be present on the GET page.
    pub hidden_fields: Vec<String>,
    /// Hidden inputs echoed back when present.
    #[serde(default)]
    pub optional_hidden_fields: Vec<String>,
    pub date_from_field: String,
    pub date_to_field: String,
    /// `chrono` format for the date-range fields.
    #[serde(default = "default_date_format")]
    pub date_format: String,
    /// Constant form fields such as the submit button.
    #[serde(default)]
    pub extra_fields: BTreeMap<String, String>,
    /// Regex marking the start of each per-person block in the result page.
    pub block_delimiter: String,
    #[serde(default = "default_report_layout")]
    pub layout: RecordLayout,
}

fn default_challenge_markers() -> Vec<String> {
    vec![
        "Just a moment".to_string(),
        "cf-browser-verification".to_string(),
    ]
}

fn default_table_selector() -> String {
    "table".to_string()
}

const fn default_inmate_layout() -> RecordLayout {
    RecordLayout::InmateTable
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionGatedTransport {
    pub url: String,
    /// Substrings that identify an anti-bot interstitial.
    #[serde(default = "default_challenge_markers")]
    pub challenge_markers: Vec<String>,
    /// Environment variable holding a pre-provisioned `Cookie` header.
    #[serde(default)]
    pub session_env: Option<String>,
    /// CSS selector for the roster table.
    #[serde(default = "default_table_selector")]
    pub table_selector: String,
    #[serde(default)]
    pub detail_url_template: Option<String>,
    #[serde(default = "default_inmate_layout")]
    pub layout: RecordLayout,
}

const fn default_max_enrich() -> usize {
    120
}

const fn default_detail_delay_ms() -> u64 {
    300
}

const fn default_detail_concurrency() -> usize {
    2
}

fn default_list_keys() -> Vec<String> {
    ["data", "bookings", "results", "items"]
        .into_iter()
        .map(String::from)
        .collect()
}

const fn default_lee_layout() -> RecordLayout {
    RecordLayout::LeeBooking
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonApiTransport {
    pub base_url: String,
    /// Candidate list endpoints, tried in order.
    pub list_paths: Vec<String>,
    /// Object keys that may wrap the list array.
    #[serde(default = "default_list_keys")]
    pub list_keys: Vec<String>,
    /// Per-booking charges endpoint; also used for range probing.
    #[serde(default)]
    pub charges_path: Option<String>,
    /// Per-booking person detail endpoint.
    #[serde(default)]
    pub detail_path: Option<String>,
    #[serde(default)]
    pub detail_url_template: Option<String>,
    /// Maximum list items enriched per run.
    #[serde(default = "default_max_enrich")]
    pub max_enrich: usize,
    /// Minimum delay between enrichment calls.
    #[serde(default = "default_detail_delay_ms")]
    pub detail_delay_ms: u64,
    #[serde(default = "default_detail_concurrency")]
    pub detail_concurrency: usize,
    /// HTML listing used when no candidate endpoint answers.
    #[serde(default)]
    pub fallback: Option<ListingTransport>,
    #[serde(default = "default_lee_layout")]
    pub layout: RecordLayout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_covers_lookback_days() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 3).unwrap();
        let window = FetchWindow::ending(today, 3);
        assert_eq!(window.from, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(window.to, today);
    }

    #[test]
    fn expands_booking_template() {
        assert_eq!(
            expand_booking_template("https://x/booking/?id={booking_number}", "991"),
            "https://x/booking/?id=991"
        );
    }

    #[test]
    fn deserializes_tagged_transport_with_defaults() {
        let config: SourceAdapterConfig = toml::from_str(
            r#"
            county = "lee"
            name = "Lee"

            [transport]
            type = "listing"
            url = "https://example.test/search"
            "#,
        )
        .unwrap();

        assert!(config.enabled);
        assert_eq!(config.lookback_days, 3);
        assert_eq!(config.home_state, "FL");
        assert_eq!(config.retry, RetryConfig::default());
        match config.transport {
            TransportConfig::Listing(listing) => {
                assert_eq!(listing.anchor_pattern, r"booking/\?id=(\d+)");
                assert_eq!(listing.layout, RecordLayout::BookingRow);
            }
            other => panic!("unexpected transport: {}", other.kind()),
        }
    }

    #[test]
    fn blocked_outcome_has_no_blocks() {
        let outcome = FetchOutcome::blocked();
        assert!(outcome.blocked);
        assert!(outcome.blocks.is_empty());
    }
}
