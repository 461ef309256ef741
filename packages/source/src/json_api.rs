//! Undocumented JSON API adapter.
//!
//! The list endpoint is not published, so several candidate paths are
//! tried in order until one answers 200 with a JSON array of objects
//! (top-level or under a wrapper key such as `data`). List items are thin;
//! up to `max_enrich` of them are enriched with the per-booking charges and
//! person-detail endpoints, a few at a time, spaced by the per-host delay.
//!
//! Each emitted block is a JSON object:
//!
//! ```json
//! { "booking": { ...list item... }, "charges": [ ... ], "detail": { ... } }
//! ```
//!
//! The charges endpoint answers 404 for booking numbers that do not exist,
//! which makes it usable for enumerating a number range (backfill).

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use arrest_leads_arrest_models::County;
use arrest_leads_source_models::{
    FetchOutcome, FetchWindow, JsonApiTransport, RawBlock, SourceAdapterConfig,
    expand_booking_template,
};
use async_trait::async_trait;
use futures::StreamExt as _;
use serde_json::{Value, json};

use crate::http::HttpContext;
use crate::listing::ListingAdapter;
use crate::progress::ProgressCallback;
use crate::{SourceAdapter, SourceError};

/// Keys a list item may carry its booking number under, in priority order.
const BOOKING_NUMBER_KEYS: &[&str] = &["booking_number", "bookingNumber", "id"];

/// Joins a base URL and a path, passing absolute paths through.
#[must_use]
pub fn join_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// The list of booking objects in a candidate endpoint's response, or
/// `None` when the response is not that shape.
///
/// An empty array is a valid (empty) list.
#[must_use]
pub fn select_list(value: &Value, list_keys: &[String]) -> Option<Vec<Value>> {
    let array = match value {
        Value::Array(items) => items,
        Value::Object(map) => list_keys
            .iter()
            .find_map(|key| map.get(key).and_then(Value::as_array))?,
        _ => return None,
    };

    let objects: Vec<Value> = array.iter().filter(|v| v.is_object()).cloned().collect();
    if objects.is_empty() && !array.is_empty() {
        return None;
    }
    Some(objects)
}

/// A list item's booking number, whether published as string or number.
#[must_use]
pub fn booking_number_of(item: &Value) -> Option<String> {
    BOOKING_NUMBER_KEYS.iter().find_map(|key| match item.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// First element of an array response, or the object itself.
#[must_use]
pub fn first_object(value: Value) -> Value {
    match value {
        Value::Array(items) => items.into_iter().find(Value::is_object).unwrap_or(Value::Null),
        Value::Object(_) => value,
        _ => Value::Null,
    }
}

/// Whether a charges response lists at least one charge.
#[must_use]
pub fn has_charges(value: &Value) -> bool {
    value.as_array().is_some_and(|items| !items.is_empty())
}

/// JSON API adapter with optional HTML listing fallback.
pub struct JsonApiAdapter {
    county: County,
    name: String,
    transport: JsonApiTransport,
    ctx: HttpContext,
    detail_ctx: HttpContext,
    fallback: Option<ListingAdapter>,
}

impl JsonApiAdapter {
    /// # Errors
    ///
    /// Returns [`SourceError::Pattern`] if the fallback anchor pattern is
    /// invalid.
    pub fn new(
        config: &SourceAdapterConfig,
        transport: JsonApiTransport,
        ctx: HttpContext,
    ) -> Result<Self, SourceError> {
        let fallback = transport
            .fallback
            .clone()
            .map(|listing| ListingAdapter::new(config, listing, ctx.clone()))
            .transpose()?;
        let detail_ctx = ctx.with_min_interval(Duration::from_millis(transport.detail_delay_ms));

        Ok(Self {
            county: config.county,
            name: config.name.clone(),
            transport,
            ctx,
            detail_ctx,
            fallback,
        })
    }

    /// Tries each candidate list endpoint in order.
    async fn fetch_list(&self) -> Option<Vec<Value>> {
        for path in &self.transport.list_paths {
            let url = join_url(&self.transport.base_url, path);
            match self.ctx.get_text(&url).await {
                Ok(body) => match serde_json::from_str::<Value>(&body) {
                    Ok(value) => {
                        if let Some(items) = select_list(&value, &self.transport.list_keys) {
                            log::info!("{}: {} booking(s) from {url}", self.name, items.len());
                            return Some(items);
                        }
                        log::debug!("{}: {url} returned JSON of an unrecognized shape", self.name);
                    }
                    Err(e) => log::debug!("{}: {url} did not return JSON: {e}", self.name),
                },
                Err(e) if e.is_not_found() => log::trace!("{}: no endpoint at {url}", self.name),
                Err(e) => log::warn!("{}: candidate endpoint {url} failed: {e}", self.name),
            }
        }
        None
    }

    fn endpoint(&self, path: &str, booking_number: &str) -> String {
        join_url(
            &self.transport.base_url,
            &expand_booking_template(path, booking_number),
        )
    }

    /// Fetches an optional per-booking resource. A missing resource is an
    /// empty value; other failures are logged and also yield empty.
    async fn fetch_optional(&self, path: Option<&str>, booking_number: &str, empty: Value) -> Value {
        let Some(path) = path else {
            return empty;
        };
        let url = self.endpoint(path, booking_number);
        match self.detail_ctx.get_json(&url).await {
            Ok(value) => value,
            Err(e) if e.is_not_found() => empty,
            Err(e) => {
                log::warn!("{}: enrichment failed for booking {booking_number}: {e}", self.name);
                empty
            }
        }
    }

    fn block(&self, booking: Value, charges: Value, detail: Value, number: Option<&str>) -> RawBlock {
        let block = RawBlock::json(
            self.transport.layout,
            json!({ "booking": booking, "charges": charges, "detail": detail }),
        );
        match number {
            Some(number) => {
                let block = block.with_booking_number(number);
                match &self.transport.detail_url_template {
                    Some(template) => block.with_detail_url(expand_booking_template(template, number)),
                    None => block,
                }
            }
            None => block,
        }
    }

    async fn enriched_block(&self, item: Value, enrich: bool) -> RawBlock {
        let number = booking_number_of(&item);
        let Some(number) = number.as_deref().filter(|_| enrich) else {
            return self.block(item, Value::Array(Vec::new()), Value::Null, number.as_deref());
        };

        let charges = self
            .fetch_optional(self.transport.charges_path.as_deref(), number, Value::Array(Vec::new()))
            .await;
        let detail = first_object(
            self.fetch_optional(self.transport.detail_path.as_deref(), number, Value::Null)
                .await,
        );
        self.block(item, charges, detail, Some(number))
    }
}

#[async_trait]
impl SourceAdapter for JsonApiAdapter {
    fn county(&self) -> County {
        self.county
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_recent_records(&self, _window: &FetchWindow) -> Result<FetchOutcome, SourceError> {
        let Some(items) = self.fetch_list().await else {
            let Some(fallback) = &self.fallback else {
                return Err(SourceError::NoEndpoint {
                    tried: self.transport.list_paths.len(),
                });
            };
            log::warn!("{}: no JSON endpoint answered, using HTML listing", self.name);
            return Ok(FetchOutcome::fetched(fallback.fetch_blocks().await?));
        };

        let enrich_limit = self.transport.max_enrich;
        if items.len() > enrich_limit {
            log::info!(
                "{}: enriching the first {enrich_limit} of {} booking(s)",
                self.name,
                items.len()
            );
        }

        let blocks: Vec<RawBlock> = futures::stream::iter(items.into_iter().enumerate())
            .map(|(i, item)| self.enriched_block(item, i < enrich_limit))
            .buffered(self.transport.detail_concurrency.max(1))
            .collect()
            .await;

        Ok(FetchOutcome::fetched(blocks))
    }

    async fn probe_bookings(
        &self,
        range: RangeInclusive<u64>,
        progress: Arc<dyn ProgressCallback>,
    ) -> Result<FetchOutcome, SourceError> {
        let Some(charges_path) = self.transport.charges_path.as_deref() else {
            return Err(SourceError::Unsupported {
                county: self.county,
                operation: "booking range probes without a charges endpoint",
            });
        };

        let total = range.end().saturating_sub(*range.start()).saturating_add(1);
        progress.set_total(total);
        progress.set_message(format!("probing {}..={}", range.start(), range.end()));

        let mut blocks = Vec::new();
        let mut failures = 0u64;
        let mut last_error = None;

        for n in range {
            let number = n.to_string();
            let url = self.endpoint(charges_path, &number);

            match self.detail_ctx.get_json(&url).await {
                Ok(charges) if has_charges(&charges) => {
                    let detail = first_object(
                        self.fetch_optional(self.transport.detail_path.as_deref(), &number, Value::Null)
                            .await,
                    );
                    log::debug!("{}: booking {number} exists", self.name);
                    blocks.push(self.block(
                        json!({ "booking_number": number }),
                        charges,
                        detail,
                        Some(number.as_str()),
                    ));
                }
                Ok(_) => log::trace!("{}: booking {number} has no charges", self.name),
                Err(e) if e.is_not_found() => log::trace!("{}: booking {number} does not exist", self.name),
                Err(e) => {
                    log::warn!("{}: probe of booking {number} failed: {e}", self.name);
                    failures += 1;
                    last_error = Some(e);
                }
            }
            progress.inc(1);
        }

        progress.finish(format!("{} booking(s) found", blocks.len()));

        if failures == total
            && let Some(e) = last_error
        {
            return Err(e);
        }
        Ok(FetchOutcome::fetched(blocks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> Vec<String> {
        vec!["data".to_string(), "bookings".to_string()]
    }

    #[test]
    fn joins_relative_and_absolute_paths() {
        assert_eq!(
            join_url("https://www.sheriffleefl.org/", "/public-api/bookings"),
            "https://www.sheriffleefl.org/public-api/bookings"
        );
        assert_eq!(
            join_url("https://a.test", "https://b.test/x"),
            "https://b.test/x"
        );
    }

    #[test]
    fn selects_top_level_array() {
        let value = json!([{ "id": 1 }, { "id": 2 }]);
        assert_eq!(select_list(&value, &keys()).unwrap().len(), 2);
    }

    #[test]
    fn selects_wrapped_array() {
        let value = json!({ "total": 1, "bookings": [{ "booking_number": "A1" }] });
        let items = select_list(&value, &keys()).unwrap();
        assert_eq!(items[0]["booking_number"], "A1");
    }

    #[test]
    fn empty_array_is_a_valid_list() {
        assert_eq!(select_list(&json!([]), &keys()), Some(Vec::new()));
    }

    #[test]
    fn rejects_unrelated_shapes() {
        assert_eq!(select_list(&json!({ "status": "ok" }), &keys()), None);
        assert_eq!(select_list(&json!(["a", "b"]), &keys()), None);
        assert_eq!(select_list(&json!("text"), &keys()), None);
    }

    #[test]
    fn reads_booking_number_aliases() {
        assert_eq!(
            booking_number_of(&json!({ "booking_number": " 2024-1 " })).as_deref(),
            Some("2024-1")
        );
        assert_eq!(
            booking_number_of(&json!({ "bookingNumber": 991_234 })).as_deref(),
            Some("991234")
        );
        assert_eq!(
            booking_number_of(&json!({ "booking_number": "", "id": 7 })).as_deref(),
            Some("7")
        );
        assert_eq!(booking_number_of(&json!({ "name": "x" })), None);
    }

    #[test]
    fn first_object_unwraps_arrays() {
        assert_eq!(first_object(json!([{ "a": 1 }])), json!({ "a": 1 }));
        assert_eq!(first_object(json!({ "a": 1 })), json!({ "a": 1 }));
        assert_eq!(first_object(json!([])), Value::Null);
    }

    #[test]
    fn charges_presence() {
        assert!(has_charges(&json!([{ "offenseDescription": "DUI" }])));
        assert!(!has_charges(&json!([])));
        assert!(!has_charges(&json!({})));
    }
}
