//! Single-GET listing adapter.
//!
//! Fetches one results page, finds booking numbers through anchor links
//! (`booking/?id=NNN`), and cuts out the table row that holds each one. The
//! same booking usually appears behind several anchors (name, photo, "view"
//! link), so numbers are deduplicated in first-seen order.

use std::sync::LazyLock;

use arrest_leads_arrest_models::County;
use arrest_leads_source_models::{
    FetchOutcome, FetchWindow, ListingTransport, RawBlock, SourceAdapterConfig,
    expand_booking_template,
};
use async_trait::async_trait;
use regex::Regex;

use crate::http::HttpContext;
use crate::{SourceAdapter, SourceError};

static ROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<tr[^>]*>.*?</tr>").expect("valid regex"));

/// Unique booking numbers captured by `anchor`, in document order.
#[must_use]
pub fn booking_anchors(html: &str, anchor: &Regex) -> Vec<String> {
    let mut seen = Vec::new();
    for caps in anchor.captures_iter(html) {
        if let Some(number) = caps.get(1).map(|m| m.as_str().trim())
            && !number.is_empty()
            && !seen.iter().any(|s: &String| s == number)
        {
            seen.push(number.to_string());
        }
    }
    seen
}

/// The first `<tr>` whose markup mentions `booking_number` as a whole token.
#[must_use]
pub fn row_containing<'a>(html: &'a str, booking_number: &str) -> Option<&'a str> {
    ROW_RE
        .find_iter(html)
        .map(|m| m.as_str())
        .find(|row| contains_token(row, booking_number))
}

fn contains_token(haystack: &str, token: &str) -> bool {
    haystack.match_indices(token).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + token.len()..].chars().next();
        !before.is_some_and(|c| c.is_ascii_digit()) && !after.is_some_and(|c| c.is_ascii_digit())
    })
}

/// Cuts a listing page into one block per booking number.
///
/// A booking whose row cannot be located still yields a block carrying the
/// number so the record is not lost.
#[must_use]
pub fn listing_blocks(html: &str, anchor: &Regex, transport: &ListingTransport) -> Vec<RawBlock> {
    booking_anchors(html, anchor)
        .into_iter()
        .map(|number| {
            let row = row_containing(html, &number).unwrap_or_default();
            let block = RawBlock::html(transport.layout, row.to_string())
                .with_booking_number(number.clone());
            match &transport.detail_url_template {
                Some(template) => block.with_detail_url(expand_booking_template(template, &number)),
                None => block,
            }
        })
        .collect()
}

/// GET + regex adapter.
pub struct ListingAdapter {
    county: County,
    name: String,
    transport: ListingTransport,
    anchor: Regex,
    ctx: HttpContext,
}

impl ListingAdapter {
    /// # Errors
    ///
    /// Returns [`SourceError::Pattern`] if the anchor pattern is invalid.
    pub fn new(
        config: &SourceAdapterConfig,
        transport: ListingTransport,
        ctx: HttpContext,
    ) -> Result<Self, SourceError> {
        let anchor = Regex::new(&transport.anchor_pattern)?;
        Ok(Self {
            county: config.county,
            name: config.name.clone(),
            transport,
            anchor,
            ctx,
        })
    }

    /// Fetches and cuts the listing page. Shared with the JSON adapter's
    /// HTML fallback.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the page cannot be fetched.
    pub async fn fetch_blocks(&self) -> Result<Vec<RawBlock>, SourceError> {
        let html = self.ctx.get_text(&self.transport.url).await?;
        let blocks = listing_blocks(&html, &self.anchor, &self.transport);
        log::info!(
            "{}: {} booking(s) on listing page {}",
            self.name,
            blocks.len(),
            self.transport.url
        );
        Ok(blocks)
    }
}

#[async_trait]
impl SourceAdapter for ListingAdapter {
    fn county(&self) -> County {
        self.county
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_recent_records(&self, _window: &FetchWindow) -> Result<FetchOutcome, SourceError> {
        Ok(FetchOutcome::fetched(self.fetch_blocks().await?))
    }
}
