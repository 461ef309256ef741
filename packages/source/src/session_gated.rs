//! Adapter for rosters behind an anti-bot interstitial.
//!
//! A direct GET is tried first. If the answer is a refusal (a challenge page
//! recognized by its markers, or HTTP 403/429), the request is repeated with
//! a pre-provisioned session cookie taken from the environment. Solving the
//! challenge is out of scope: without a working cookie the adapter reports
//! the source as blocked and returns no blocks. Any other failing status is
//! an unreachable source and surfaces as [`SourceError::Status`].

use arrest_leads_arrest_models::County;
use arrest_leads_extract::collapse_whitespace;
use arrest_leads_source_models::{
    FetchOutcome, FetchWindow, RawBlock, RecordLayout, SessionGatedTransport, SourceAdapterConfig,
};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};

use crate::http::HttpContext;
use crate::retry::FetchedPage;
use crate::{SourceAdapter, SourceError};

/// Key under which a row's first link is stored.
pub const LINK_KEY: &str = "_link";

/// Whether `body` is an anti-bot interstitial rather than content.
#[must_use]
pub fn is_challenge(body: &str, markers: &[String]) -> bool {
    markers
        .iter()
        .any(|marker| !marker.is_empty() && body.contains(marker.as_str()))
}

/// How the roster answered one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Granted,
    Refused,
    Failed,
}

fn classify(page: &FetchedPage, markers: &[String]) -> Access {
    if is_challenge(&page.body, markers) || matches!(page.status, 403 | 429) {
        Access::Refused
    } else if page.is_success() {
        Access::Granted
    } else {
        Access::Failed
    }
}

fn status_error(url: &str, page: &FetchedPage) -> SourceError {
    SourceError::Status {
        url: url.to_string(),
        status: page.status,
    }
}

fn parse_selector(selector: &str) -> Result<Selector, SourceError> {
    Selector::parse(selector).map_err(|e| SourceError::Config {
        message: format!("invalid CSS selector '{selector}': {e}"),
    })
}

fn cell_text(cell: ElementRef<'_>) -> String {
    collapse_whitespace(&cell.text().collect::<Vec<_>>().join(" "))
}

/// Extracts header-keyed rows from the first roster table.
///
/// Headers come from the first row with `<th>` cells (or the first row when
/// the table has none). Each later row becomes an object mapping header to
/// cell text, plus [`LINK_KEY`] for the row's first link.
///
/// # Errors
///
/// Returns [`SourceError::Config`] if `table_selector` is not valid CSS.
pub fn roster_rows(html: &str, table_selector: &str) -> Result<Vec<Map<String, Value>>, SourceError> {
    let table_sel = parse_selector(table_selector)?;
    let row_sel = parse_selector("tr")?;
    let header_sel = parse_selector("th")?;
    let cell_sel = parse_selector("td, th")?;
    let link_sel = parse_selector("a[href]")?;

    let document = Html::parse_document(html);

    for table in document.select(&table_sel) {
        let rows: Vec<ElementRef<'_>> = table.select(&row_sel).collect();

        // ── Extract headers ─────────────────────────────────────────────
        let header_index = rows
            .iter()
            .position(|row| row.select(&header_sel).next().is_some())
            .unwrap_or(0);
        let Some(header_row) = rows.get(header_index) else {
            continue;
        };
        let headers: Vec<String> = header_row.select(&cell_sel).map(cell_text).collect();
        if headers.iter().all(String::is_empty) {
            continue;
        }

        // ── Extract body rows ───────────────────────────────────────────
        let records: Vec<Map<String, Value>> = rows
            .iter()
            .skip(header_index + 1)
            .filter_map(|row| {
                let cells: Vec<String> = row.select(&cell_sel).map(cell_text).collect();
                if cells.iter().all(String::is_empty) {
                    return None;
                }
                let mut record: Map<String, Value> = headers
                    .iter()
                    .zip(cells)
                    .filter(|(header, _)| !header.is_empty())
                    .map(|(header, cell)| (header.clone(), Value::String(cell)))
                    .collect();
                if let Some(href) = row
                    .select(&link_sel)
                    .next()
                    .and_then(|a| a.value().attr("href"))
                {
                    record.insert(LINK_KEY.to_string(), Value::String(href.to_string()));
                }
                Some(record)
            })
            .collect();

        if !records.is_empty() {
            return Ok(records);
        }
    }

    Ok(Vec::new())
}

/// Turns roster rows into blocks, resolving row links against `page_url`.
#[must_use]
pub fn roster_blocks(
    rows: Vec<Map<String, Value>>,
    page_url: &str,
    layout: RecordLayout,
) -> Vec<RawBlock> {
    let base = reqwest::Url::parse(page_url).ok();
    rows.into_iter()
        .map(|row| {
            let link = row
                .get(LINK_KEY)
                .and_then(Value::as_str)
                .and_then(|href| base.as_ref().and_then(|b| b.join(href).ok()))
                .map(String::from);
            let block = RawBlock::json(layout, Value::Object(row));
            match link {
                Some(url) => block.with_detail_url(url),
                None => block,
            }
        })
        .collect()
}

/// Direct-then-cookie GET adapter.
pub struct SessionGatedAdapter {
    county: County,
    name: String,
    transport: SessionGatedTransport,
    session: Option<String>,
    ctx: HttpContext,
}

impl SessionGatedAdapter {
    /// Reads the session cookie from the configured environment variable,
    /// if any.
    #[must_use]
    pub fn new(config: &SourceAdapterConfig, transport: SessionGatedTransport, ctx: HttpContext) -> Self {
        let session = transport
            .session_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .map(|cookie| cookie.trim().to_string())
            .filter(|cookie| !cookie.is_empty());

        Self {
            county: config.county,
            name: config.name.clone(),
            transport,
            session,
            ctx,
        }
    }

    /// Returns the page body once past the interstitial, or `None` when
    /// blocked.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Status`] when the roster fails for a reason
    /// other than a refusal, such as a 5xx outage or a moved URL.
    async fn fetch_roster(&self) -> Result<Option<String>, SourceError> {
        let url = &self.transport.url;
        let markers = &self.transport.challenge_markers;

        let direct = self.ctx.get_page(url, None).await?;
        match classify(&direct, markers) {
            Access::Granted => return Ok(Some(direct.body)),
            Access::Failed => return Err(status_error(url, &direct)),
            Access::Refused => log::info!(
                "{}: direct fetch refused (HTTP {}, challenge={})",
                self.name,
                direct.status,
                is_challenge(&direct.body, markers)
            ),
        }

        let Some(cookie) = self.session.as_deref() else {
            log::warn!("{}: blocked and no session cookie is configured", self.name);
            return Ok(None);
        };

        let with_session = self.ctx.get_page(url, Some(cookie)).await?;
        match classify(&with_session, markers) {
            Access::Granted => Ok(Some(with_session.body)),
            Access::Failed => Err(status_error(url, &with_session)),
            Access::Refused => {
                log::warn!(
                    "{}: session cookie rejected (HTTP {}); it likely needs to be re-provisioned",
                    self.name,
                    with_session.status
                );
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl SourceAdapter for SessionGatedAdapter {
    fn county(&self) -> County {
        self.county
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_recent_records(&self, _window: &FetchWindow) -> Result<FetchOutcome, SourceError> {
        let Some(html) = self.fetch_roster().await? else {
            return Ok(FetchOutcome::blocked());
        };

        let rows = roster_rows(&html, &self.transport.table_selector)?;
        let blocks = roster_blocks(rows, &self.transport.url, self.transport.layout);
        log::info!("{}: {} roster row(s)", self.name, blocks.len());
        Ok(FetchOutcome::fetched(blocks))
    }
}
