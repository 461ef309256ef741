//! ASP.NET WebForms postback adapter.
//!
//! The search page only answers a POST that echoes the hidden view-state
//! fields from a fresh GET of the same page:
//!
//! 1. GET the form page.
//! 2. Pull `__VIEWSTATE` and friends out by id.
//! 3. POST them back with the date range and the submit button.
//! 4. Cut the result page into one block per person.
//!
//! A missing required hidden field means the page changed shape; that is a
//! fetch error, never an empty result.

use arrest_leads_arrest_models::County;
use arrest_leads_extract::hidden_field;
use arrest_leads_source_models::{
    FetchOutcome, FetchWindow, FormPostTransport, RawBlock, SourceAdapterConfig,
};
use async_trait::async_trait;
use chrono::format::{Item, StrftimeItems};
use regex::Regex;

use crate::http::HttpContext;
use crate::{SourceAdapter, SourceError};

/// Reads every hidden field the postback needs.
///
/// Optional fields that are absent are echoed back empty.
///
/// # Errors
///
/// Returns [`SourceError::MissingHiddenField`] for the first required field
/// not on the page.
pub fn extract_form_state(
    html: &str,
    transport: &FormPostTransport,
) -> Result<Vec<(String, String)>, SourceError> {
    let mut fields = Vec::with_capacity(
        transport.hidden_fields.len() + transport.optional_hidden_fields.len(),
    );

    for name in &transport.hidden_fields {
        let value = hidden_field(html, name).ok_or_else(|| SourceError::MissingHiddenField {
            field: name.clone(),
        })?;
        fields.push((name.clone(), value));
    }

    for name in &transport.optional_hidden_fields {
        fields.push((name.clone(), hidden_field(html, name).unwrap_or_default()));
    }

    Ok(fields)
}

/// Checks that `format` is a strftime pattern chrono can render.
///
/// # Errors
///
/// Returns [`SourceError::Config`] naming the format if any specifier is
/// unknown or malformed.
pub fn validate_date_format(format: &str) -> Result<(), SourceError> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(SourceError::Config {
            message: format!("invalid date format '{format}'"),
        });
    }
    Ok(())
}

/// Appends the date range and constant fields to the echoed form state.
///
/// `transport.date_format` must have passed [`validate_date_format`];
/// [`FormPostAdapter::new`] checks it.
#[must_use]
pub fn build_form(
    mut state: Vec<(String, String)>,
    transport: &FormPostTransport,
    window: &FetchWindow,
) -> Vec<(String, String)> {
    state.push((
        transport.date_from_field.clone(),
        window.from.format(&transport.date_format).to_string(),
    ));
    state.push((
        transport.date_to_field.clone(),
        window.to.format(&transport.date_format).to_string(),
    ));
    state.extend(
        transport
            .extra_fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone())),
    );
    state
}

/// Splits `html` at every match of `delimiter`; each block runs to the
/// next delimiter or the end of the page. Text before the first delimiter
/// is discarded.
#[must_use]
pub fn split_blocks<'a>(html: &'a str, delimiter: &Regex) -> Vec<&'a str> {
    let starts: Vec<usize> = delimiter.find_iter(html).map(|m| m.start()).collect();
    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(html.len());
            &html[start..end]
        })
        .collect()
}

/// View-state form POST adapter.
pub struct FormPostAdapter {
    county: County,
    name: String,
    transport: FormPostTransport,
    delimiter: Regex,
    ctx: HttpContext,
}

impl FormPostAdapter {
    /// # Errors
    ///
    /// Returns [`SourceError::Pattern`] if the block delimiter is invalid,
    /// or [`SourceError::Config`] if the date format is.
    pub fn new(
        config: &SourceAdapterConfig,
        transport: FormPostTransport,
        ctx: HttpContext,
    ) -> Result<Self, SourceError> {
        validate_date_format(&transport.date_format)?;
        let delimiter = Regex::new(&transport.block_delimiter)?;
        Ok(Self {
            county: config.county,
            name: config.name.clone(),
            transport,
            delimiter,
            ctx,
        })
    }
}

#[async_trait]
impl SourceAdapter for FormPostAdapter {
    fn county(&self) -> County {
        self.county
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_recent_records(&self, window: &FetchWindow) -> Result<FetchOutcome, SourceError> {
        let url = &self.transport.url;

        let form_page = self.ctx.get_text(url).await?;
        let state = extract_form_state(&form_page, &self.transport)?;
        log::debug!("{}: extracted {} hidden field(s)", self.name, state.len());

        let form = build_form(state, &self.transport, window);
        let results = self.ctx.post_form(url, &form).await?;

        let blocks: Vec<RawBlock> = split_blocks(&results, &self.delimiter)
            .into_iter()
            .map(|block| RawBlock::html(self.transport.layout, block.to_string()))
            .collect();

        log::info!(
            "{}: {} block(s) for {} to {}",
            self.name,
            blocks.len(),
            window.from,
            window.to
        );

        Ok(FetchOutcome::fetched(blocks))
    }
}
