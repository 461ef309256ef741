#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Record normalization.
//!
//! [`normalize`] turns one [`RawBlock`] into an [`ArrestRecord`] using the
//! field table for the block's [`RecordLayout`]. Blocks that do not yield an
//! identity (a booking number, or a full name plus booking date) normalize
//! to `None`: partial blocks are routine and are skipped by the caller, not
//! treated as failures.
//!
//! Court-level data that a layout publishes once per block is attached to
//! the first charge.

pub mod booking_row;
pub mod collier;
pub mod fields;
pub mod inmate_table;
pub mod lee;
pub mod status;

use arrest_leads_arrest_models::{ArrestRecord, County};
use arrest_leads_extract::{NameParts, age_on, normalize_date, parse_date};
use arrest_leads_source_models::{RawBlock, RawBody, RecordLayout};

/// A block whose body is not the shape its layout requires.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    /// HTML where JSON was expected, or the reverse.
    #[error("{layout} block has a {found} body, expected {expected}")]
    WrongBody {
        layout: RecordLayout,
        found: &'static str,
        expected: &'static str,
    },

    /// A JSON block that is not an object.
    #[error("{layout} block is not a JSON object")]
    NotAnObject { layout: RecordLayout },
}

const fn body_kind(body: &RawBody) -> &'static str {
    match body {
        RawBody::Html(_) => "HTML",
        RawBody::Json(_) => "JSON",
    }
}

const fn expected_kind(layout: RecordLayout) -> &'static str {
    match layout {
        RecordLayout::LeeBooking | RecordLayout::InmateTable => "JSON",
        RecordLayout::BookingRow | RecordLayout::CollierReport => "HTML",
    }
}

/// Normalizes one block for `county`.
///
/// `home_state` fills the state of addresses that carry only a zip.
///
/// # Errors
///
/// Returns [`NormalizeError`] if the block body does not match its layout.
/// A well-shaped block that lacks identifying fields is `Ok(None)`.
pub fn normalize(
    block: &RawBlock,
    county: County,
    home_state: &str,
) -> Result<Option<ArrestRecord>, NormalizeError> {
    let mut record = match (block.layout, &block.body) {
        (RecordLayout::LeeBooking, RawBody::Json(value)) => lee::parse_booking(value, home_state)?,
        (RecordLayout::BookingRow, RawBody::Html(html)) => booking_row::parse_row(html),
        (RecordLayout::CollierReport, RawBody::Html(html)) => {
            collier::parse_report(html, home_state)
        }
        (RecordLayout::InmateTable, RawBody::Json(value)) => {
            inmate_table::parse_row(value, home_state)?
        }
        (layout, body) => {
            return Err(NormalizeError::WrongBody {
                layout,
                found: body_kind(body),
                expected: expected_kind(layout),
            });
        }
    };

    record.county = Some(county);
    if record.booking_number.is_empty()
        && let Some(number) = block.booking_number.as_deref()
    {
        record.booking_number = number.trim().to_string();
    }
    if record.detail_url.is_empty()
        && let Some(url) = block.detail_url.as_deref()
    {
        record.detail_url = url.to_string();
    }
    derive_age(&mut record);

    if !record.has_identity() {
        log::debug!("{county}: {} block has no booking number or name+date", block.layout);
        return Ok(None);
    }

    Ok(Some(record))
}

/// Copies decomposed name parts onto `record` and rebuilds `full_name` as
/// `"Last, First Middle Suffix"`.
pub fn apply_name(record: &mut ArrestRecord, parts: &NameParts) {
    record.first_name.clone_from(&parts.first);
    record.middle_name.clone_from(&parts.middle);
    record.last_name.clone_from(&parts.last);
    record.suffix.clone_from(&parts.suffix);
    record.full_name = parts.full_name();
}

/// Normalized date, or `None` when `raw` is blank.
#[must_use]
pub fn optional_date(raw: &str) -> Option<String> {
    let normalized = normalize_date(raw);
    (!normalized.is_empty()).then_some(normalized)
}

/// Fills `age` from dob and booking date when the source gave none.
fn derive_age(record: &mut ArrestRecord) {
    if record.age.is_some() {
        return;
    }
    let dob = record.dob.as_deref().and_then(parse_date);
    let booked = parse_date(&record.booking_date);
    if let (Some(dob), Some(booked)) = (dob, booked) {
        record.age = age_on(dob, booked);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn block_booking_number_fills_missing_identity() {
        let block = RawBlock::html(
            RecordLayout::BookingRow,
            "<tr><td>SMITH, JOHN</td></tr>".to_string(),
        )
        .with_booking_number("991")
        .with_detail_url("https://x.test/booking/?id=991");

        let record = normalize(&block, County::Lee, "FL").unwrap().unwrap();
        assert_eq!(record.county, Some(County::Lee));
        assert_eq!(record.booking_number, "991");
        assert_eq!(record.detail_url, "https://x.test/booking/?id=991");
        assert_eq!(record.last_name, "SMITH");
    }

    #[test]
    fn block_without_identity_is_none() {
        let block = RawBlock::html(
            RecordLayout::CollierReport,
            "<table><tr><td>garbage</td></tr></table>".to_string(),
        );
        assert_eq!(normalize(&block, County::Collier, "FL").unwrap(), None);

        let empty = RawBlock::json(RecordLayout::InmateTable, json!({ "Charges": "DUI" }));
        assert_eq!(normalize(&empty, County::Charlotte, "FL").unwrap(), None);
    }

    #[test]
    fn mismatched_body_is_an_error() {
        let block = RawBlock::html(RecordLayout::LeeBooking, "<tr></tr>".to_string());
        assert!(matches!(
            normalize(&block, County::Lee, "FL"),
            Err(NormalizeError::WrongBody { found: "HTML", .. })
        ));
    }

    #[test]
    fn age_derives_from_dob_at_booking() {
        let block = RawBlock::json(
            RecordLayout::LeeBooking,
            json!({
                "booking": {
                    "bookingNumber": "12345",
                    "name": "DOE, JANE",
                    "dob": "06/15/1990",
                    "bookingDate": "06/14/2024"
                }
            }),
        );
        let record = normalize(&block, County::Lee, "FL").unwrap().unwrap();
        assert_eq!(record.dob.as_deref(), Some("1990-06-15"));
        assert_eq!(record.age, Some(33));
    }
}
