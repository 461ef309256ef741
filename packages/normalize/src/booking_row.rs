//! One `<tr>` of a booking search results page.
//!
//! The row's first cell holds the name (sometimes followed by `DOB: ...`).
//! Dates and times are found anywhere in the row; the facility is the cell
//! naming a jail or core facility. Rows on the search page are current
//! bookings, so a row without a release marker is in custody.

use std::sync::LazyLock;

use arrest_leads_arrest_models::{ArrestRecord, CustodyStatus};
use arrest_leads_extract::{all_captures, decompose_name, first_match, normalize_date, strip_tags};
use regex::Regex;

use crate::apply_name;
use crate::status::infer_status;

static CELL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<td[^>]*>(.*?)</td>").expect("valid regex"));

static DOB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)DOB[:\s]*([0-9/]+)").expect("valid regex"));

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2}/\d{2}/\d{4})").expect("valid regex"));

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d{1,2}:\d{2}:\d{2}\s*[AP]M)").expect("valid regex"));

static FACILITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:JAIL|CORE)\b").expect("valid regex"));

/// Parses one listing row.
#[must_use]
pub fn parse_row(html: &str) -> ArrestRecord {
    let cells = all_captures(html, &CELL_RE);
    let text = strip_tags(html);

    let name_cell = cells.first().map_or("", String::as_str);
    let name = DOB_RE
        .find(name_cell)
        .map_or(name_cell, |m| &name_cell[..m.start()])
        .trim();

    let dob = first_match(&text, &DOB_RE);
    let without_dob = DOB_RE.replace_all(&text, " ");
    let booked = first_match(&without_dob, &DATE_RE).unwrap_or_default();

    let status = match infer_status([text.as_str()]) {
        CustodyStatus::Unknown => CustodyStatus::InCustody,
        known => known,
    };

    let mut record = ArrestRecord {
        dob: dob.map(|d| normalize_date(&d)),
        booking_date: normalize_date(&booked),
        booking_time: first_match(&without_dob, &TIME_RE),
        facility: cells
            .iter()
            .skip(1)
            .find(|cell| FACILITY_RE.is_match(cell))
            .cloned()
            .unwrap_or_default(),
        status,
        ..ArrestRecord::default()
    };
    apply_name(&mut record, &decompose_name(name));

    record
}
