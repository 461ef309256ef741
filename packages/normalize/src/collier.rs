//! Collier County arrest report sections.
//!
//! Each block is one person's section of the report page. The first row
//! carries name, DOB, and residence (`CITY, ST ZIP`); the rest are labeled
//! cells, a charge table, one court date, and a dated custody marker.

use std::sync::LazyLock;

use arrest_leads_arrest_models::{Address, ArrestRecord, Charge};
use arrest_leads_extract::{
    decompose_name, first_match, labeled_cell, normalize_date, parse_address,
    parse_money, strip_tags, title_case,
};
use regex::Regex;

use crate::status::infer_status;
use crate::{apply_name, optional_date};

static NAME_DOB_RESIDENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)<td[^>]*>([^<]+)</td>\s*<td[^>]*>(\d{2}/\d{2}/\d{4})</td>\s*<td[^>]*>([^<]+)</td>",
    )
    .expect("valid regex")
});

static PERSON_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)A#[^\d]*(\d{8})").expect("valid regex"));

static PIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)PIN[^\d]*(\d{9,10})").expect("valid regex"));

static CHARGE_ROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)<tr[^>]*>\s*<td[^>]*>(\d{2}/\d{2}/\d{4})</td>\s*<td[^>]*>(\d+)</td>\s*<td[^>]*>([^<]+)</td>",
    )
    .expect("valid regex")
});

static COURT_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)Court Date</th>\s*</tr>\s*<tr[^>]*>.*?<td[^>]*>(\d{2}/\d{2}/\d{4})<")
        .expect("valid regex")
});

static CUSTODY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{2}/\d{2}/\d{4})\s+(BONDED|RELEASED|IN CUSTODY)").expect("valid regex")
});

static CITY_STATE_ZIP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([^,]+),\s*([A-Z]{2})\s*(\d{5}(?:-\d{4})?)?$").expect("valid regex")
});

/// Residence as published: usually `"NAPLES, FL 34120"` with no street.
#[must_use]
pub fn parse_residence(raw: &str, home_state: &str) -> Address {
    let residence = raw.trim();
    CITY_STATE_ZIP_RE.captures(residence).map_or_else(
        || parse_address(residence, home_state),
        |caps| Address {
            street: String::new(),
            city: title_case(&caps[1]),
            state: caps[2].to_ascii_uppercase(),
            zip: caps.get(3).map(|m| m.as_str().to_string()).unwrap_or_default(),
        },
    )
}

/// Parses one person section.
#[must_use]
pub fn parse_report(html: &str, home_state: &str) -> ArrestRecord {
    let mut record = ArrestRecord::default();

    // ── Identity ────────────────────────────────────────────────────────
    if let Some(caps) = NAME_DOB_RESIDENCE_RE.captures(html) {
        let name = title_case(&strip_tags(&caps[1]));
        apply_name(&mut record, &decompose_name(&name));
        record.dob = Some(normalize_date(&caps[2]));
        record.address = parse_residence(&strip_tags(&caps[3]), home_state);
    }
    record.person_id = first_match(html, &PERSON_ID_RE)
        .or_else(|| first_match(html, &PIN_RE))
        .unwrap_or_default();

    // ── Labeled cells ───────────────────────────────────────────────────
    let cell = |label: &str| labeled_cell(html, label).unwrap_or_default();
    record.race = cell("Race");
    record.sex = cell("Sex");
    record.height = cell("Height");
    record.weight = cell("Weight");
    record.hair_color = cell("Hair Color");
    record.eye_color = cell("Eye Color");
    record.booking_number = cell("Booking Number");
    record.booking_date = normalize_date(&cell("Booking Date"));
    record.age = cell("Age at Arrest").parse().ok();
    let agency = cell("Agency");

    // ── Charges ─────────────────────────────────────────────────────────
    record.charges = CHARGE_ROW_RE
        .captures_iter(html)
        .map(|caps| strip_tags(&caps[3]))
        .filter(|description| !description.is_empty())
        .map(|description| Charge {
            arresting_agency: agency.clone(),
            ..Charge::new(description)
        })
        .collect();

    // ── Custody and court ───────────────────────────────────────────────
    let text = strip_tags(html);
    let marker = CUSTODY_RE.captures(&text);
    record.status = infer_status([text.as_str()]);

    if let Some(first) = record.charges.first_mut() {
        first.bond_amount = parse_money(&cell("Bond Amount"));
        first.bond_type = cell("Bond Type");
        first.court_date = first_match(html, &COURT_DATE_RE)
            .and_then(|d| optional_date(&d))
            .unwrap_or_default();
        if let Some(caps) = marker.as_ref().filter(|c| c[2].eq_ignore_ascii_case("BONDED")) {
            first.bond_paid_date = normalize_date(&caps[1]);
        }
    }

    record
}

#[cfg(test)]
mod tests {
    use arrest_leads_arrest_models::CustodyStatus;

    use super::*;

    const SECTION: &str = r#"<table class="person">
        <tr><td>Name</td><td>DOB</td><td>Residence</td></tr>
        <tr><td>MCKSYMICK, JOSEY WALES</td><td>07/04/1985</td><td>NAPLES, FL 34120</td></tr>
      </table>
      <table>
        <tr><td>A#</td><td>A# 12345678</td><td>PIN</td><td>1234567890</td></tr>
        <tr><td>Race</td><td>W</td><td>Sex</td><td>M</td></tr>
        <tr><td>Height</td><td>6'01"</td><td>Weight</td><td>210</td></tr>
        <tr><td>Hair Color</td><td>BRO</td><td>Eye Color</td><td>GRN</td></tr>
        <tr><td>Agency</td><td>CCSO</td></tr>
        <tr><td>Booking Date</td><td>03/01/2024</td></tr>
        <tr><td>Booking Number</td><td>202400123</td></tr>
        <tr><td>Age at Arrest</td><td>38</td></tr>
        <tr><td>Bond Amount</td><td>$2,500.00</td></tr>
      </table>
      <table class="charges">
        <tr><th>Date</th><th>Count</th><th>Charge</th></tr>
        <tr><td>03/01/2024</td><td>1</td><td>DUI</td></tr>
        <tr><td>03/01/2024</td><td>2</td><td>DRIVING WHILE LICENSE SUSPENDED</td></tr>
      </table>
      <table class="court">
        <tr><th>Case</th><th>Court Date</th></tr>
        <tr><td>24-CT-1</td><td>04/10/2024</td></tr>
      </table>
      <p>03/02/2024 BONDED</p>"#;

    #[test]
    fn parses_identity_and_person() {
        let record = parse_report(SECTION, "FL");
        assert_eq!(record.full_name, "Mcksymick, Josey Wales");
        assert_eq!(record.first_name, "Josey");
        assert_eq!(record.middle_name, "Wales");
        assert_eq!(record.dob.as_deref(), Some("1985-07-04"));
        assert_eq!(record.address.city, "Naples");
        assert_eq!(record.address.state, "FL");
        assert_eq!(record.address.zip, "34120");
        assert_eq!(record.person_id, "12345678");
        assert_eq!(record.race, "W");
        assert_eq!(record.hair_color, "BRO");
        assert_eq!(record.booking_number, "202400123");
        assert_eq!(record.booking_date, "2024-03-01");
        assert_eq!(record.age, Some(38));
    }

    #[test]
    fn charges_carry_court_data_on_first() {
        let record = parse_report(SECTION, "FL");
        assert_eq!(
            record.charges_text(),
            "DUI | DRIVING WHILE LICENSE SUSPENDED"
        );
        let first = &record.charges[0];
        assert_eq!(first.arresting_agency, "CCSO");
        assert_eq!(first.court_date, "2024-04-10");
        assert_eq!(first.bond_amount, Some(2500.0));
        assert_eq!(first.bond_paid_date, "2024-03-02");
        assert!(record.charges[1].court_date.is_empty());
    }

    #[test]
    fn bonded_marker_means_released() {
        assert_eq!(parse_report(SECTION, "FL").status, CustodyStatus::Released);
    }

    #[test]
    fn in_custody_wins_when_both_markers_appear() {
        let html = format!("{SECTION}<p>03/03/2024 IN CUSTODY</p>");
        assert_eq!(parse_report(&html, "FL").status, CustodyStatus::InCustody);
    }

    #[test]
    fn residence_without_zip_or_comma() {
        let naples = parse_residence("NAPLES, FL", "FL");
        assert_eq!(naples.city, "Naples");
        assert!(naples.zip.is_empty());

        let full = parse_residence("123 Main St Naples FL 34120", "FL");
        assert_eq!(full.street, "123 Main St");
        assert_eq!(full.city, "Naples");
    }

    #[test]
    fn unrecognized_section_is_blank() {
        let record = parse_report("<table><tr><td>nothing</td></tr></table>", "FL");
        assert!(!record.has_identity());
        assert!(record.charges.is_empty());
    }
}
