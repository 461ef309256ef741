//! Header-keyed inmate roster rows.
//!
//! Roster tables name their columns loosely ("Booking #", "Booking Number",
//! "Charge(s)"), so headers are compared after lowercasing and dropping
//! everything but letters and digits. A charges cell may list several
//! charges separated by `;`, `|`, or line breaks; the row's single bond
//! amount and bond type attach to the first charge.

use std::sync::LazyLock;

use arrest_leads_arrest_models::{ArrestRecord, Charge};
use arrest_leads_extract::{collapse_whitespace, decompose_name, normalize_date, parse_address, parse_money};
use arrest_leads_source_models::RecordLayout;
use regex::Regex;
use serde_json::{Map, Value};

use crate::status::infer_status;
use crate::{NormalizeError, apply_name, optional_date};

const NAME: &[&str] = &["name", "inmatename", "inmate", "fullname"];
const BOOKING_NUMBER: &[&str] = &["booking", "bookingnumber", "bookingno", "bookingid"];
const BOOKING_DATE: &[&str] = &["bookingdate", "bookeddate", "datebooked", "arrestdate"];
const DOB: &[&str] = &["dob", "dateofbirth", "birthdate"];
const CHARGES: &[&str] = &["charges", "charge", "offense", "offenses"];
const BOND: &[&str] = &["bond", "bondamount", "bail", "bailamount"];
const BOND_TYPE: &[&str] = &["bondtype", "bailtype"];
const STATUS: &[&str] = &["status", "custodystatus"];
const FACILITY: &[&str] = &["facility", "location", "housing"];
const ADDRESS: &[&str] = &["address", "residence"];
const RACE: &[&str] = &["race"];
const SEX: &[&str] = &["sex", "gender"];
const AGE: &[&str] = &["age"];

static CHARGE_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[;|\n]+").expect("valid regex"));

/// `"Booking #"` and `"booking number"` both become `"booking…"` keys.
#[must_use]
pub fn header_key(header: &str) -> String {
    header
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Cell text for the first header matching any alias.
fn cell(row: &Map<String, Value>, aliases: &[&str]) -> String {
    row.iter()
        .filter(|(header, _)| aliases.contains(&header_key(header).as_str()))
        .filter_map(|(_, value)| value.as_str())
        .map(collapse_whitespace)
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}

/// Parses one roster row object.
///
/// # Errors
///
/// Returns [`NormalizeError::NotAnObject`] if the row is not an object.
pub fn parse_row(value: &Value, home_state: &str) -> Result<ArrestRecord, NormalizeError> {
    let row = value.as_object().ok_or(NormalizeError::NotAnObject {
        layout: RecordLayout::InmateTable,
    })?;

    let mut charges: Vec<Charge> = CHARGE_SPLIT_RE
        .split(&cell(row, CHARGES))
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(Charge::new)
        .collect();

    let bond_amount = parse_money(&cell(row, BOND));
    let bond_type = cell(row, BOND_TYPE);
    if charges.is_empty() && (bond_amount.is_some() || !bond_type.is_empty()) {
        charges.push(Charge::default());
    }
    if let Some(first) = charges.first_mut() {
        first.bond_amount = bond_amount;
        first.bond_type = bond_type;
    }

    let status_text = cell(row, STATUS);
    let mut record = ArrestRecord {
        booking_number: cell(row, BOOKING_NUMBER),
        dob: optional_date(&cell(row, DOB)),
        age: cell(row, AGE).parse().ok(),
        sex: cell(row, SEX),
        race: cell(row, RACE),
        address: parse_address(&cell(row, ADDRESS), home_state),
        booking_date: normalize_date(&cell(row, BOOKING_DATE)),
        status: infer_status([status_text.as_str()]),
        facility: cell(row, FACILITY),
        charges,
        ..ArrestRecord::default()
    };
    apply_name(&mut record, &decompose_name(&cell(row, NAME)));

    Ok(record)
}

#[cfg(test)]
mod tests {
    use arrest_leads_arrest_models::CustodyStatus;
    use serde_json::json;

    use super::*;

    #[test]
    fn header_keys_ignore_case_and_punctuation() {
        assert_eq!(header_key("Booking #"), "booking");
        assert_eq!(header_key("Booking Number"), "bookingnumber");
        assert_eq!(header_key("Charge(s)"), "charges");
        assert_eq!(header_key("D.O.B."), "dob");
    }

    #[test]
    fn parses_roster_row() {
        let row = json!({
            "Name": "SMITH, JOHN",
            "Booking #": "2024-001",
            "Booking Date": "03/01/2024",
            "D.O.B.": "01/02/1990",
            "Charge(s)": "DUI; RESISTING OFFICER | TRESPASS",
            "Bond": "$1,500.00",
            "Bond Type": "CASH",
            "Status": "In Custody",
            "Facility": "Charlotte County Jail",
            "_link": "/inmate.php?id=9"
        });
        let record = parse_row(&row, "FL").unwrap();
        assert_eq!(record.booking_number, "2024-001");
        assert_eq!(record.full_name, "SMITH, JOHN");
        assert_eq!(record.booking_date, "2024-03-01");
        assert_eq!(record.dob.as_deref(), Some("1990-01-02"));
        assert_eq!(record.status, CustodyStatus::InCustody);
        assert_eq!(record.charges.len(), 3);
        assert_eq!(record.charges[0].bond_amount, Some(1500.0));
        assert_eq!(record.charges[0].bond_type, "CASH");
        assert_eq!(record.charges[2].description, "TRESPASS");
        assert_eq!(record.bond_types(), "CASH");
    }

    #[test]
    fn bond_without_charges_keeps_bond() {
        let row = json!({ "Name": "Jane Doe", "Booking Number": "7", "Bond Amount": "500" });
        let record = parse_row(&row, "FL").unwrap();
        assert_eq!(record.total_bond_amount(), Some(500.0));
        assert_eq!(record.charges_text(), "");
    }

    #[test]
    fn non_object_row_is_an_error() {
        assert!(parse_row(&json!("row"), "FL").is_err());
    }
}
