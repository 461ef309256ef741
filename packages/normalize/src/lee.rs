//! Lee County booking JSON.
//!
//! Blocks come from the JSON adapter as
//! `{ "booking": {...}, "charges": [...], "detail": {...} }`. List items use
//! several naming schemes, so each field is read through an alias list.
//! Person fields prefer the detail object; the first charge supplies a
//! booking date when the list item has none.

use arrest_leads_arrest_models::{ArrestRecord, Charge};
use arrest_leads_extract::{NameParts, decompose_name, normalize_date, parse_address, split_date_time};
use arrest_leads_source_models::RecordLayout;
use serde_json::Value;

use crate::fields::{flag, money, optional_text, text};
use crate::status::{from_flag, infer_status};
use crate::{NormalizeError, apply_name, optional_date};

const BOOKING_NUMBER: &[&str] = &["booking_number", "bookingNumber", "id"];
const NAME: &[&str] = &["name", "full_name", "fullName"];
const DOB: &[&str] = &["dob", "date_of_birth", "birthDate"];
const BOOKING_DATE: &[&str] = &["booking_date", "booked_on", "bookingDate"];
const BOOKING_TIME: &[&str] = &["booking_time", "bookingTime"];
const FACILITY: &[&str] = &["facility", "location"];
const PERSON_ID: &[&str] = &["person_id", "personId"];
const MUGSHOT: &[&str] = &["mugshot_url", "mugshotUrl", "photoUrl"];

static NULL: Value = Value::Null;

/// Parses one enriched booking block.
///
/// A bare list item (no `booking` wrapper) is accepted as the booking.
///
/// # Errors
///
/// Returns [`NormalizeError::NotAnObject`] if the block is not an object.
pub fn parse_booking(value: &Value, home_state: &str) -> Result<ArrestRecord, NormalizeError> {
    if !value.is_object() {
        return Err(NormalizeError::NotAnObject {
            layout: RecordLayout::LeeBooking,
        });
    }

    let booking = value.get("booking").filter(|b| b.is_object()).unwrap_or(value);
    let detail = value.get("detail").filter(|d| d.is_object()).unwrap_or(&NULL);
    let charge_items: &[Value] = value
        .get("charges")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let first_charge = charge_items.first().unwrap_or(&NULL);

    // ── Identity ────────────────────────────────────────────────────────
    let mut record = ArrestRecord {
        booking_number: optional_text(booking, BOOKING_NUMBER)
            .unwrap_or_else(|| text(first_charge, &["bookingNumber"])),
        person_id: optional_text(booking, PERSON_ID).unwrap_or_else(|| text(detail, PERSON_ID)),
        ..ArrestRecord::default()
    };

    let surname = text(detail, &["surName"]);
    if surname.is_empty() {
        apply_name(&mut record, &decompose_name(&text(booking, NAME)));
    } else {
        apply_name(
            &mut record,
            &NameParts {
                first: text(detail, &["givenName"]),
                middle: text(detail, &["middleName"]),
                last: surname,
                suffix: text(detail, &["suffix"]),
            },
        );
    }

    // ── Person ──────────────────────────────────────────────────────────
    record.dob = optional_text(detail, &["birthDate"])
        .or_else(|| optional_text(booking, DOB))
        .map(|dob| normalize_date(&dob));
    record.race = text(detail, &["race"]);
    record.sex = text(detail, &["sex"]);
    record.height = text(detail, &["height"]);
    record.weight = text(detail, &["weight"]);
    record.hair_color = text(detail, &["hair"]);
    record.eye_color = text(detail, &["eyes"]);
    record.address = parse_address(&text(detail, &["address"]), home_state);
    record.mugshot_url = optional_text(detail, MUGSHOT).unwrap_or_else(|| text(booking, MUGSHOT));

    // ── Booking ─────────────────────────────────────────────────────────
    let booked = optional_text(booking, BOOKING_DATE)
        .unwrap_or_else(|| text(first_charge, &["bookingDate"]));
    record.booking_date = normalize_date(&booked);
    record.booking_time = optional_text(booking, BOOKING_TIME);
    record.facility = text(booking, FACILITY);

    record.status = match flag(detail, "inCustody") {
        Some(true) => from_flag(true),
        flag_value => {
            let inferred = infer_status([
                text(detail, &["inCustodyText"]).as_str(),
                text(booking, &["status"]).as_str(),
                text(first_charge, &["disposition"]).as_str(),
            ]);
            match (inferred.is_known(), flag_value) {
                (false, Some(false)) => from_flag(false),
                _ => inferred,
            }
        }
    };

    record.charges = charge_items.iter().filter_map(parse_charge).collect();

    Ok(record)
}

/// One charges-endpoint entry. Entries with no description and no bond
/// data are dropped.
fn parse_charge(item: &Value) -> Option<Charge> {
    let (court_date, court_time) = split_date_time(&text(item, &["hearingDate"]));

    let charge = Charge {
        description: text(item, &["offenseDescription", "description"]),
        arresting_agency: text(item, &["arrestingAgency"]),
        bond_type: text(item, &["bondTypeName", "bondType"]),
        bond_amount: money(item, &["bondAmount"]),
        bond_paid_date: optional_date(&text(item, &["bondDatePosted"])).unwrap_or_default(),
        court_location: text(item, &["courtLocation"]),
        case_number: text(item, &["caseNumber"]),
        court_date: optional_date(&court_date).unwrap_or_default(),
        court_time,
    };

    let empty = charge.description.is_empty()
        && charge.bond_type.is_empty()
        && charge.bond_amount.is_none();
    (!empty).then_some(charge)
}
