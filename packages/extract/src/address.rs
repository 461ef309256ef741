//! Residence address decomposition.
//!
//! Formats are tried in a fixed order and the first that matches wins:
//!
//! 1. `"123 Main St, Fort Myers, FL 33901"`
//! 2. `"123 Main St Fort Myers FL 33901"` (street/city split at the last
//!    street-type token such as `ST` or `BLVD`)
//! 3. `"123 Main St 33901"` (state defaults to the home state)
//! 4. `"33901"` (state defaults to the home state)
//!
//! Anything else is kept whole as the street with empty city/state/zip.

use std::sync::LazyLock;

use arrest_leads_arrest_models::Address;
use regex::Regex;

use crate::text::collapse_whitespace;

static COMMA_FORM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.+?),\s*([^,]+?),\s*([A-Z]{2})\s+(\d{5}(?:-\d{4})?)$")
        .expect("valid regex")
});

static SPACED_FORM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?)\s+([A-Z][A-Za-z\s]+?)\s+([A-Z]{2})\s+(\d{5}(?:-\d{4})?)$")
        .expect("valid regex")
});

static STREET_ZIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s+(\d{5}(?:-\d{4})?)$").expect("valid regex"));

static ZIP_ONLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{5}(?:-\d{4})?)$").expect("valid regex"));

const STREET_TYPES: &[&str] = &[
    "ST",
    "STREET",
    "AVE",
    "AVENUE",
    "RD",
    "ROAD",
    "DR",
    "DRIVE",
    "LN",
    "LANE",
    "WAY",
    "BLVD",
    "BOULEVARD",
    "CT",
    "COURT",
    "CIR",
    "CIRCLE",
    "TER",
    "TERRACE",
    "PKWY",
    "PARKWAY",
    "HWY",
    "HIGHWAY",
    "PL",
    "PLACE",
    "TRL",
    "TRAIL",
    "LOOP",
];

fn is_street_type(token: &str) -> bool {
    let normalized = token.replace(['.', ','], "").to_ascii_uppercase();
    STREET_TYPES.contains(&normalized.as_str())
}

/// Splits `street_raw city_raw` at the last street-type token, leaving at
/// least one token for the city. Falls back to the regex split. A comma
/// left at the end of the street is dropped.
fn split_street_city(street_raw: &str, city_raw: &str) -> (String, String) {
    let tokens: Vec<&str> = street_raw
        .split_whitespace()
        .chain(city_raw.split_whitespace())
        .collect();

    let boundary = (0..tokens.len().saturating_sub(1))
        .rev()
        .find(|&i| is_street_type(tokens[i]));

    let (street, city) = boundary.map_or_else(
        || (street_raw.trim().to_string(), city_raw.trim().to_string()),
        |i| (tokens[..=i].join(" "), tokens[i + 1..].join(" ")),
    );
    (street.trim_end_matches(',').trim_end().to_string(), city)
}

/// Decomposes a one-line residence address.
///
/// `home_state` fills the state for formats that carry a zip but no state.
#[must_use]
pub fn parse_address(raw: &str, home_state: &str) -> Address {
    let addr = collapse_whitespace(raw);
    if addr.is_empty() {
        return Address::default();
    }

    if let Some(caps) = COMMA_FORM_RE.captures(&addr) {
        return Address {
            street: caps[1].trim().to_string(),
            city: caps[2].trim().to_string(),
            state: caps[3].to_ascii_uppercase(),
            zip: caps[4].to_string(),
        };
    }

    if let Some(caps) = SPACED_FORM_RE.captures(&addr) {
        let (street, city) = split_street_city(&caps[1], &caps[2]);
        return Address {
            street,
            city,
            state: caps[3].to_ascii_uppercase(),
            zip: caps[4].to_string(),
        };
    }

    if let Some(caps) = STREET_ZIP_RE.captures(&addr) {
        return Address {
            street: caps[1].trim().to_string(),
            city: String::new(),
            state: home_state.to_string(),
            zip: caps[2].to_string(),
        };
    }

    if let Some(caps) = ZIP_ONLY_RE.captures(&addr) {
        return Address {
            street: String::new(),
            city: String::new(),
            state: home_state.to_string(),
            zip: caps[1].to_string(),
        };
    }

    Address {
        street: addr,
        ..Address::default()
    }
}
