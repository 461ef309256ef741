#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Canonical arrest record types.
//!
//! Every county source is normalized into an [`ArrestRecord`]. Downstream
//! consumers depend on its serialized shape field-for-field, so the serde
//! representation here is the published schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// A county sheriff's office whose booking records are ingested.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum County {
    /// Lee County, FL.
    Lee,
    /// Collier County, FL.
    Collier,
    /// Charlotte County, FL.
    Charlotte,
}

impl County {
    /// Human-readable county name, also used as the natural-key prefix.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Lee => "Lee",
            Self::Collier => "Collier",
            Self::Charlotte => "Charlotte",
        }
    }
}

/// Normalized custody status.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CustodyStatus {
    /// Still held at a facility.
    InCustody,
    /// Bonded out, released on recognizance, or otherwise released.
    Released,
    /// No recognizable marker.
    #[default]
    Unknown,
}

impl CustodyStatus {
    /// `Unknown` carries no information and never overwrites a known status.
    #[must_use]
    pub const fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// A parsed postal address. Any component may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

/// Replaces `current` with the trimmed `incoming` text when it is
/// non-blank and different.
fn merge_text(current: &mut String, incoming: &str) -> bool {
    let value = incoming.trim();
    if value.is_empty() || *current == value {
        return false;
    }
    value.clone_into(current);
    true
}

fn merge_option<T: Clone + PartialEq>(current: &mut Option<T>, incoming: Option<&T>) -> bool {
    match incoming {
        Some(value) if current.as_ref() != Some(value) => {
            *current = Some(value.clone());
            true
        }
        _ => false,
    }
}

fn merge_optional_text(current: &mut Option<String>, incoming: Option<&str>) -> bool {
    let incoming = incoming.map(str::trim).filter(|s| !s.is_empty());
    match incoming {
        Some(value) if current.as_deref() != Some(value) => {
            *current = Some(value.to_string());
            true
        }
        _ => false,
    }
}

impl Address {
    /// Merges non-blank components of `incoming`. Returns whether any
    /// component changed.
    pub fn merge_from(&mut self, incoming: &Self) -> bool {
        let mut changed = merge_text(&mut self.street, &incoming.street);
        changed |= merge_text(&mut self.city, &incoming.city);
        changed |= merge_text(&mut self.state, &incoming.state);
        changed |= merge_text(&mut self.zip, &incoming.zip);
        changed
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.street.trim().is_empty()
            && self.city.trim().is_empty()
            && self.state.trim().is_empty()
            && self.zip.trim().is_empty()
    }

    /// Joins the non-empty components as `street, city, state zip`.
    #[must_use]
    pub fn one_line(&self) -> String {
        let state_zip = [self.state.trim(), self.zip.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        [self.street.trim(), self.city.trim(), state_zip.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// One charge on a booking.
///
/// Court-level data that a source only publishes once per booking is
/// attached to the first charge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Charge {
    pub description: String,
    pub arresting_agency: String,
    pub bond_type: String,
    /// Non-negative dollar amount, absent when the source publishes none.
    pub bond_amount: Option<f64>,
    pub bond_paid_date: String,
    pub court_location: String,
    pub case_number: String,
    pub court_date: String,
    pub court_time: String,
}

impl Charge {
    /// Creates a charge with only a description.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    /// Merges non-blank fields of `incoming`. Returns whether any field
    /// changed.
    pub fn merge_from(&mut self, incoming: &Self) -> bool {
        let mut changed = merge_text(&mut self.description, &incoming.description);
        changed |= merge_text(&mut self.arresting_agency, &incoming.arresting_agency);
        changed |= merge_text(&mut self.bond_type, &incoming.bond_type);
        changed |= merge_option(&mut self.bond_amount, incoming.bond_amount.as_ref());
        changed |= merge_text(&mut self.bond_paid_date, &incoming.bond_paid_date);
        changed |= merge_text(&mut self.court_location, &incoming.court_location);
        changed |= merge_text(&mut self.case_number, &incoming.case_number);
        changed |= merge_text(&mut self.court_date, &incoming.court_date);
        changed |= merge_text(&mut self.court_time, &incoming.court_time);
        changed
    }
}

/// The canonical unit of work produced from one raw source block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ArrestRecord {
    pub county: Option<County>,
    pub booking_number: String,
    pub person_id: String,
    pub full_name: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub suffix: String,
    /// `YYYY-MM-DD` when parseable, otherwise the source text.
    pub dob: Option<String>,
    pub age: Option<u32>,
    pub sex: String,
    pub race: String,
    pub height: String,
    pub weight: String,
    pub hair_color: String,
    pub eye_color: String,
    pub address: Address,
    /// `YYYY-MM-DD` when parseable, otherwise the source text.
    pub booking_date: String,
    pub booking_time: Option<String>,
    pub status: CustodyStatus,
    pub facility: String,
    pub charges: Vec<Charge>,
    pub detail_url: String,
    pub mugshot_url: String,
    pub scraped_at: Option<DateTime<Utc>>,
}

impl ArrestRecord {
    /// Creates an empty record for `county`.
    #[must_use]
    pub fn new(county: County) -> Self {
        Self {
            county: Some(county),
            ..Self::default()
        }
    }

    /// Whether the record carries enough identity to derive a natural key.
    #[must_use]
    pub fn has_identity(&self) -> bool {
        !self.booking_number.trim().is_empty()
            || (!self.full_name.trim().is_empty() && !self.booking_date.trim().is_empty())
    }

    /// Sum of every published charge bond, or `None` when no charge has one.
    #[must_use]
    pub fn total_bond_amount(&self) -> Option<f64> {
        self.charges
            .iter()
            .filter_map(|c| c.bond_amount)
            .fold(None, |acc, amount| Some(acc.unwrap_or(0.0) + amount))
    }

    /// Distinct non-blank bond types in charge order, joined with `" / "`.
    #[must_use]
    pub fn bond_types(&self) -> String {
        let mut seen: Vec<&str> = Vec::new();
        for charge in &self.charges {
            let bond_type = charge.bond_type.trim();
            if !bond_type.is_empty() && !seen.iter().any(|s| s.eq_ignore_ascii_case(bond_type)) {
                seen.push(bond_type);
            }
        }
        seen.join(" / ")
    }

    /// Every charge description joined with `" | "`.
    #[must_use]
    pub fn charges_text(&self) -> String {
        self.charges
            .iter()
            .map(|c| c.description.trim())
            .filter(|d| !d.is_empty())
            .collect::<Vec<_>>()
            .join(" | ")
    }

    /// Merges a later fetch of the same booking into `self`.
    ///
    /// Only non-blank incoming values are taken; a known value is never
    /// replaced by a blank one and an `Unknown` status never replaces a
    /// known status. Charges merge by position and extra incoming charges
    /// are appended. `scraped_at` does not count as a change, but is
    /// refreshed when anything else changed.
    ///
    /// Returns whether any field changed.
    pub fn merge_from(&mut self, incoming: &Self) -> bool {
        let mut changed = merge_option(&mut self.county, incoming.county.as_ref());
        changed |= merge_text(&mut self.booking_number, &incoming.booking_number);
        changed |= merge_text(&mut self.person_id, &incoming.person_id);
        changed |= merge_text(&mut self.full_name, &incoming.full_name);
        changed |= merge_text(&mut self.first_name, &incoming.first_name);
        changed |= merge_text(&mut self.middle_name, &incoming.middle_name);
        changed |= merge_text(&mut self.last_name, &incoming.last_name);
        changed |= merge_text(&mut self.suffix, &incoming.suffix);
        changed |= merge_optional_text(&mut self.dob, incoming.dob.as_deref());
        changed |= merge_option(&mut self.age, incoming.age.as_ref());
        changed |= merge_text(&mut self.sex, &incoming.sex);
        changed |= merge_text(&mut self.race, &incoming.race);
        changed |= merge_text(&mut self.height, &incoming.height);
        changed |= merge_text(&mut self.weight, &incoming.weight);
        changed |= merge_text(&mut self.hair_color, &incoming.hair_color);
        changed |= merge_text(&mut self.eye_color, &incoming.eye_color);
        changed |= self.address.merge_from(&incoming.address);
        changed |= merge_text(&mut self.booking_date, &incoming.booking_date);
        changed |= merge_optional_text(&mut self.booking_time, incoming.booking_time.as_deref());
        if incoming.status.is_known() && incoming.status != self.status {
            self.status = incoming.status;
            changed = true;
        }
        changed |= merge_text(&mut self.facility, &incoming.facility);
        for (i, charge) in incoming.charges.iter().enumerate() {
            match self.charges.get_mut(i) {
                Some(existing) => changed |= existing.merge_from(charge),
                None => {
                    self.charges.push(charge.clone());
                    changed = true;
                }
            }
        }
        changed |= merge_text(&mut self.detail_url, &incoming.detail_url);
        changed |= merge_text(&mut self.mugshot_url, &incoming.mugshot_url);

        if changed && incoming.scraped_at.is_some() {
            self.scraped_at = incoming.scraped_at;
        }
        changed
    }

    /// The first non-blank court date across charges.
    #[must_use]
    pub fn court_date(&self) -> Option<&str> {
        self.charges
            .iter()
            .map(|c| c.court_date.trim())
            .find(|d| !d.is_empty())
    }
}

/// Qualification bucket derived from a numeric score.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Tier {
    Hot,
    Warm,
    Cold,
    Disqualified,
}

impl Tier {
    /// Ordering strength: higher is a better lead.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Hot => 3,
            Self::Warm => 2,
            Self::Cold => 1,
            Self::Disqualified => 0,
        }
    }

    /// Whether this tier is at least as strong as `minimum`.
    #[must_use]
    pub const fn meets(self, minimum: Self) -> bool {
        self.rank() >= minimum.rank()
    }
}

/// Result of scoring one record. Never stored inside the record itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadScore {
    pub score: i32,
    pub tier: Tier,
    /// Rule descriptions in evaluation order.
    pub reasons: Vec<String>,
}
