//! Builds notification payloads from scored records.

use arrest_leads_arrest_models::{ArrestRecord, Charge, County, LeadScore};
use arrest_leads_dedup::NaturalKey;
use arrest_leads_ingest_models::{Highlights, NotificationPayload, SearchLink};
use reqwest::Url;
use uuid::Uuid;

const SEPARATOR: &str = " · ";

fn join_present<'a>(pieces: impl IntoIterator<Item = &'a str>) -> String {
    pieces
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// `$2000`, or `$2000.50` when there are cents.
#[must_use]
pub fn format_amount(amount: f64) -> String {
    if amount.fract().abs() < f64::EPSILON {
        format!("${amount:.0}")
    } else {
        format!("${amount:.2}")
    }
}

/// First charge description, plus `(+N more)` when there are others.
#[must_use]
pub fn charges_summary(record: &ArrestRecord) -> String {
    let descriptions: Vec<&str> = record
        .charges
        .iter()
        .map(|c| c.description.trim())
        .filter(|d| !d.is_empty())
        .collect();

    match descriptions.as_slice() {
        [] => String::new(),
        [only] => (*only).to_string(),
        [first, rest @ ..] => format!("{first} (+{} more)", rest.len()),
    }
}

/// `type · $amount · Paid: date`, blanks omitted.
#[must_use]
pub fn bond_line(record: &ArrestRecord) -> String {
    let bond_type = record.bond_types();
    let amount = record
        .total_bond_amount()
        .filter(|a| *a > 0.0)
        .map(format_amount)
        .unwrap_or_default();
    let paid = record
        .charges
        .iter()
        .map(|c| c.bond_paid_date.trim())
        .find(|d| !d.is_empty())
        .map(|d| format!("Paid: {d}"))
        .unwrap_or_default();

    join_present([bond_type.as_str(), amount.as_str(), paid.as_str()])
}

/// `#case · date · time · location` for the first charge that carries court
/// data, blanks omitted.
#[must_use]
pub fn court_line(record: &ArrestRecord) -> String {
    let Some(charge) = record.charges.iter().find(|c| has_court_data(c)) else {
        return String::new();
    };

    let case = if charge.case_number.trim().is_empty() {
        String::new()
    } else {
        format!("#{}", charge.case_number.trim())
    };
    join_present([
        case.as_str(),
        charge.court_date.as_str(),
        charge.court_time.as_str(),
        charge.court_location.as_str(),
    ])
}

fn has_court_data(charge: &Charge) -> bool {
    [
        &charge.case_number,
        &charge.court_date,
        &charge.court_time,
        &charge.court_location,
    ]
    .iter()
    .any(|s| !s.trim().is_empty())
}

/// Configured key-charge terms present in the charges, in config order.
#[must_use]
pub fn key_charge_flags(record: &ArrestRecord, key_charges: &[String]) -> Vec<String> {
    let charges = record.charges_text().to_uppercase();
    key_charges
        .iter()
        .filter(|term| {
            let term = term.trim().to_uppercase();
            !term.is_empty() && charges.contains(&term)
        })
        .cloned()
        .collect()
}

/// The display name as "First Last" when the parts are known.
fn search_name(record: &ArrestRecord) -> String {
    let first = record.first_name.trim();
    let last = record.last_name.trim();
    if !first.is_empty() && !last.is_empty() {
        format!("{first} {last}")
    } else {
        record.full_name.trim().to_string()
    }
}

/// Google, Facebook, and TruePeopleSearch links for the person's name and
/// home city.
#[must_use]
pub fn search_links(record: &ArrestRecord) -> Vec<SearchLink> {
    let name = search_name(record);
    if name.is_empty() {
        return Vec::new();
    }

    let city = record.address.city.trim();
    let state = record.address.state.trim();
    let query = [name.as_str(), city, state]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    let mut links = Vec::new();
    let mut push = |label: &str, base: &str, params: &[(&str, &str)]| {
        match Url::parse_with_params(base, params) {
            Ok(url) => links.push(SearchLink {
                label: label.to_string(),
                url: url.into(),
            }),
            Err(e) => log::warn!("Could not build {label} link: {e}"),
        }
    };

    push("Google", "https://www.google.com/search", &[("q", query.as_str())]);
    push(
        "Facebook",
        "https://www.facebook.com/search/people/",
        &[("q", query.as_str())],
    );

    let last = record.last_name.trim();
    if !last.is_empty() {
        let mut params = Vec::new();
        let first = record.first_name.trim();
        if !first.is_empty() {
            params.push(("firstname", first));
        }
        params.push(("lastname", last));
        let city_state = if state.is_empty() {
            city.to_string()
        } else {
            format!("{city}, {state}")
        };
        if !city.is_empty() {
            params.push(("citystatezip", city_state.as_str()));
        }
        push(
            "TruePeopleSearch",
            "https://www.truepeoplesearch.com/results",
            &params,
        );
    }

    links
}

/// Assembles the payload for one scored record.
#[must_use]
pub fn build_payload(
    run_id: Uuid,
    county: County,
    key: &NaturalKey,
    record: &ArrestRecord,
    score: &LeadScore,
    key_charges: &[String],
) -> NotificationPayload {
    NotificationPayload {
        run_id,
        county,
        booking_number: record.booking_number.clone(),
        natural_key: key.to_string(),
        full_name: record.full_name.clone(),
        score: score.score,
        tier: score.tier,
        reasons: score.reasons.clone(),
        highlights: Highlights {
            charges: charges_summary(record),
            bond: bond_line(record),
            court: court_line(record),
            custody: record.status,
            key_charges: key_charge_flags(record, key_charges),
            address: record.address.one_line(),
        },
        detail_url: record.detail_url.clone(),
        mugshot_url: record.mugshot_url.clone(),
        search_links: search_links(record),
    }
}

#[cfg(test)]
mod tests {
    use arrest_leads_arrest_models::{CustodyStatus, Tier};

    use super::*;

    fn record() -> ArrestRecord {
        let mut record = ArrestRecord::new(County::Lee);
        record.booking_number = "12345".to_string();
        record.full_name = "SMITH, JOHN MICHAEL".to_string();
        record.first_name = "JOHN".to_string();
        record.last_name = "SMITH".to_string();
        record.address.city = "FORT MYERS".to_string();
        record.address.state = "FL".to_string();
        record.status = CustodyStatus::InCustody;
        record.charges = vec![
            Charge {
                bond_amount: Some(2000.0),
                bond_type: "Surety".to_string(),
                bond_paid_date: "2024-03-02".to_string(),
                case_number: "24-MM-001".to_string(),
                court_date: "2024-04-05".to_string(),
                court_time: "09:00".to_string(),
                court_location: "Courtroom 4A".to_string(),
                ..Charge::new("DUI")
            },
            Charge::new("RESIST OFFICER WITHOUT VIOLENCE"),
            Charge::new("DOMESTIC BATTERY"),
        ];
        record
    }

    #[test]
    fn charges_summary_counts_the_rest() {
        assert_eq!(charges_summary(&record()), "DUI (+2 more)");

        let mut single = record();
        single.charges.truncate(1);
        assert_eq!(charges_summary(&single), "DUI");

        single.charges.clear();
        assert_eq!(charges_summary(&single), "");
    }

    #[test]
    fn bond_and_court_lines() {
        assert_eq!(bond_line(&record()), "Surety · $2000 · Paid: 2024-03-02");
        assert_eq!(
            court_line(&record()),
            "#24-MM-001 · 2024-04-05 · 09:00 · Courtroom 4A"
        );

        let mut sparse = record();
        sparse.charges[0].bond_type.clear();
        sparse.charges[0].bond_paid_date.clear();
        sparse.charges[0].case_number.clear();
        sparse.charges[0].court_time.clear();
        assert_eq!(bond_line(&sparse), "$2000");
        assert_eq!(court_line(&sparse), "2024-04-05 · Courtroom 4A");
    }

    #[test]
    fn amounts_keep_cents_only_when_present() {
        assert_eq!(format_amount(500.0), "$500");
        assert_eq!(format_amount(1250.5), "$1250.50");
    }

    #[test]
    fn key_charges_follow_config_order() {
        let terms: Vec<String> = ["DUI", "DOMESTIC", "BATTERY", "THEFT"]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(key_charge_flags(&record(), &terms), ["DUI", "DOMESTIC", "BATTERY"]);
    }

    #[test]
    fn search_links_encode_name_and_city() {
        let links = search_links(&record());
        let labels: Vec<&str> = links.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, ["Google", "Facebook", "TruePeopleSearch"]);
        assert_eq!(
            links[0].url,
            "https://www.google.com/search?q=JOHN+SMITH+FORT+MYERS+FL"
        );
        assert!(links[2].url.contains("firstname=JOHN"));
        assert!(links[2].url.contains("lastname=SMITH"));
        assert!(links[2].url.contains("citystatezip=FORT+MYERS%2C+FL"));
    }

    #[test]
    fn no_links_without_a_name() {
        assert!(search_links(&ArrestRecord::new(County::Lee)).is_empty());
    }

    #[test]
    fn payload_carries_identity_and_score() {
        let record = record();
        let score = LeadScore {
            score: 90,
            tier: Tier::Hot,
            reasons: vec!["Currently in custody".to_string()],
        };
        let key = arrest_leads_dedup::natural_key(County::Lee, &record).unwrap();
        let payload = build_payload(Uuid::new_v4(), County::Lee, &key, &record, &score, &[]);

        assert_eq!(payload.county, County::Lee);
        assert_eq!(payload.natural_key, "Lee|12345");
        assert_eq!(payload.tier, Tier::Hot);
        assert_eq!(payload.highlights.custody, CustodyStatus::InCustody);
        assert_eq!(payload.highlights.address, "FORT MYERS, FL");
    }
}
