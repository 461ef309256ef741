//! Date normalization to `YYYY-MM-DD`.

use chrono::{Datelike, NaiveDate, NaiveDateTime};

const DATE_FORMATS: &[&str] = &[
    "%m/%d/%Y",
    "%Y-%m-%d",
    "%m-%d-%Y",
    "%Y/%m/%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%a %b %d %Y",
];

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
];

/// Parses `MM/DD/YYYY` and the other common published forms.
///
/// Timestamps are reduced to their date; a trailing timezone offset is
/// accepted.
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }

    DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        })
}

/// Emits `YYYY-MM-DD` when `raw` is parseable and returns the trimmed input
/// unchanged otherwise.
#[must_use]
pub fn normalize_date(raw: &str) -> String {
    parse_date(raw).map_or_else(
        || raw.trim().to_string(),
        |date| date.format("%Y-%m-%d").to_string(),
    )
}

/// Splits `"10/05/2025 09:00:00"` into date and time at the first space.
#[must_use]
pub fn split_date_time(raw: &str) -> (String, String) {
    let text = raw.trim();
    text.split_once(' ').map_or_else(
        || (text.to_string(), String::new()),
        |(date, time)| (date.trim().to_string(), time.trim().to_string()),
    )
}

/// Whole years between `dob` and `on`, or `None` if `on` precedes `dob`.
#[must_use]
pub fn age_on(dob: NaiveDate, on: NaiveDate) -> Option<u32> {
    let mut years = on.year() - dob.year();
    if (on.month(), on.day()) < (dob.month(), dob.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_us_date() {
        assert_eq!(normalize_date("03/07/2024"), "2024-03-07");
        assert_eq!(normalize_date("3/7/2024"), "2024-03-07");
    }

    #[test]
    fn normalizes_free_form_dates() {
        assert_eq!(normalize_date("2024-03-07T14:30:00"), "2024-03-07");
        assert_eq!(normalize_date("2024-03-07T14:30:00-05:00"), "2024-03-07");
        assert_eq!(normalize_date("March 7, 2024"), "2024-03-07");
        assert_eq!(normalize_date("03/07/2024 02:15 PM"), "2024-03-07");
    }

    #[test]
    fn passes_unparseable_through() {
        assert_eq!(normalize_date(" sometime in March "), "sometime in March");
        assert_eq!(normalize_date(""), "");
    }

    #[test]
    fn splits_date_and_time() {
        assert_eq!(
            split_date_time("10/05/2025 09:00:00"),
            ("10/05/2025".to_string(), "09:00:00".to_string())
        );
        assert_eq!(
            split_date_time("10/05/2025"),
            ("10/05/2025".to_string(), String::new())
        );
    }

    #[test]
    fn computes_age_around_birthday() {
        let dob = NaiveDate::from_ymd_opt(1990, 6, 15).unwrap();
        let before = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
        let on = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert_eq!(age_on(dob, before), Some(33));
        assert_eq!(age_on(dob, on), Some(34));
        assert_eq!(age_on(on, dob), None);
    }
}
