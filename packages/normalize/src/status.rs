//! Custody status inference from free text.
//!
//! Markers are checked in a fixed priority order. An in-custody marker wins
//! over any release marker in the same text: a booking is assumed held
//! until release is unambiguous.

use std::sync::LazyLock;

use arrest_leads_arrest_models::CustodyStatus;
use regex::Regex;

/// Negated custody phrases, rewritten before the in-custody scan so that
/// "NOT IN CUSTODY" does not read as held.
static NEGATED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:NOT|NO LONGER)\s+IN[\s-]?CUSTODY\b").expect("valid regex")
});

static IN_CUSTODY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:IN[\s-]?CUSTODY|IN JAIL|INCARCERATED|CONFINED)\b").expect("valid regex")
});

static RELEASED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:RELEASED|BONDED(?:\s+OUT)?|BOND POSTED|DISCHARGED|OUT OF CUSTODY|R\.?O\.?R\b|TRANSFERRED)",
    )
    .expect("valid regex")
});

/// Infers a status from any number of text fragments scanned together.
#[must_use]
pub fn infer_status<'a>(texts: impl IntoIterator<Item = &'a str>) -> CustodyStatus {
    let joined = texts.into_iter().collect::<Vec<_>>().join(" ");
    let text = NEGATED_RE.replace_all(&joined, " RELEASED ");

    if IN_CUSTODY_RE.is_match(&text) {
        CustodyStatus::InCustody
    } else if RELEASED_RE.is_match(&text) {
        CustodyStatus::Released
    } else {
        CustodyStatus::Unknown
    }
}

/// Status from an explicit boolean custody flag.
#[must_use]
pub const fn from_flag(in_custody: bool) -> CustodyStatus {
    if in_custody {
        CustodyStatus::InCustody
    } else {
        CustodyStatus::Released
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_single_markers() {
        assert_eq!(infer_status(["In Custody"]), CustodyStatus::InCustody);
        assert_eq!(infer_status(["INCUSTODY"]), CustodyStatus::InCustody);
        assert_eq!(infer_status(["03/01/2024 BONDED"]), CustodyStatus::Released);
        assert_eq!(infer_status(["Released on R.O.R."]), CustodyStatus::Released);
        assert_eq!(infer_status(["ROR"]), CustodyStatus::Released);
    }

    #[test]
    fn in_custody_wins_over_release_markers() {
        assert_eq!(
            infer_status(["03/01/2024 BONDED", "03/02/2024 IN CUSTODY"]),
            CustodyStatus::InCustody
        );
    }

    #[test]
    fn negated_custody_is_a_release() {
        assert_eq!(infer_status(["Not in custody"]), CustodyStatus::Released);
    }

    #[test]
    fn unmarked_text_is_unknown() {
        assert_eq!(infer_status(["BATTERY", ""]), CustodyStatus::Unknown);
        assert_eq!(infer_status(["ERROR"]), CustodyStatus::Unknown);
        assert_eq!(infer_status(std::iter::empty::<&str>()), CustodyStatus::Unknown);
    }

    #[test]
    fn flag_maps_directly() {
        assert_eq!(from_flag(true), CustodyStatus::InCustody);
        assert_eq!(from_flag(false), CustodyStatus::Released);
    }
}
