#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Lead scoring.
//!
//! [`LeadScorer::score`] is pure: the same record and configuration always
//! produce the same [`LeadScore`], and the record is never modified. Rules
//! run in a fixed order and their weights are added; a disqualifying
//! charge subtracts its penalty like any other rule rather than forcing a
//! fixed minimum.

pub mod config;

use arrest_leads_arrest_models::{ArrestRecord, CustodyStatus, LeadScore, Tier};

pub use config::ScoringConfig;

/// Errors that can occur while loading a scoring configuration.
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The configuration document is malformed.
    #[error("invalid scoring config: {0}")]
    Toml(#[from] toml::de::Error),
}

fn contains_any(haystack_upper: &str, terms: &[String]) -> bool {
    terms
        .iter()
        .map(|t| t.trim().to_uppercase())
        .any(|t| !t.is_empty() && haystack_upper.contains(&t))
}

/// Scores records against a [`ScoringConfig`].
#[derive(Debug, Clone)]
pub struct LeadScorer {
    config: ScoringConfig,
}

impl LeadScorer {
    #[must_use]
    pub const fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Adds county-specific disqualifying terms to the base set.
    #[must_use]
    pub fn with_extra_disqualifiers(mut self, terms: impl IntoIterator<Item = String>) -> Self {
        for term in terms {
            let exists = self
                .config
                .disqualifiers
                .terms
                .iter()
                .any(|t| t.eq_ignore_ascii_case(&term));
            if !exists {
                self.config.disqualifiers.terms.push(term);
            }
        }
        self
    }

    #[must_use]
    pub const fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Scores `record`.
    #[must_use]
    pub fn score(&self, record: &ArrestRecord) -> LeadScore {
        let mut score = 0;
        let mut reasons = Vec::new();
        let mut apply = |weight: i32, reason: &str| {
            score += weight;
            reasons.push(reason.to_string());
        };

        // ── Bond amount ─────────────────────────────────────────────────
        let bond = &self.config.bond_amount;
        match record.total_bond_amount() {
            Some(a) if a >= bond.ideal_min && a <= bond.ideal_max => {
                apply(bond.ideal, "Ideal bond amount ($500-$50K)");
            }
            Some(a) if a > bond.ideal_max && a <= bond.high_max => {
                apply(bond.high, "High bond amount ($50K-$100K)");
            }
            Some(a) if a > bond.high_max => apply(bond.very_high, "Very high bond amount (>$100K)"),
            Some(a) if a > 0.0 => apply(bond.low, "Low bond amount (<$500)"),
            _ => apply(bond.missing, "No bond amount"),
        }

        // ── Bond type ───────────────────────────────────────────────────
        let bond_type = record.bond_types().to_uppercase();
        let types = &self.config.bond_type;
        if contains_any(&bond_type, &types.bondable_terms) {
            apply(types.bondable, "Bondable type (Cash/Surety)");
        }
        if contains_any(&bond_type, &types.not_bondable_terms) {
            apply(types.not_bondable, "NOT BONDABLE (No Bond/Hold)");
        }
        if contains_any(&bond_type, &types.recognizance_terms) {
            apply(types.recognizance, "Released on own recognizance");
        }

        // ── Custody ─────────────────────────────────────────────────────
        match record.status {
            CustodyStatus::InCustody => apply(self.config.custody.in_custody, "Currently in custody"),
            CustodyStatus::Released => apply(self.config.custody.released, "Already released"),
            CustodyStatus::Unknown => {}
        }

        // ── Completeness ────────────────────────────────────────────────
        let charges = record.charges_text();
        if is_complete(record, &charges) {
            apply(self.config.completeness.complete, "Complete data");
        } else {
            apply(self.config.completeness.incomplete, "Missing data");
        }

        // ── Disqualifying charges ───────────────────────────────────────
        if contains_any(&charges.to_uppercase(), &self.config.disqualifiers.terms) {
            apply(self.config.disqualifiers.penalty, "DISQUALIFIED: Severe charge");
        }

        let tier = self.tier_for(score);
        LeadScore {
            score,
            tier,
            reasons,
        }
    }

    /// Maps a numeric score to its tier.
    #[must_use]
    pub const fn tier_for(&self, score: i32) -> Tier {
        if score < 0 {
            Tier::Disqualified
        } else if score >= self.config.tiers.hot {
            Tier::Hot
        } else if score >= self.config.tiers.warm {
            Tier::Warm
        } else {
            Tier::Cold
        }
    }
}

impl Default for LeadScorer {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

/// Full name, at least one charge, a positive bond amount, and a court date.
fn is_complete(record: &ArrestRecord, charges_text: &str) -> bool {
    !record.full_name.trim().is_empty()
        && !charges_text.is_empty()
        && record.total_bond_amount().is_some_and(|a| a > 0.0)
        && record.court_date().is_some()
}

#[cfg(test)]
mod tests {
    use arrest_leads_arrest_models::{Charge, County};

    use super::*;

    fn lead(amount: Option<f64>, bond_type: &str, status: CustodyStatus, charge: &str) -> ArrestRecord {
        let mut record = ArrestRecord::new(County::Lee);
        record.booking_number = "12345".to_string();
        record.full_name = "SMITH, JOHN".to_string();
        record.status = status;
        record.charges = vec![Charge {
            bond_amount: amount,
            bond_type: bond_type.to_string(),
            court_date: "2024-04-05".to_string(),
            ..Charge::new(charge)
        }];
        record
    }

    fn bond_only(amount: Option<f64>) -> (i32, Vec<String>) {
        let result = LeadScorer::default().score(&lead(amount, "", CustodyStatus::Unknown, "DUI"));
        let completeness = if amount.is_some_and(|a| a > 0.0) { 15 } else { -10 };
        (result.score - completeness, result.reasons)
    }

    #[test]
    fn bond_amount_boundaries() {
        assert_eq!(bond_only(Some(499.0)).0, -10);
        assert_eq!(bond_only(Some(500.0)).0, 30);
        assert_eq!(bond_only(Some(50_000.0)).0, 30);
        assert_eq!(bond_only(Some(50_001.0)).0, 20);
        assert_eq!(bond_only(Some(100_000.0)).0, 20);
        assert_eq!(bond_only(Some(100_001.0)).0, 10);
        assert_eq!(bond_only(Some(0.0)).0, -50);
        assert_eq!(bond_only(None).0, -50);
        assert_eq!(bond_only(Some(0.5)).0, -10);
    }

    #[test]
    fn bond_amount_reasons() {
        assert_eq!(bond_only(Some(2000.0)).1[0], "Ideal bond amount ($500-$50K)");
        assert_eq!(bond_only(None).1[0], "No bond amount");
    }

    #[test]
    fn hot_scenario_scores_ninety() {
        let result = LeadScorer::default().score(&lead(
            Some(2000.0),
            "Surety",
            CustodyStatus::InCustody,
            "DUI",
        ));
        assert_eq!(result.score, 90);
        assert_eq!(result.tier, Tier::Hot);
        assert_eq!(
            result.reasons,
            [
                "Ideal bond amount ($500-$50K)",
                "Bondable type (Cash/Surety)",
                "Currently in custody",
                "Complete data",
            ]
        );
    }

    #[test]
    fn disqualifier_is_additive() {
        let result = LeadScorer::default().score(&lead(
            Some(1000.0),
            "CASH",
            CustodyStatus::InCustody,
            "MURDER IN THE SECOND DEGREE",
        ));
        assert_eq!(result.score, -10);
        assert_eq!(result.tier, Tier::Disqualified);
        assert_eq!(result.reasons.last().map(String::as_str), Some("DISQUALIFIED: Severe charge"));
    }

    #[test]
    fn disqualifier_fires_once_for_many_terms() {
        let mut record = lead(Some(1000.0), "CASH", CustodyStatus::InCustody, "MURDER");
        record.charges.push(Charge::new("FEDERAL DETAINER"));
        assert_eq!(LeadScorer::default().score(&record).score, -10);
    }

    #[test]
    fn bond_type_rules_all_apply() {
        let result = LeadScorer::default().score(&lead(
            Some(1000.0),
            "CASH / HOLD",
            CustodyStatus::InCustody,
            "DUI",
        ));
        // 30 + 25 - 50 + 20 + 15
        assert_eq!(result.score, 40);
        assert_eq!(result.tier, Tier::Warm);
    }

    #[test]
    fn released_on_recognizance() {
        let result = LeadScorer::default().score(&lead(None, "R.O.R.", CustodyStatus::Released, "DUI"));
        // -50 - 30 - 30 - 10
        assert_eq!(result.score, -120);
        assert!(result.reasons.contains(&"Released on own recognizance".to_string()));
        assert!(result.reasons.contains(&"Already released".to_string()));
    }

    #[test]
    fn extra_disqualifiers_extend_base_set() {
        let record = lead(Some(1000.0), "CASH", CustodyStatus::InCustody, "IMMIGRATION DETAINER");
        assert_eq!(LeadScorer::default().score(&record).tier, Tier::Hot);

        let scorer = LeadScorer::default().with_extra_disqualifiers(["DETAINER".to_string()]);
        assert_eq!(scorer.score(&record).score, -10);
        assert_eq!(scorer.config().disqualifiers.terms.len(), 4);
    }

    #[test]
    fn tier_thresholds() {
        let scorer = LeadScorer::default();
        assert_eq!(scorer.tier_for(-1), Tier::Disqualified);
        assert_eq!(scorer.tier_for(0), Tier::Cold);
        assert_eq!(scorer.tier_for(39), Tier::Cold);
        assert_eq!(scorer.tier_for(40), Tier::Warm);
        assert_eq!(scorer.tier_for(69), Tier::Warm);
        assert_eq!(scorer.tier_for(70), Tier::Hot);
    }

    #[test]
    fn scoring_is_deterministic_and_pure() {
        let record = lead(Some(2000.0), "Surety", CustodyStatus::InCustody, "DUI");
        let before = record.clone();
        let scorer = LeadScorer::default();
        assert_eq!(scorer.score(&record), scorer.score(&record));
        assert_eq!(record, before);
    }

    #[test]
    fn weights_come_from_config() {
        let mut config = ScoringConfig::default();
        config.custody.in_custody = 0;
        config.tiers.hot = 100;
        let result = LeadScorer::new(config)
            .score(&lead(Some(2000.0), "Surety", CustodyStatus::InCustody, "DUI"));
        assert_eq!(result.score, 70);
        assert_eq!(result.tier, Tier::Warm);
    }
}
