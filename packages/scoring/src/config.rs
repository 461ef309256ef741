//! Scoring weights and thresholds.
//!
//! The defaults are embedded from `scoring.toml` at compile time; a
//! replacement file can be loaded at run time with [`ScoringConfig::from_path`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ScoringError;

const DEFAULT_TOML: &str = include_str!("../scoring.toml");

/// Bond amount bands. `[ideal_min, ideal_max]`, `(ideal_max, high_max]`,
/// `> high_max`, `(0, ideal_min)`, and zero-or-absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondAmountWeights {
    pub ideal_min: f64,
    pub ideal_max: f64,
    pub high_max: f64,
    pub ideal: i32,
    pub high: i32,
    pub very_high: i32,
    pub low: i32,
    pub missing: i32,
}

/// Substring rules on the bond type. Every matching group applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondTypeWeights {
    pub bondable_terms: Vec<String>,
    pub bondable: i32,
    pub not_bondable_terms: Vec<String>,
    pub not_bondable: i32,
    pub recognizance_terms: Vec<String>,
    pub recognizance: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodyWeights {
    pub in_custody: i32,
    pub released: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletenessWeights {
    pub complete: i32,
    pub incomplete: i32,
}

/// Charge terms that disqualify a lead, and the penalty applied once when
/// any of them appears.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disqualifiers {
    pub terms: Vec<String>,
    pub penalty: i32,
}

/// Minimum scores for Hot and Warm. Anything below zero is Disqualified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub hot: i32,
    pub warm: i32,
}

/// Complete scoring configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Charge terms highlighted in notifications. Not used for scoring.
    #[serde(default)]
    pub key_charges: Vec<String>,
    pub bond_amount: BondAmountWeights,
    pub bond_type: BondTypeWeights,
    pub custody: CustodyWeights,
    pub completeness: CompletenessWeights,
    pub disqualifiers: Disqualifiers,
    pub tiers: TierThresholds,
}

impl ScoringConfig {
    /// Parses a scoring configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::Toml`] if the document is malformed.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ScoringError> {
        Ok(toml::de::from_str(toml_str)?)
    }

    /// Reads and parses a scoring configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::Io`] if the file cannot be read, or
    /// [`ScoringError::Toml`] if it is malformed.
    pub fn from_path(path: &Path) -> Result<Self, ScoringError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ScoringError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }
}

impl Default for ScoringConfig {
    /// The embedded `scoring.toml`.
    ///
    /// # Panics
    ///
    /// Panics if the embedded document is malformed; the tests below make
    /// that a build-time failure in practice.
    fn default() -> Self {
        Self::from_toml_str(DEFAULT_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse embedded scoring.toml: {e}"))
    }
}
