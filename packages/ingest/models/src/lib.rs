#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Pipeline run state, options, summaries, and notification payloads.

use std::time::Duration;

use arrest_leads_arrest_models::{County, CustodyStatus, Tier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use uuid::Uuid;

/// Stage of a single county run.
///
/// Runs move forward through the stages in declaration order; `Failed` is
/// reachable from any of them.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    #[default]
    Idle,
    Fetching,
    Normalizing,
    Deduplicating,
    Scoring,
    Dispatching,
    Done,
    Failed,
}

impl RunState {
    /// Whether the run has finished, successfully or not.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Why a run did no work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    /// Another run holds the county's lock.
    LockHeld,
    /// The county is disabled in its source config.
    Disabled,
}

/// Tunables for the orchestrator. Every value is fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Longest wait for the county lock before the run is skipped.
    pub lock_timeout: Duration,
    /// Wall-clock budget for one run. Work stops at the next record
    /// boundary once it is spent.
    pub run_budget: Duration,
    /// Weakest tier that is dispatched.
    pub min_notify_tier: Tier,
    pub max_notifications_per_run: usize,
    /// Whether updated records notify, not just newly inserted ones.
    pub notify_on_update: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(30),
            run_budget: Duration::from_secs(300),
            min_notify_tier: Tier::Hot,
            max_notifications_per_run: 10,
            notify_on_update: false,
        }
    }
}

/// Per-tier counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    pub hot: u64,
    pub warm: u64,
    pub cold: u64,
    pub disqualified: u64,
}

impl TierCounts {
    pub const fn record(&mut self, tier: Tier) {
        match tier {
            Tier::Hot => self.hot += 1,
            Tier::Warm => self.warm += 1,
            Tier::Cold => self.cold += 1,
            Tier::Disqualified => self.disqualified += 1,
        }
    }

    #[must_use]
    pub const fn total(&self) -> u64 {
        self.hot + self.warm + self.cold + self.disqualified
    }
}

impl FromIterator<Tier> for TierCounts {
    fn from_iter<I: IntoIterator<Item = Tier>>(iter: I) -> Self {
        let mut counts = Self::default();
        for tier in iter {
            counts.record(tier);
        }
        counts
    }
}

/// End-of-run counters. Always produced, even for a failed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: Uuid,
    pub county: County,
    pub started_at: DateTime<Utc>,
    pub fetched: u64,
    pub normalized: u64,
    pub skipped_malformed: u64,
    pub inserted: u64,
    pub updated: u64,
    pub skipped_duplicate: u64,
    pub scored: TierCounts,
    pub dispatch_failures: u64,
    pub notifications_sent: u64,
    pub notifications_suppressed: u64,
    /// The source refused the fetch (anti-bot page, rejected session).
    pub blocked: bool,
    pub budget_exceeded: bool,
    pub final_state: RunState,
    /// Run-fatal error message, when `final_state` is `Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_secs: f64,
}

impl RunSummary {
    /// A zeroed summary for a run starting at `started_at`.
    #[must_use]
    pub fn new(county: County, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            county,
            started_at,
            fetched: 0,
            normalized: 0,
            skipped_malformed: 0,
            inserted: 0,
            updated: 0,
            skipped_duplicate: 0,
            scored: TierCounts::default(),
            dispatch_failures: 0,
            notifications_sent: 0,
            notifications_suppressed: 0,
            blocked: false,
            budget_exceeded: false,
            final_state: RunState::Idle,
            error: None,
            elapsed_secs: 0.0,
        }
    }

    /// Moves to `state`.
    pub fn enter(&mut self, state: RunState) {
        log::trace!("{} run {}: {} -> {state}", self.county, self.run_id, self.final_state);
        self.final_state = state;
    }
}

/// Result of asking for one county run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed(RunSummary),
    /// No work was done. Not an error.
    Skipped { county: County, reason: SkipReason },
    /// A run-fatal error; the summary still carries the counters reached.
    Failed(RunSummary),
}

impl RunOutcome {
    #[must_use]
    pub const fn county(&self) -> County {
        match self {
            Self::Completed(summary) | Self::Failed(summary) => summary.county,
            Self::Skipped { county, .. } => *county,
        }
    }

    #[must_use]
    pub const fn summary(&self) -> Option<&RunSummary> {
        match self {
            Self::Completed(summary) | Self::Failed(summary) => Some(summary),
            Self::Skipped { .. } => None,
        }
    }

    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

// ── Notifications ─────────────────────────────────────────────────────

/// A people-search link for a lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchLink {
    pub label: String,
    pub url: String,
}

/// Short human-readable lines describing a lead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlights {
    /// First charge, plus `(+N more)` when there are others.
    pub charges: String,
    /// `type · $amount · Paid: date`, blanks omitted.
    pub bond: String,
    /// `#case · date · time · location`, blanks omitted.
    pub court: String,
    pub custody: CustodyStatus,
    /// Configured key-charge terms found in the charges.
    pub key_charges: Vec<String>,
    /// One-line residence.
    pub address: String,
}

/// Structured message handed to a notification sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub run_id: Uuid,
    pub county: County,
    pub booking_number: String,
    pub natural_key: String,
    pub full_name: String,
    pub score: i32,
    pub tier: Tier,
    pub reasons: Vec<String>,
    pub highlights: Highlights,
    pub detail_url: String,
    pub mugshot_url: String,
    pub search_links: Vec<SearchLink>,
}
