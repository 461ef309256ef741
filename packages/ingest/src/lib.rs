#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Arrest lead pipeline.
//!
//! [`PipelineOrchestrator::run_once`] drives one county through
//! fetch, normalize, deduplicate, score, and dispatch under a per-county
//! [`RunLock`]. One bad block is skipped and counted; a notification
//! failure is logged and counted. Only an unreachable source or a failed
//! store write ends a run early, and even then a [`RunSummary`] with the
//! counters reached so far is returned.

pub mod lock;
pub mod payload;
pub mod sink;

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Instant;

use arrest_leads_arrest_models::{ArrestRecord, County, LeadScore};
use arrest_leads_database::{RecordStore, StoreError};
use arrest_leads_dedup::{DeduplicationStore, NaturalKey, UpsertAction, natural_key};
use arrest_leads_ingest_models::{
    PipelineOptions, RunOutcome, RunState, RunSummary, SkipReason, TierCounts,
};
use arrest_leads_scoring::{LeadScorer, ScoringConfig};
use arrest_leads_source::progress::ProgressCallback;
use arrest_leads_source::rate_limit::HostRateLimiter;
use arrest_leads_source::{SourceAdapter, SourceError, build_adapter};
use arrest_leads_source_models::{FetchOutcome, FetchWindow, SourceAdapterConfig};
use chrono::{DateTime, Utc};

use crate::lock::RunLock;
use crate::sink::NotificationSink;

/// Errors that end a run early.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The source could not be reached after all retries.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// The record store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Builds the adapter for a county's config.
pub trait AdapterFactory: Send + Sync {
    /// # Errors
    ///
    /// Returns [`SourceError`] if the adapter cannot be constructed.
    fn build(&self, config: &SourceAdapterConfig) -> Result<Box<dyn SourceAdapter>, SourceError>;
}

/// Builds real HTTP adapters sharing one per-host rate limiter.
#[derive(Debug, Default)]
pub struct HttpAdapterFactory {
    limiter: Arc<HostRateLimiter>,
}

impl HttpAdapterFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AdapterFactory for HttpAdapterFactory {
    fn build(&self, config: &SourceAdapterConfig) -> Result<Box<dyn SourceAdapter>, SourceError> {
        build_adapter(config, self.limiter.clone())
    }
}

/// What a run fetches.
enum FetchMode {
    /// The county's lookback window. Qualifying leads notify.
    Recent,
    /// A booking-number range. Never notifies.
    Backfill(RangeInclusive<u64>, Arc<dyn ProgressCallback>),
}

/// A stored record with its fresh score.
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    pub key: Option<NaturalKey>,
    pub record: ArrestRecord,
    pub score: LeadScore,
}

/// A newly inserted or updated record waiting for dispatch.
struct Candidate {
    key: NaturalKey,
    record: ArrestRecord,
    score: LeadScore,
}

/// Runs the pipeline for one or more counties.
pub struct PipelineOrchestrator {
    store: Arc<dyn RecordStore>,
    sink: Arc<dyn NotificationSink>,
    lock: Arc<dyn RunLock>,
    adapters: Arc<dyn AdapterFactory>,
    scoring: ScoringConfig,
    options: PipelineOptions,
}

impl PipelineOrchestrator {
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        sink: Arc<dyn NotificationSink>,
        lock: Arc<dyn RunLock>,
        adapters: Arc<dyn AdapterFactory>,
    ) -> Self {
        Self {
            store,
            sink,
            lock,
            adapters,
            scoring: ScoringConfig::default(),
            options: PipelineOptions::default(),
        }
    }

    #[must_use]
    pub fn with_scoring(mut self, scoring: ScoringConfig) -> Self {
        self.scoring = scoring;
        self
    }

    #[must_use]
    pub const fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub const fn options(&self) -> &PipelineOptions {
        &self.options
    }

    fn scorer_for(&self, config: &SourceAdapterConfig) -> LeadScorer {
        LeadScorer::new(self.scoring.clone())
            .with_extra_disqualifiers(config.extra_disqualifiers.iter().cloned())
    }

    /// Runs one county's recent bookings through the pipeline.
    ///
    /// `now` fixes the fetch window and the records' `scraped_at`.
    pub async fn run_once(&self, county: County, now: DateTime<Utc>) -> RunOutcome {
        self.run(county, now, FetchMode::Recent).await
    }

    /// Runs every county in `counties` concurrently. A failure in one county
    /// does not affect the others.
    pub async fn run_all(
        &self,
        counties: &[County],
        now: DateTime<Utc>,
        progress: Arc<dyn ProgressCallback>,
    ) -> Vec<RunOutcome> {
        progress.set_total(counties.len() as u64);
        let runs = counties.iter().map(|&county| {
            let progress = progress.clone();
            async move {
                let outcome = self.run_once(county, now).await;
                progress.set_message(format!("{} finished", county.display_name()));
                progress.inc(1);
                outcome
            }
        });
        let outcomes = futures::future::join_all(runs).await;

        let failed = outcomes.iter().filter(|o| o.is_failed()).count();
        progress.finish(format!("{} county run(s), {failed} failed", outcomes.len()));
        outcomes
    }

    /// Probes a booking-number range and stores what exists. Backfilled
    /// records are scored but never notify.
    pub async fn backfill(
        &self,
        county: County,
        range: RangeInclusive<u64>,
        now: DateTime<Utc>,
        progress: Arc<dyn ProgressCallback>,
    ) -> RunOutcome {
        self.run(county, now, FetchMode::Backfill(range, progress)).await
    }

    /// Re-scores every stored record for `county` with the current scoring
    /// config, strongest first. Stored records are not modified.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Store`] if the records or config cannot be read.
    pub async fn rescore(&self, county: County) -> Result<Vec<ScoredRecord>, RunError> {
        let config = self.store.load_config(county).await?;
        let scorer = self.scorer_for(&config);

        let mut scored: Vec<ScoredRecord> = self
            .store
            .load_records(county)
            .await?
            .into_iter()
            .map(|record| ScoredRecord {
                key: natural_key(county, &record),
                score: scorer.score(&record),
                record,
            })
            .collect();
        scored.sort_by(|a, b| b.score.score.cmp(&a.score.score));

        let counts: TierCounts = scored.iter().map(|s| s.score.tier).collect();
        log::info!(
            "{county}: rescored {} record(s): {} hot, {} warm, {} cold, {} disqualified",
            scored.len(),
            counts.hot,
            counts.warm,
            counts.cold,
            counts.disqualified
        );
        Ok(scored)
    }

    async fn run(&self, county: County, now: DateTime<Utc>, mode: FetchMode) -> RunOutcome {
        let started = Instant::now();
        let mut summary = RunSummary::new(county, now);

        let config = match self.store.load_config(county).await {
            Ok(config) => config,
            Err(e) => return finish(summary, started, Err(e.into())),
        };
        if !config.enabled {
            log::info!("{county}: source is disabled, skipping");
            return RunOutcome::Skipped {
                county,
                reason: SkipReason::Disabled,
            };
        }

        let scope = county.to_string();
        if !self.lock.try_acquire(&scope, self.options.lock_timeout).await {
            log::info!("{county}: another run is active, skipping");
            return RunOutcome::Skipped {
                county,
                reason: SkipReason::LockHeld,
            };
        }

        log::info!("{county}: run {} started", summary.run_id);
        let result = self
            .execute(&config, now, mode, started, &mut summary)
            .await;
        self.lock.release(&scope).await;

        finish(summary, started, result)
    }

    async fn execute(
        &self,
        config: &SourceAdapterConfig,
        now: DateTime<Utc>,
        mode: FetchMode,
        started: Instant,
        summary: &mut RunSummary,
    ) -> Result<(), RunError> {
        let county = config.county;
        let over_budget = || started.elapsed() >= self.options.run_budget;

        // ── Fetching ──────────────────────────────────────────────────
        summary.enter(RunState::Fetching);
        let adapter = self.adapters.build(config)?;
        let remaining = self.options.run_budget.saturating_sub(started.elapsed());
        let notify = matches!(mode, FetchMode::Recent);
        let fetch = async {
            match mode {
                FetchMode::Recent => {
                    let window = FetchWindow::ending(now.date_naive(), config.lookback_days);
                    adapter.fetch_recent_records(&window).await
                }
                FetchMode::Backfill(range, progress) => adapter.probe_bookings(range, progress).await,
            }
        };
        let outcome = match tokio::time::timeout(remaining, fetch).await {
            Ok(result) => result?,
            Err(_) => {
                log::warn!("{county}: run budget spent while fetching");
                summary.budget_exceeded = true;
                FetchOutcome::default()
            }
        };

        summary.blocked = outcome.blocked;
        if outcome.blocked {
            log::warn!("{county}: source blocked the fetch; no records this run");
        }
        summary.fetched = outcome.blocks.len() as u64;

        // ── Normalizing ───────────────────────────────────────────────
        summary.enter(RunState::Normalizing);
        let mut records = Vec::with_capacity(outcome.blocks.len());
        for block in &outcome.blocks {
            match arrest_leads_normalize::normalize(block, county, &config.home_state) {
                Ok(Some(mut record)) => {
                    record.scraped_at = Some(now);
                    records.push(record);
                }
                Ok(None) => summary.skipped_malformed += 1,
                Err(e) => {
                    log::debug!("{county}: skipping malformed block: {e}");
                    summary.skipped_malformed += 1;
                }
            }
        }
        summary.normalized = records.len() as u64;

        // ── Deduplicating ─────────────────────────────────────────────
        summary.enter(RunState::Deduplicating);
        let mut dedup = DeduplicationStore::open(self.store.clone(), county).await?;
        let mut changed = Vec::new();
        let mut unchanged = Vec::new();
        for record in records {
            if over_budget() {
                log::warn!("{county}: run budget spent; stopping after {} record(s)", changed.len() + unchanged.len());
                summary.budget_exceeded = true;
                break;
            }
            let Some(key) = natural_key(county, &record) else {
                summary.skipped_malformed += 1;
                continue;
            };
            let upserted = dedup.upsert(&key, &record).await?;
            match upserted.action {
                UpsertAction::Inserted => {
                    summary.inserted += 1;
                    changed.push((key, upserted.stored, true));
                }
                UpsertAction::Updated => {
                    summary.updated += 1;
                    changed.push((key, upserted.stored, false));
                }
                UpsertAction::Skipped => {
                    summary.skipped_duplicate += 1;
                    unchanged.push(upserted.stored);
                }
            }
        }

        // ── Scoring ───────────────────────────────────────────────────
        summary.enter(RunState::Scoring);
        let scorer = self.scorer_for(config);
        for record in &unchanged {
            summary.scored.record(scorer.score(record).tier);
        }
        let mut candidates = Vec::new();
        for (key, record, inserted) in changed {
            let score = scorer.score(&record);
            summary.scored.record(score.tier);
            if notify
                && (inserted || self.options.notify_on_update)
                && score.tier.meets(self.options.min_notify_tier)
            {
                candidates.push(Candidate { key, record, score });
            }
        }

        // ── Dispatching ───────────────────────────────────────────────
        summary.enter(RunState::Dispatching);
        self.dispatch(county, candidates, summary).await;

        Ok(())
    }

    /// Sends the strongest candidates, up to the per-run cap.
    async fn dispatch(&self, county: County, mut candidates: Vec<Candidate>, summary: &mut RunSummary) {
        candidates.sort_by(|a, b| b.score.score.cmp(&a.score.score));
        let cap = self.options.max_notifications_per_run;
        if candidates.len() > cap {
            summary.notifications_suppressed = (candidates.len() - cap) as u64;
            log::info!(
                "{county}: {} lead(s) over the per-run cap of {cap} were not sent",
                summary.notifications_suppressed
            );
            candidates.truncate(cap);
        }

        for candidate in &candidates {
            let payload = payload::build_payload(
                summary.run_id,
                county,
                &candidate.key,
                &candidate.record,
                &candidate.score,
                &self.scoring.key_charges,
            );
            match self.sink.notify(&payload).await {
                Ok(()) => summary.notifications_sent += 1,
                Err(e) => {
                    log::error!("{county}: notification for {} failed: {e}", candidate.key);
                    summary.dispatch_failures += 1;
                }
            }
        }
    }
}

/// Stamps the terminal state and elapsed time and logs the summary.
fn finish(mut summary: RunSummary, started: Instant, result: Result<(), RunError>) -> RunOutcome {
    summary.elapsed_secs = started.elapsed().as_secs_f64();
    match result {
        Ok(()) => {
            summary.enter(RunState::Done);
            log::info!("{}", describe(&summary));
            RunOutcome::Completed(summary)
        }
        Err(e) => {
            log::error!("{}: run failed while {}: {e}", summary.county, summary.final_state);
            summary.error = Some(e.to_string());
            summary.enter(RunState::Failed);
            log::info!("{}", describe(&summary));
            RunOutcome::Failed(summary)
        }
    }
}

/// One-line human summary of a run.
#[must_use]
pub fn describe(summary: &RunSummary) -> String {
    let mut line = format!(
        "{}: {} fetched, {} normalized, {} malformed, {} inserted, {} updated, {} unchanged; \
         tiers {}/{}/{}/{} (hot/warm/cold/disq); {} sent, {} suppressed, {} failed; {:.1}s",
        summary.county,
        summary.fetched,
        summary.normalized,
        summary.skipped_malformed,
        summary.inserted,
        summary.updated,
        summary.skipped_duplicate,
        summary.scored.hot,
        summary.scored.warm,
        summary.scored.cold,
        summary.scored.disqualified,
        summary.notifications_sent,
        summary.notifications_suppressed,
        summary.dispatch_failures,
        summary.elapsed_secs,
    );
    if summary.blocked {
        line.push_str(" [blocked]");
    }
    if summary.budget_exceeded {
        line.push_str(" [budget exceeded]");
    }
    if let Some(error) = &summary.error {
        line.push_str(&format!(" [failed: {error}]"));
    }
    line
}

/// Tier counts of a rescore.
#[must_use]
pub fn tier_counts(scored: &[ScoredRecord]) -> TierCounts {
    scored.iter().map(|s| s.score.tier).collect()
}
