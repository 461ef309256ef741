#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the arrest lead pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use arrest_leads_arrest_models::County;
use arrest_leads_cli_utils::IndicatifProgress;
use arrest_leads_database::JsonFileRecordStore;
use arrest_leads_database::paths::data_dir;
use arrest_leads_ingest::lock::LocalRunLock;
use arrest_leads_ingest::sink::{JsonLinesSink, LogSink, NotificationSink};
use arrest_leads_ingest::{HttpAdapterFactory, PipelineOrchestrator, describe, tier_counts};
use arrest_leads_ingest_models::RunOutcome;
use arrest_leads_scoring::ScoringConfig;
use arrest_leads_source::registry;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "arrest_leads_ingest", about = "Arrest booking ingestion and lead scoring")]
struct Cli {
    /// Directory holding one records file per county (default: `data/`)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Scoring weights file replacing the built-in `scoring.toml`
    #[arg(long, global = true)]
    scoring_config: Option<PathBuf>,
    /// Append notification payloads as JSON lines to this file instead of
    /// logging them
    #[arg(long, global = true)]
    outbox: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, store, and score one county's recent bookings
    Run {
        /// County id (e.g., "lee")
        county: County,
    },
    /// Run every enabled county concurrently
    RunAll,
    /// List configured counties
    Sources,
    /// Probe a booking-number range and store the bookings that exist
    Backfill {
        county: County,
        /// First booking number
        #[arg(long)]
        from: u64,
        /// Last booking number (inclusive)
        #[arg(long)]
        to: u64,
    },
    /// Re-score stored records with the current scoring config
    Rescore {
        county: County,
        /// Number of top leads to print
        #[arg(long, default_value = "10")]
        top: usize,
    },
}

fn print_outcome(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Completed(summary) | RunOutcome::Failed(summary) => {
            println!("{}", describe(summary));
        }
        RunOutcome::Skipped { county, reason } => println!("{county}: skipped ({reason})"),
    }
}

#[allow(clippy::too_many_lines)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = arrest_leads_cli_utils::init_logger();
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Sources) {
        println!("{:<12} {:<8} {:<14} NAME", "ID", "ENABLED", "TRANSPORT");
        println!("{}", "-".repeat(60));
        for config in registry::all_counties() {
            println!(
                "{:<12} {:<8} {:<14} {}",
                config.county.as_ref(),
                config.enabled,
                config.transport.kind(),
                config.name
            );
        }
        return Ok(());
    }

    let scoring = match &cli.scoring_config {
        Some(path) => {
            log::info!("Using scoring config {}", path.display());
            ScoringConfig::from_path(path)?
        }
        None => ScoringConfig::default(),
    };
    let dir = cli.data_dir.clone().unwrap_or_else(data_dir);
    log::debug!("Data directory: {}", dir.display());

    let store = Arc::new(JsonFileRecordStore::new(dir, registry::all_counties()));
    let sink: Arc<dyn NotificationSink> = match &cli.outbox {
        Some(path) => Arc::new(JsonLinesSink::new(path)),
        None => Arc::new(LogSink),
    };
    let orchestrator = PipelineOrchestrator::new(
        store,
        sink,
        Arc::new(LocalRunLock::new()),
        Arc::new(HttpAdapterFactory::new()),
    )
    .with_scoring(scoring);

    let now = chrono::Utc::now();

    match cli.command {
        Commands::Sources => {}
        Commands::Run { county } => {
            let outcome = orchestrator.run_once(county, now).await;
            print_outcome(&outcome);
            if outcome.is_failed() {
                return Err(format!("{county} run failed").into());
            }
        }
        Commands::RunAll => {
            let counties: Vec<County> = registry::all_counties()
                .into_iter()
                .filter(|c| c.enabled)
                .map(|c| c.county)
                .collect();
            log::info!(
                "Running {} county source(s): {}",
                counties.len(),
                counties
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            );

            let progress = IndicatifProgress::steps_bar(&multi, "Counties", counties.len() as u64);
            let outcomes = orchestrator.run_all(&counties, now, progress).await;
            for outcome in &outcomes {
                print_outcome(outcome);
            }
        }
        Commands::Backfill { county, from, to } => {
            if from > to {
                return Err(format!("--from {from} is after --to {to}").into());
            }
            let progress = IndicatifProgress::probe_bar(&multi, &format!("Probing {county}"));
            let outcome = orchestrator.backfill(county, from..=to, now, progress).await;
            print_outcome(&outcome);
            if outcome.is_failed() {
                return Err(format!("{county} backfill failed").into());
            }
        }
        Commands::Rescore { county, top } => {
            let scored = orchestrator.rescore(county).await?;
            let counts = tier_counts(&scored);
            println!(
                "{county}: {} record(s): {} hot, {} warm, {} cold, {} disqualified",
                scored.len(),
                counts.hot,
                counts.warm,
                counts.cold,
                counts.disqualified
            );
            for lead in scored.iter().take(top) {
                println!(
                    "{:>5} {:<13} {:<30} {}",
                    lead.score.score,
                    lead.score.tier.as_ref(),
                    lead.record.full_name,
                    lead.key.as_ref().map_or("-", |k| k.as_str())
                );
            }
        }
    }

    Ok(())
}
