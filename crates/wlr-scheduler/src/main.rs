//! `wlr`: evaluate work-log entries from the command line.
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use wlr_scheduler::{telemetry, InMemoryStore, JobFixture, JobOutcome, JudgeBackend, ReviewConfig, ReviewScheduler};

#[derive(Parser)]
#[command(name = "wlr")]
#[command(about = "Work-log integrity review", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one job fixture and print the decision record
    Evaluate {
        /// Job fixture (YAML: entry, topic, learner, corrections)
        job: PathBuf,

        /// Review configuration (YAML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Run without the semantic judge
        #[arg(long)]
        offline: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Evaluate { job, config, offline } => evaluate(job, config, offline).await,
    }
}

async fn evaluate(job: PathBuf, config: Option<PathBuf>, offline: bool) -> Result<()> {
    let mut config = match config {
        Some(path) => ReviewConfig::load(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ReviewConfig::default(),
    };
    if offline {
        config.backend = JudgeBackend::Offline;
    }
    telemetry::init(&config.log_level);

    let fixture = JobFixture::load(&job).with_context(|| format!("loading job {}", job.display()))?;
    let entry_id = fixture.entry.id;

    let store = Arc::new(InMemoryStore::new());
    store.insert(fixture.input())?;
    for correction in fixture.corrections {
        store.add_correction(correction)?;
    }

    let judge = config.build_judge();
    tracing::info!(judge = judge.name(), entry_id, "evaluating job");
    let scheduler = ReviewScheduler::new(store.clone(), judge);
    let outcome = scheduler.process(entry_id).await?;

    let output = match &outcome {
        JobOutcome::Abandoned { .. } => json!({ "entry_id": entry_id, "outcome": "abandoned" }),
        JobOutcome::Dropped => json!({ "entry_id": entry_id, "outcome": "dropped" }),
        JobOutcome::SkippedOverride => json!({ "entry_id": entry_id, "outcome": "skipped_override" }),
        other => match other.record() {
            Some(record) => serde_json::to_value(record)?,
            None => json!({ "entry_id": entry_id }),
        },
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
