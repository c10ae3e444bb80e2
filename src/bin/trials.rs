//! Trials index CLI
//!
//! Semantic search over a JSONL file of clinical trial records.

use anyhow::Context;
use clap::{Parser, Subcommand};
use percolate_trials::{IndexConfig, JsonlRecordStore, SemanticIndex, TrialRecord};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Trials index CLI - semantic search over clinical trial records
#[derive(Parser)]
#[command(name = "trials")]
#[command(about = "Semantic vector index over clinical trial records", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON config file (environment variables apply on top)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Index directory (overrides P8_TRIALS_INDEX)
    #[arg(long, global = true)]
    index: Option<PathBuf>,

    /// JSONL record file (overrides P8_TRIALS_RECORDS)
    #[arg(long, global = true)]
    records: Option<PathBuf>,

    /// Embedding provider, e.g. hashing:384 or local:all-MiniLM-L6-v2
    #[arg(long, global = true)]
    embedding: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true, env = "P8_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the index, building it from the record file if needed
    Init,

    /// Add a trial record and index it
    Add {
        /// Trial record as JSON
        json: String,
    },

    /// Semantic search
    Search {
        /// Search query
        query: String,

        /// Number of results (default from config)
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Rebuild the index from every record
    Refresh,

    /// Show index statistics
    Stats,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Logs go to stderr so stdout stays valid JSON
    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<IndexConfig> {
    let base = match &cli.config {
        Some(path) => IndexConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => IndexConfig::default(),
    };
    let mut config = base.with_env_overrides().context("Invalid environment")?;

    if let Some(index) = &cli.index {
        config.store_path = index.clone();
    }
    if let Some(records) = &cli.records {
        config.records_path = Some(records.clone());
    }
    if let Some(embedding) = &cli.embedding {
        config.embedding = embedding.clone();
    }
    config.validate()?;
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let config = load_config(&cli)?;
    let records_path = config
        .resolved_records_path()
        .context("No record file: pass --records or set P8_TRIALS_RECORDS")?;
    let records = Arc::new(JsonlRecordStore::new(records_path));

    let index = SemanticIndex::from_config(&config, records.clone())
        .context("Failed to create semantic index")?;

    match cli.command {
        Commands::Init => {
            let report = index.initialize().await?;
            print_json(&report)?;
        }
        Commands::Add { json } => {
            let record: TrialRecord =
                serde_json::from_str(&json).context("Invalid trial record JSON")?;
            records
                .append(&record)
                .await
                .context("Failed to store record")?;
            let report = index.on_record_created(&record).await?;
            print_json(&report)?;
        }
        Commands::Search { query, top_k } => {
            let k = top_k.unwrap_or(config.default_top_k);
            let matches = index.query(&query, k).await?;
            print_json(&matches)?;
        }
        Commands::Refresh => {
            let report = index.refresh_all().await?;
            print_json(&report)?;
        }
        Commands::Stats => {
            index.initialize().await?;
            print_json(&index.stats().await)?;
        }
    }

    index.flush().await.context("Failed to persist index")?;
    Ok(())
}
