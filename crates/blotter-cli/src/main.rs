//! Blotter CLI - Daily transcript extraction runs
//!
//! Usage:
//!   blotter run <input-dir>
//!   blotter run <input-dir> --date 2026-08-30 --no-model
//!   blotter vocab

mod ingest;
mod sink;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::{Days, Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use blotter_core::{AppConfig, RecordSink, SinkFormat};
use blotter_extract::{ExtractionPipeline, KeywordVocabulary};
use blotter_llm::{ModelExtractor, OpenRouterClient};

use crate::sink::{CsvSink, JsonlSink};

#[derive(Parser)]
#[command(name = "blotter")]
#[command(about = "Extracts incident addresses and keywords from daily scanner transcripts")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process one day of transcript batches
    Run {
        /// Directory of JSON batch files
        input: PathBuf,

        /// Target date (defaults to yesterday)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Output file (overrides config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format: csv or jsonl (overrides config)
        #[arg(long)]
        format: Option<SinkFormat>,

        /// Skip the model fallback stage
        #[arg(long)]
        no_model: bool,
    },
    /// Print the effective keyword vocabulary
    Vocab,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    Ok(config)
}

fn build_vocabulary(config: &AppConfig) -> anyhow::Result<KeywordVocabulary> {
    let vocabulary = match &config.vocabulary {
        Some(keywords) => KeywordVocabulary::new(keywords.iter().cloned()),
        None => KeywordVocabulary::default(),
    };
    if vocabulary.is_empty() {
        bail!("keyword vocabulary is empty; nothing to prefilter against");
    }
    Ok(vocabulary)
}

async fn run(config: AppConfig, input: PathBuf, date: Option<NaiveDate>) -> anyhow::Result<()> {
    let vocabulary = build_vocabulary(&config)?;

    let target_date = match date {
        Some(date) => date,
        None => Local::now()
            .date_naive()
            .checked_sub_days(Days::new(1))
            .context("date arithmetic failed")?,
    };

    let raw = ingest::load_batches(&input)?;
    info!(total = raw.len(), "loaded transcript records");

    let (records, dropped) = ingest::filter_to_date(raw, target_date);
    info!(
        date = %target_date,
        kept = records.len(),
        dropped_unparseable = dropped,
        "filtered to target date"
    );
    if records.is_empty() {
        info!("no records for the target date; nothing to do");
        return Ok(());
    }

    let mut pipeline = ExtractionPipeline::new(vocabulary.clone());
    if config.llm.enabled {
        let client = OpenRouterClient::from_config(&config.llm)?;
        let extractor = ModelExtractor::new(
            Arc::new(client),
            vocabulary.keywords().to_vec(),
        );
        pipeline = pipeline.with_fallback(
            Arc::new(extractor),
            config.pipeline.max_model_concurrency,
            Duration::from_secs(config.llm.timeout_secs),
        );
        info!(model = %config.llm.model, "model fallback enabled");
    } else {
        info!("model fallback disabled; deterministic stages only");
    }

    let started = std::time::Instant::now();
    let (results, summary) = pipeline.process_batch(&records).await;

    let sink: Box<dyn RecordSink> = match config.sink.format {
        SinkFormat::Csv => Box::new(CsvSink::new(&config.sink.path)),
        SinkFormat::Jsonl => Box::new(JsonlSink::new(&config.sink.path)),
    };
    for chunk in results.chunks(config.pipeline.sink_batch_size.max(1)) {
        sink.append(chunk).await?;
    }

    info!(
        %summary,
        sink = sink.name(),
        output = %config.sink.path.display(),
        elapsed_secs = started.elapsed().as_secs_f64(),
        "batch complete"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_ref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .init();

    match cli.command {
        Commands::Run {
            input,
            date,
            output,
            format,
            no_model,
        } => {
            if let Some(output) = output {
                config.sink.path = output;
            }
            if let Some(format) = format {
                config.sink.format = format;
            }
            if no_model {
                config.llm.enabled = false;
            }
            config.validate()?;

            run(config, input, date).await
        }
        Commands::Vocab => {
            let vocabulary = build_vocabulary(&config)?;
            for keyword in vocabulary.keywords() {
                println!("{keyword}");
            }
            Ok(())
        }
    }
}
