//! Operator CLI for the AirSense evaluation engine.
//!
//! Runs evaluation cycles over a JSON file of raw device records and
//! prints the resulting bundles, one JSON document per device. Useful for
//! replaying captured payloads against the engine without the transport
//! and persistence collaborators.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use tracing::warn;

use airsense_core::{EngineConfig, UseCase};
use airsense_eval::Evaluator;

/// Replay raw device records through the evaluation engine.
#[derive(Parser, Debug)]
#[command(name = "airsense")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON file: an object mapping device ids to raw attribute maps.
    input: PathBuf,

    /// Remote inference endpoint, e.g. http://localhost:8000.
    /// Omit to run heuristics only.
    #[arg(long)]
    endpoint: Option<String>,

    /// Per-call inference timeout in seconds.
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Enable remote health-index calls (disabled by default).
    #[arg(long)]
    remote_health: bool,

    /// Number of cycles to run over the same file.
    #[arg(long, default_value_t = 1)]
    cycles: u32,

    /// Pause between cycles in seconds.
    #[arg(long, default_value_t = 0)]
    interval: u64,

    /// Pretty-print output bundles.
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = EngineConfig::default();
    config.inference.endpoint = args.endpoint;
    config.inference.timeout_secs = args.timeout;
    if args.remote_health {
        config.inference = config
            .inference
            .with_use_case_enabled(UseCase::HealthIndex, true);
    }

    let evaluator = Evaluator::new(config).context("building evaluator")?;

    let text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let devices: Value = serde_json::from_str(&text).context("parsing input JSON")?;
    let devices = devices
        .as_object()
        .context("input must be an object mapping device ids to records")?
        .clone();

    for cycle in 0..args.cycles {
        if cycle > 0 && args.interval > 0 {
            tokio::time::sleep(Duration::from_secs(args.interval)).await;
        }
        let records: Vec<(String, Value)> = devices
            .iter()
            .map(|(id, raw)| (id.clone(), raw.clone()))
            .collect();
        for result in evaluator.evaluate_cycle(records).await {
            match result {
                Ok(bundle) => {
                    let rendered = if args.pretty {
                        serde_json::to_string_pretty(&bundle)?
                    } else {
                        serde_json::to_string(&bundle)?
                    };
                    println!("{rendered}");
                }
                Err(e) => warn!("device skipped: {e}"),
            }
        }
    }
    Ok(())
}
