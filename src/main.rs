//! # news_ingest
//!
//! One ingestion pass over every configured outlet:
//!
//! 1. **Config**: load the outlets file and check the output directory
//! 2. **Ingest**: feeds, article extraction, dedup, JSONL append
//! 3. **Report**: print the summary and any errors
//!
//! ## Usage
//!
//! ```sh
//! news_ingest --config data/outlets.json --out data/raw --discover
//! ```
//!
//! Exits with status 1 when any outlet or feed reported an error, even though
//! everything that could be ingested was written. Meant to be invoked
//! periodically by an external scheduler.

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;

use cli::Cli;
use news_ingest::error::ConfigError;
use news_ingest::utils::ensure_writable_dir;
use news_ingest::{IngestConfig, OutletsConfig, run_ingestion};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_ingest starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let outlets = match OutletsConfig::load(&args.config) {
        Ok(config) => config.into_outlets(),
        Err(e) => {
            error!(error = %e, "Cannot load outlets config");
            return Err(e.into());
        }
    };

    // Early check: output dir must be writable before any fetch happens
    if let Err(source) = ensure_writable_dir(&args.out) {
        let e = ConfigError::OutputDir {
            path: args.out.clone(),
            source,
        };
        error!(error = %e, "Output directory is not writable (fix perms or choose a different path)");
        return Err(e.into());
    }

    let mut config = IngestConfig::new(outlets, args.out.clone(), args.cache.clone());
    config.metrics_path = Some(args.metrics.clone());
    config.discover = args.discover;
    config.fetch = args.fetch_config();
    config.article_concurrency = args.article_concurrency;

    let report = match run_ingestion(&config).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Ingestion aborted");
            return Err(e.into());
        }
    };

    let elapsed = start_time.elapsed();
    info!(
        total = report.total(),
        errors = report.errors().count(),
        elapsed_secs = elapsed.as_secs_f64(),
        "news_ingest finished"
    );

    println!("{report}");
    if report.has_errors() {
        warn!("Run completed with errors");
        std::process::exit(1);
    }
    Ok(())
}
