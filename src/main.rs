//! Keyword-Probe main entry point
//!
//! This is the command-line interface for the Keyword-Probe URL checker.

use anyhow::Context;
use clap::Parser;
use keyword_probe::config::{load_config_with_hash, validate, ProbeConfig};
use keyword_probe::output::print_report;
use keyword_probe::probe::{HttpFetcher, Pipeline};
use keyword_probe::{EXIT_FATAL, EXIT_INTERRUPTED, EXIT_OK};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Keyword-Probe: find which URLs serve content containing a keyword
///
/// Every valid URL in the input file is fetched concurrently. URLs whose
/// content contains the keyword (case-insensitive) are appended to the output
/// file as soon as they are found, so an interrupted run keeps what it found.
#[derive(Parser, Debug)]
#[command(name = "keyword-probe")]
#[command(version)]
#[command(about = "Find which URLs serve content containing a keyword", long_about = None)]
struct Cli {
    /// Text file with one candidate URL per line
    #[arg(value_name = "INPUT_FILE")]
    input: PathBuf,

    /// File that receives matching URLs (truncated at start)
    #[arg(value_name = "OUTPUT_FILE")]
    output: PathBuf,

    /// Keyword to search for, case-insensitive
    #[arg(value_name = "KEYWORD")]
    keyword: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum number of fetches in flight at once
    #[arg(long, value_name = "N")]
    concurrency: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Extra attempts for timeouts and network errors
    #[arg(long, value_name = "N")]
    retries: Option<u32>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut pipeline = match build_pipeline(&cli) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            tracing::error!("{:#}", e);
            return ExitCode::from(EXIT_FATAL);
        }
    };

    let cancel = pipeline.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight checks and flushing results");
            cancel.cancel();
        }
    });

    match pipeline.run(&cli.input, &cli.output, &cli.keyword).await {
        Ok(report) => {
            report.log_summary();
            if !cli.quiet {
                print_report(&report);
            }
            if report.interrupted {
                ExitCode::from(EXIT_INTERRUPTED)
            } else {
                ExitCode::from(EXIT_OK)
            }
        }
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG` takes precedence when set.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if quiet {
            EnvFilter::new("error")
        } else {
            match verbose {
                0 => EnvFilter::new("keyword_probe=info,warn"),
                1 => EnvFilter::new("keyword_probe=debug,info"),
                2 => EnvFilter::new("keyword_probe=trace,debug"),
                _ => EnvFilter::new("trace"),
            }
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads settings, applies CLI overrides, and builds the pipeline
fn build_pipeline(cli: &Cli) -> anyhow::Result<Pipeline> {
    let config = load_settings(cli)?;

    tracing::info!(
        "Max concurrent fetches: {}, timeout: {}s, retries: {}",
        config.pipeline.max_concurrent_fetches,
        config.fetch.timeout_secs,
        config.pipeline.max_retries
    );

    let fetcher = HttpFetcher::new(&config.fetch).context("Failed to build HTTP client")?;
    Ok(Pipeline::new(Arc::new(fetcher), config.pipeline))
}

fn load_settings(cli: &Cli) -> anyhow::Result<ProbeConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path).with_context(|| {
                format!("Failed to load configuration from {}", path.display())
            })?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => ProbeConfig::default(),
    };

    if let Some(concurrency) = cli.concurrency {
        config.pipeline.max_concurrent_fetches = concurrency;
    }
    if let Some(timeout) = cli.timeout {
        config.fetch.timeout_secs = timeout;
        config.fetch.connect_timeout_secs = config.fetch.connect_timeout_secs.min(timeout);
    }
    if let Some(retries) = cli.retries {
        config.pipeline.max_retries = retries;
    }

    validate(&config).context("Invalid settings")?;
    Ok(config)
}
