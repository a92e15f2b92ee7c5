//! SEO Sweep main entry point
//!
//! This is the command-line interface for the SEO Sweep harvester.

use anyhow::Context;
use clap::Parser;
use seo_sweep::config::{compute_config_hash, parse_config, validate, Config};
use seo_sweep::output::{print_summary, write_json};
use seo_sweep::pipeline::run_with_engine;
use seo_sweep::session::launch_engine;
use seo_sweep::source::load_locations;
use seo_sweep::{RunResult, SweepError};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// SEO Sweep: harvest SEO fields from a list of pages
///
/// Loads every page in the list in both locales, extracts titles,
/// descriptions, headings, intro text and JSON-LD, and writes the run
/// result as JSON.
#[derive(Parser, Debug)]
#[command(name = "seo-sweep")]
#[command(version = "1.0.0")]
#[command(about = "Harvest SEO fields from a list of pages", long_about = None)]
struct Cli {
    /// File with one URL per line
    #[arg(value_name = "LOCATIONS")]
    locations: PathBuf,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Pages fetched at once (overrides the config file)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Per-navigation settle timeout in milliseconds (overrides the config file)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Retries per page after the first failure (overrides the config file)
    #[arg(long)]
    max_retries: Option<u32>,

    /// Where to write the JSON result (overrides the config file)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and locations, then exit without fetching
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let (config, locations) = load_inputs(&cli).context("Failed to prepare the sweep")?;

    if cli.dry_run {
        handle_dry_run(&config, &locations);
        return Ok(());
    }

    handle_sweep(config, locations, cli.quiet).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("seo_sweep=info,warn"),
            1 => EnvFilter::new("seo_sweep=debug,info"),
            2 => EnvFilter::new("seo_sweep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Resolves the configuration and reads the location list
fn load_inputs(cli: &Cli) -> Result<(Config, Vec<String>), SweepError> {
    let config = resolve_config(cli)?;
    let locations = load_locations(&cli.locations)?;
    Ok((config, locations))
}

/// Loads the config file (or defaults), applies CLI overrides, then validates
///
/// File values are only checked after overrides, so a flag can replace an
/// out-of-range value from the file.
fn resolve_config(cli: &Cli) -> Result<Config, SweepError> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let config = parse_config(path)?;
            let hash = compute_config_hash(path)?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    if let Some(concurrency) = cli.concurrency {
        config.pipeline.concurrency = concurrency;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.pipeline.timeout_ms = timeout_ms;
    }
    if let Some(max_retries) = cli.max_retries {
        config.pipeline.max_retries = max_retries;
    }
    if let Some(output) = &cli.output {
        config.output.results_path = output.display().to_string();
    }

    validate(&config)?;
    Ok(config)
}

/// Handles the --dry-run mode: shows what would be fetched
fn handle_dry_run(config: &Config, locations: &[String]) {
    println!("=== SEO Sweep Dry Run ===\n");

    println!("Pipeline:");
    println!("  Engine: {:?}", config.pipeline.engine);
    println!("  Concurrency: {}", config.pipeline.concurrency);
    println!("  Timeout: {}ms", config.pipeline.timeout_ms);
    println!("  Max retries: {}", config.pipeline.max_retries);
    println!("  Retry delay: {}ms", config.pipeline.retry_delay_ms);
    println!("  Settle grace: {}ms", config.pipeline.settle_grace_ms);

    println!("\nIdentity:");
    println!("  User agent: {}", config.identity.user_agent);
    println!("  Languages: {} / {}", config.identity.default_language, config.identity.alternate_language);

    println!("\nOutput: {}", config.output.results_path);

    println!("\nLocations ({}):", locations.len());
    for location in locations {
        println!("  - {}", location);
    }

    let windows = locations.len().div_ceil(config.pipeline.concurrency.max(1));
    println!("\n✓ Configuration is valid");
    println!("✓ Would fetch {} locations in {} windows", locations.len(), windows);
}

/// Handles the main sweep
///
/// Ctrl-C drops the run, which aborts the in-flight window; the aborted
/// attempts release their sessions in the background and the engine is
/// shut down before exiting.
async fn handle_sweep(config: Config, locations: Vec<String>, quiet: bool) -> anyhow::Result<()> {
    tracing::info!(
        "Sweeping {} locations ({} at a time, {} retries)",
        locations.len(),
        config.pipeline.concurrency,
        config.pipeline.max_retries
    );

    let engine = launch_engine(&config).await.context("Failed to start engine")?;

    let result = tokio::select! {
        result = run_with_engine(engine.clone(), &locations, &config.pipeline) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, releasing sessions and shutting down the engine");
            engine.shutdown().await;
            anyhow::bail!("sweep interrupted");
        }
    };

    persist(&result, &config, quiet).context("Failed to save the run result")?;
    Ok(())
}

/// Writes the run result and prints the summary
fn persist(result: &RunResult, config: &Config, quiet: bool) -> Result<(), SweepError> {
    write_json(result, Path::new(&config.output.results_path))?;

    if !quiet {
        print_summary(result);
    }

    Ok(())
}
