//! SEO Sweep: a bounded-concurrency SEO field harvester
//!
//! This crate fetches a list of pages through a browser-like engine, extracts
//! titles, descriptions, headings, intro text and structured data in two
//! locales, and aggregates per-page outcomes into a single run result.

pub mod config;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod session;
pub mod source;

use thiserror::Error;

/// Main error type for SEO Sweep operations
///
/// Per-page fetch faults never show up here: they are reported as data in
/// [`RunResult::failures`]. Only faults that prevent the run as a whole
/// reach the caller.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Location source error: {0}")]
    Source(#[from] source::SourceError),

    #[error("Browser engine could not be started: {0}")]
    EngineSetup(String),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for SEO Sweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, PipelineConfig};
pub use extract::{extract, ExtractionRecord, LocalizedField};
pub use pipeline::{aggregate, attempt, run, run_with_engine, FailureDetail, FetchOutcome, RunResult, RunStats};
pub use session::{Engine, FetchError, HttpEngine, PageState, Session};
