//! The fetch-and-extract pipeline
//!
//! This module contains the core batch logic, including:
//! - Per-location retry with a fixed delay ([`attempt`])
//! - Windowed fan-out/join over a shared engine ([`run_with_engine`])
//! - Folding outcomes into a [`RunResult`] ([`aggregate`])

mod aggregate;
mod retry;
mod scheduler;

pub use aggregate::{aggregate, RunResult, RunStats};
pub use retry::attempt;
pub use scheduler::run_with_engine;

use crate::config::Config;
use crate::extract::ExtractionRecord;
use crate::session::launch_engine;
use crate::SweepError;
use serde::{Deserialize, Serialize};

/// Details of a location that exhausted its retries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetail {
    /// The location that failed
    pub location: String,

    /// Description of the last error seen
    pub error: String,

    /// Total number of tries made
    pub attempts: u32,
}

/// Result of driving one location through its full retry chain
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success(ExtractionRecord),
    Failure(FailureDetail),
}

impl FetchOutcome {
    /// The location this outcome belongs to
    pub fn location(&self) -> &str {
        match self {
            Self::Success(record) => &record.location,
            Self::Failure(detail) => &detail.location,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Runs a complete sweep over `locations`
///
/// This is the main entry point. It will:
/// 1. Launch the engine selected in the configuration
/// 2. Process locations in windows of `pipeline.concurrency`
/// 3. Shut the engine down once every window has finished
/// 4. Aggregate all outcomes into a [`RunResult`]
///
/// # Returns
///
/// * `Ok(RunResult)` - The batch finished; per-location failures are in
///   [`RunResult::failures`]
/// * `Err(SweepError::EngineSetup)` - The engine could not be created
///
/// # Example
///
/// ```no_run
/// use seo_sweep::config::Config;
///
/// # async fn example() -> Result<(), seo_sweep::SweepError> {
/// let locations = vec!["https://example.com/".to_string()];
/// let result = seo_sweep::run(&locations, &Config::default()).await?;
/// println!("{} of {} pages extracted", result.stats.succeeded, result.stats.total);
/// # Ok(())
/// # }
/// ```
pub async fn run(locations: &[String], config: &Config) -> Result<RunResult, SweepError> {
    let engine = launch_engine(config).await?;
    Ok(run_with_engine(engine, locations, &config.pipeline).await)
}
