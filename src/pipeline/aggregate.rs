//! Folding outcomes into the run result
//!
//! The aggregate is the output contract consumed by persistence and
//! reporting: successes and failures in input order plus run statistics.

use crate::extract::ExtractionRecord;
use crate::pipeline::{FailureDetail, FetchOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Derived counts for one run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// Number of outcomes (equals the number of input locations)
    pub total: usize,

    /// Locations that produced a record
    pub succeeded: usize,

    /// Locations that exhausted their retries
    pub failed: usize,

    /// `succeeded / total`, or `0.0` for an empty run
    pub success_ratio: f64,
}

impl RunStats {
    pub fn from_counts(succeeded: usize, failed: usize) -> Self {
        let total = succeeded + failed;
        let success_ratio = if total > 0 {
            succeeded as f64 / total as f64
        } else {
            0.0
        };

        Self {
            total,
            succeeded,
            failed,
            success_ratio,
        }
    }
}

/// Everything one invocation produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Extracted records, in input order
    pub successes: Vec<ExtractionRecord>,

    /// Failed locations, in input order
    pub failures: Vec<FailureDetail>,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the last outcome was collected
    pub completed_at: DateTime<Utc>,

    pub stats: RunStats,
}

impl RunResult {
    /// Wall-clock duration of the run
    pub fn duration(&self) -> chrono::Duration {
        self.completed_at - self.started_at
    }
}

/// Splits outcomes by variant and stamps the result with the completion time
///
/// Relative input order is preserved within each partition.
pub fn aggregate(outcomes: Vec<FetchOutcome>, started_at: DateTime<Utc>) -> RunResult {
    let mut successes = Vec::new();
    let mut failures = Vec::new();

    for outcome in outcomes {
        match outcome {
            FetchOutcome::Success(record) => successes.push(record),
            FetchOutcome::Failure(detail) => failures.push(detail),
        }
    }

    let stats = RunStats::from_counts(successes.len(), failures.len());

    RunResult {
        successes,
        failures,
        started_at,
        completed_at: Utc::now(),
        stats,
    }
}
