//! Per-location retry
//!
//! Every attempt runs on a freshly acquired session that is released before
//! the next attempt starts. All error kinds are retried the same way, with a
//! constant delay between attempts.

use crate::config::PipelineConfig;
use crate::extract::{extract, ExtractionRecord};
use crate::pipeline::{FailureDetail, FetchOutcome};
use crate::session::{Engine, FetchError, SessionGuard};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Drives one location until it succeeds or runs out of attempts
///
/// Makes at most `config.max_retries + 1` tries. A location that fails every
/// try yields [`FetchOutcome::Failure`] carrying the last error and the total
/// number of tries.
pub async fn attempt(engine: &dyn Engine, location: &str, config: &PipelineConfig) -> FetchOutcome {
    attempt_tracked(engine, location, config, &AtomicU32::new(0)).await
}

/// [`attempt`] with the try count kept in `tries`
///
/// The scheduler reads `tries` when a chain dies before returning an outcome.
pub(crate) async fn attempt_tracked(
    engine: &dyn Engine,
    location: &str,
    config: &PipelineConfig,
    tries: &AtomicU32,
) -> FetchOutcome {
    let max_attempts = config.max_attempts();

    loop {
        let attempts = tries.fetch_add(1, Ordering::SeqCst) + 1;

        match attempt_once(engine, location, config.timeout()).await {
            Ok(record) => {
                if attempts > 1 {
                    tracing::info!("{} succeeded on attempt {}/{}", location, attempts, max_attempts);
                } else {
                    tracing::debug!("{} extracted", location);
                }
                return FetchOutcome::Success(record);
            }
            Err(error) if attempts < max_attempts => {
                tracing::warn!(
                    "Attempt {}/{} for {} failed ({}): {}; retrying in {:?}",
                    attempts,
                    max_attempts,
                    location,
                    error.kind(),
                    error,
                    config.retry_delay()
                );
                tokio::time::sleep(config.retry_delay()).await;
            }
            Err(error) => {
                tracing::warn!("Giving up on {} after {} attempts: {}", location, attempts, error);
                return FetchOutcome::Failure(FailureDetail {
                    location: location.to_string(),
                    error: error.to_string(),
                    attempts,
                });
            }
        }
    }
}

/// One acquire → fetch → release → extract cycle
async fn attempt_once(
    engine: &dyn Engine,
    location: &str,
    timeout: Duration,
) -> Result<ExtractionRecord, FetchError> {
    let mut guard = SessionGuard::acquire(engine, location).await?;
    let fetched = guard.fetch(timeout).await;
    guard.close().await;

    let page = fetched?;
    Ok(extract(&page))
}
