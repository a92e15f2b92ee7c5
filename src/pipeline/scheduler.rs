//! Windowed batch scheduler
//!
//! Locations are split into consecutive windows of `concurrency`. Windows run
//! strictly one after another; inside a window every location's retry chain
//! runs as its own task and the window ends when all of them have finished.
//!
//! Sessions are handed out through a semaphore of `concurrency` permits. A
//! permit is returned only once its session has been released, so sessions
//! released in the background by a dropped guard still count against the
//! limit until they are gone.
//!
//! Window tasks are held in a [`JoinSet`]: dropping a run aborts every
//! in-flight chain, and each aborted chain releases its session through its
//! guard.

use crate::config::PipelineConfig;
use crate::pipeline::aggregate::{aggregate, RunResult};
use crate::pipeline::retry::attempt_tracked;
use crate::pipeline::{FailureDetail, FetchOutcome};
use crate::session::{Engine, FetchError, PageState, Session};
use async_trait::async_trait;
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;

/// Runs every location through the pipeline on an already launched engine
///
/// Produces exactly one outcome per input location (duplicates included),
/// then shuts the engine down exactly once, whatever the outcome mix.
///
/// Dropping the returned future before it resolves aborts the in-flight
/// window; the engine is then left for the caller to shut down.
pub async fn run_with_engine(
    engine: Arc<dyn Engine>,
    locations: &[String],
    config: &PipelineConfig,
) -> RunResult {
    let started_at = Utc::now();
    let start_time = Instant::now();

    let outcomes = run_windows(&engine, locations, config).await;

    engine.shutdown().await;

    let result = aggregate(outcomes, started_at);
    tracing::info!(
        "Run finished: {} succeeded, {} failed in {:?}",
        result.stats.succeeded,
        result.stats.failed,
        start_time.elapsed()
    );
    result
}

/// Processes windows sequentially, collecting outcomes in input order
async fn run_windows(
    engine: &Arc<dyn Engine>,
    locations: &[String],
    config: &PipelineConfig,
) -> Vec<FetchOutcome> {
    let concurrency = config.concurrency.max(1);
    let window_count = locations.len().div_ceil(concurrency);
    let bounded: Arc<dyn Engine> = Arc::new(BoundedEngine::new(Arc::clone(engine), concurrency));
    let mut outcomes = Vec::with_capacity(locations.len());

    for (index, window) in locations.chunks(concurrency).enumerate() {
        tracing::info!(
            "Window {}/{}: dispatching {} locations",
            index + 1,
            window_count,
            window.len()
        );

        outcomes.extend(run_window(&bounded, window, config).await);

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        tracing::info!(
            "Progress: {}/{} locations done, {} succeeded",
            outcomes.len(),
            locations.len(),
            succeeded
        );
    }

    outcomes
}

/// Runs one window to completion, returning outcomes in window order
async fn run_window(
    engine: &Arc<dyn Engine>,
    window: &[String],
    config: &PipelineConfig,
) -> Vec<FetchOutcome> {
    let tries: Vec<Arc<AtomicU32>> = window.iter().map(|_| Arc::new(AtomicU32::new(0))).collect();
    let mut tasks = JoinSet::new();

    for (slot, location) in window.iter().enumerate() {
        let engine = Arc::clone(engine);
        let location = location.clone();
        let config = config.clone();
        let tries = Arc::clone(&tries[slot]);

        tasks.spawn(async move {
            let chain = attempt_tracked(engine.as_ref(), &location, &config, &tries);
            let outcome = match AssertUnwindSafe(chain).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(panic) => {
                    // Only this location is affected
                    let message = panic_message(panic.as_ref());
                    tracing::error!("Task for {} panicked: {}", location, message);
                    FetchOutcome::Failure(FailureDetail {
                        location: location.clone(),
                        error: format!("task panicked: {}", message),
                        attempts: tries.load(Ordering::SeqCst),
                    })
                }
            };
            (slot, outcome)
        });
    }

    let mut slots: Vec<Option<FetchOutcome>> = window.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((slot, outcome)) => slots[slot] = Some(outcome),
            Err(e) => tracing::error!("Window task did not complete: {}", e),
        }
    }

    window
        .iter()
        .zip(slots)
        .zip(&tries)
        .map(|((location, slot), tries)| {
            slot.unwrap_or_else(|| {
                FetchOutcome::Failure(FailureDetail {
                    location: location.clone(),
                    error: "task did not complete".to_string(),
                    attempts: tries.load(Ordering::SeqCst),
                })
            })
        })
        .collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Caps the number of un-released sessions across a run
struct BoundedEngine {
    inner: Arc<dyn Engine>,
    permits: Arc<Semaphore>,
}

impl BoundedEngine {
    fn new(inner: Arc<dyn Engine>, limit: usize) -> Self {
        Self {
            inner,
            permits: Arc::new(Semaphore::new(limit)),
        }
    }
}

#[async_trait]
impl Engine for BoundedEngine {
    async fn acquire(&self) -> Result<Box<dyn Session>, FetchError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| FetchError::Acquire(format!("session limit closed: {}", e)))?;
        let session = self.inner.acquire().await?;
        Ok(Box::new(BoundedSession { session, permit }))
    }

    /// Stops handing out sessions; the wrapped engine is shut down by its owner
    async fn shutdown(&self) {
        self.permits.close();
    }
}

/// A session holding one permit until its release has finished
struct BoundedSession {
    session: Box<dyn Session>,
    permit: OwnedSemaphorePermit,
}

#[async_trait]
impl Session for BoundedSession {
    async fn fetch(&mut self, location: &str, timeout: Duration) -> Result<PageState, FetchError> {
        self.session.fetch(location, timeout).await
    }

    async fn release(self: Box<Self>) {
        let BoundedSession { session, permit } = *self;
        session.release().await;
        drop(permit);
    }
}
