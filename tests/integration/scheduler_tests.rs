//! Scheduler, retry and aggregation properties over a scripted engine

use crate::common::{locations, Behavior, Event, ScriptedEngine};
use seo_sweep::config::PipelineConfig;
use seo_sweep::pipeline::run_with_engine;
use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

fn config(concurrency: usize, max_retries: u32) -> PipelineConfig {
    PipelineConfig {
        concurrency,
        max_retries,
        timeout_ms: 1_000,
        retry_delay_ms: 100,
        settle_grace_ms: 0,
        ..PipelineConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_empty_input() {
    let engine = Arc::new(ScriptedEngine::new());
    let counters = engine.counters.clone();

    let result = run_with_engine(engine, &[], &config(3, 2)).await;

    assert!(result.successes.is_empty());
    assert!(result.failures.is_empty());
    assert_eq!(result.stats.total, 0);
    assert_eq!(result.stats.success_ratio, 0.0);
    assert_eq!(counters.acquired.load(Ordering::SeqCst), 0);
    assert_eq!(counters.shutdowns.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_isolation_scenario() {
    let input = locations(&["one", "two", "three", "four"]);
    let engine = Arc::new(ScriptedEngine::new().with(&input[1], Behavior::FailNavigation));
    let counters = engine.counters.clone();

    let result = run_with_engine(engine, &input, &config(2, 2)).await;

    assert_eq!(result.successes.len(), 3);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].location, input[1]);
    assert_eq!(result.failures[0].attempts, 3);
    assert!(result.failures[0].error.contains("connection refused"));
    assert_eq!(counters.attempts_for(&input[1]), 3);
    assert_eq!(counters.attempts_for(&input[0]), 1);
}

#[tokio::test(start_paused = true)]
async fn test_every_location_gets_exactly_one_outcome() {
    let input = locations(&["a", "b", "c", "d", "e", "f", "g"]);
    let engine = Arc::new(
        ScriptedEngine::new()
            .with(&input[2], Behavior::FailTimeout)
            .with(&input[4], Behavior::FailNavigation)
            .with(&input[5], Behavior::FailTimes(1)),
    );

    let result = run_with_engine(engine, &input, &config(3, 1)).await;

    assert_eq!(result.successes.len() + result.failures.len(), input.len());

    let succeeded: HashSet<_> = result.successes.iter().map(|r| r.location.clone()).collect();
    let failed: HashSet<_> = result.failures.iter().map(|f| f.location.clone()).collect();
    assert!(succeeded.is_disjoint(&failed));
    let all: HashSet<_> = succeeded.union(&failed).cloned().collect();
    assert_eq!(all, input.iter().cloned().collect::<HashSet<_>>());

    assert_eq!(failed, [input[2].clone(), input[4].clone()].into_iter().collect());
}

#[tokio::test(start_paused = true)]
async fn test_duplicates_are_independent_units() {
    let input = locations(&["same", "other", "same"]);
    let engine = Arc::new(ScriptedEngine::new());
    let counters = engine.counters.clone();

    let result = run_with_engine(engine, &input, &config(2, 0)).await;

    assert_eq!(result.stats.total, 3);
    assert_eq!(result.successes.len(), 3);
    assert_eq!(counters.attempts_for(&input[0]), 2);
}

#[tokio::test(start_paused = true)]
async fn test_partitions_follow_input_order() {
    let input = locations(&["a", "b", "c", "d", "e"]);
    let engine = Arc::new(
        ScriptedEngine::new()
            // Later members of a window finish first
            .with(&input[0], Behavior::Succeed { load_ms: 300 })
            .with(&input[1], Behavior::FailNavigation)
            .with(&input[2], Behavior::Succeed { load_ms: 5 })
            .with(&input[3], Behavior::FailNavigation),
    );

    let result = run_with_engine(engine, &input, &config(3, 0)).await;

    let succeeded: Vec<_> = result.successes.iter().map(|r| r.location.as_str()).collect();
    let failed: Vec<_> = result.failures.iter().map(|f| f.location.as_str()).collect();
    assert_eq!(succeeded, [input[0].as_str(), input[2].as_str(), input[4].as_str()]);
    assert_eq!(failed, [input[1].as_str(), input[3].as_str()]);
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_bound_is_never_exceeded() {
    let input = locations(&["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"]);
    let engine = Arc::new(
        ScriptedEngine::new()
            .with_default(Behavior::Succeed { load_ms: 50 })
            .with(&input[3], Behavior::FailTimes(2)),
    );
    let counters = engine.counters.clone();

    let result = run_with_engine(engine, &input, &config(3, 2)).await;

    assert_eq!(result.stats.total, 10);
    assert_eq!(counters.max_live.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_windows_do_not_overlap() {
    let input = locations(&["a", "b", "c", "d"]);
    let engine = Arc::new(
        ScriptedEngine::new()
            .with(&input[0], Behavior::Succeed { load_ms: 500 })
            .with(&input[1], Behavior::Succeed { load_ms: 5 }),
    );
    let counters = engine.counters.clone();

    run_with_engine(engine, &input, &config(2, 0)).await;

    let events = counters.events();
    let position = |event: Event| events.iter().position(|e| *e == event).unwrap();
    let slow_finished = position(Event::FetchFinished(input[0].clone()));
    let next_window_started = position(Event::FetchStarted(input[2].clone()));
    let last_window_started = position(Event::FetchStarted(input[3].clone()));

    assert!(slow_finished < next_window_started);
    assert!(slow_finished < last_window_started);
}

#[tokio::test(start_paused = true)]
async fn test_resources_released_when_everything_fails() {
    let input = locations(&["a", "b", "c", "d", "e"]);
    let engine = Arc::new(ScriptedEngine::new().with_default(Behavior::FailTimeout));
    let counters = engine.counters.clone();

    let result = run_with_engine(engine, &input, &config(2, 2)).await;

    assert_eq!(result.failures.len(), 5);
    assert!(result.failures.iter().all(|f| f.attempts == 3));
    assert_eq!(result.stats.success_ratio, 0.0);

    assert_eq!(counters.acquired.load(Ordering::SeqCst), 15);
    assert_eq!(counters.released.load(Ordering::SeqCst), 15);
    assert_eq!(counters.live.load(Ordering::SeqCst), 0);
    assert_eq!(counters.shutdowns.load(Ordering::SeqCst), 1);
    assert_eq!(counters.events().last(), Some(&Event::Shutdown));
}

#[tokio::test(start_paused = true)]
async fn test_records_carry_both_locales() {
    let input = locations(&["a"]);
    let engine = Arc::new(ScriptedEngine::new());

    let result = run_with_engine(engine, &input, &config(1, 0)).await;

    let record = &result.successes[0];
    assert_eq!(record.title.en, format!("Page {}", input[0]));
    assert_eq!(record.title.ar, format!("صفحة {}", input[0]));
    assert_eq!(record.heading.ar, "عنوان");
    assert_eq!(record.intro.ar, "");
    assert!(record.structured_data.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_run_stops_acquiring_sessions() {
    let input = locations(&["a", "b"]);
    let engine = Arc::new(ScriptedEngine::new().with_default(Behavior::FailTimeout));
    let counters = engine.counters.clone();

    // Each first try takes the full 1s timeout, so 500ms lands mid-window
    let cancelled = tokio::time::timeout(
        Duration::from_millis(500),
        run_with_engine(engine, &input, &config(2, 2)),
    )
    .await;
    assert!(cancelled.is_err());
    assert_eq!(counters.acquired.load(Ordering::SeqCst), 2);

    // Long enough for every remaining retry had the chains survived
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(counters.acquired.load(Ordering::SeqCst), 2);
    assert_eq!(counters.released.load(Ordering::SeqCst), 2);
    assert_eq!(counters.live.load(Ordering::SeqCst), 0);
    assert_eq!(counters.shutdowns.load(Ordering::SeqCst), 0);
}
