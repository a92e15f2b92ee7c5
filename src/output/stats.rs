//! Console summary of a run

use crate::pipeline::RunResult;
use std::fmt::Write;

/// Formats run statistics and failures as plain text
pub fn format_summary(result: &RunResult) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== SEO Sweep Summary ===\n");
    let _ = writeln!(out, "Started:   {}", result.started_at.to_rfc3339());
    let _ = writeln!(out, "Completed: {}", result.completed_at.to_rfc3339());
    let _ = writeln!(
        out,
        "Duration:  {:.1}s\n",
        result.duration().num_milliseconds() as f64 / 1000.0
    );

    let _ = writeln!(out, "Locations: {}", result.stats.total);
    let _ = writeln!(out, "Succeeded: {}", result.stats.succeeded);
    let _ = writeln!(out, "Failed:    {}", result.stats.failed);
    let _ = writeln!(
        out,
        "Success Rate: {:.1}%",
        result.stats.success_ratio * 100.0
    );

    if !result.failures.is_empty() {
        let _ = writeln!(out, "\nFailures ({}):", result.failures.len());
        for failure in &result.failures {
            let _ = writeln!(
                out,
                "  - {} ({} attempts): {}",
                failure.location, failure.attempts, failure.error
            );
        }
    }

    let missing_titles = result
        .successes
        .iter()
        .filter(|record| record.title.en.is_empty())
        .count();
    if missing_titles > 0 {
        let _ = writeln!(out, "\nPages without an English title: {}", missing_titles);
    }

    out
}

/// Prints statistics to stdout
pub fn print_summary(result: &RunResult) {
    print!("{}", format_summary(result));
}
