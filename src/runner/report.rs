//! Run result export
//!
//! A finished run exports as structured JSON or as a self-contained
//! human-readable text report.

use std::fmt::Write as _;

use crate::errors::Result;
use crate::models::RunResult;

/// Export a run as pretty-printed JSON
pub fn run_to_json(run: &RunResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(run)?)
}

/// Export a run as a human-readable report
pub fn run_to_text(run: &RunResult) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Run report: {}", run.collection_name);
    let _ = writeln!(
        out,
        "{} items, {} tests passed, {} tests failed, {} ms{}",
        run.items.len(),
        run.tests_passed,
        run.tests_failed,
        run.duration_ms,
        if run.stopped { " (stopped early)" } else { "" }
    );
    let _ = writeln!(out);

    for item in &run.items {
        let status = item
            .status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        let marker = if item.passed() { "PASS" } else { "FAIL" };
        let _ = writeln!(
            out,
            "[{}] #{} {} {} -> {} ({} ms)",
            marker,
            item.iteration + 1,
            item.method,
            item.request_name,
            status,
            item.duration_ms
        );

        if let Some(ref error) = item.error {
            let _ = writeln!(out, "       error: {}", error);
        }
        for outcome in &item.outcomes {
            if outcome.passed {
                let _ = writeln!(out, "       ok: {}", outcome.name);
            } else {
                let _ = writeln!(
                    out,
                    "       failed: {} ({})",
                    outcome.name,
                    outcome.error.as_deref().unwrap_or("no message")
                );
            }
        }
    }

    out
}
