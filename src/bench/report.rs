//! Markdown rendering of benchmark results.

use std::fmt::Write as _;
use std::path::Path;

use super::stats::ScenarioStats;

const HEADER: &str = "| Scenario | Concurrency | Total Req. | Completed | Success | Failed | Avg RPS | Avg Latency (ms) | P50 Latency (ms) | P90 Latency (ms) | P99 Latency (ms) | Error Rate (%) | Avg Bytes Recv. |";
const DIVIDER: &str = "|---|---|---|---|---|---|---|---|---|---|---|---|---|";

/// Renders results as a Markdown table, one row per scenario and level.
pub fn render_markdown(results: &[ScenarioStats]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", HEADER);
    let _ = writeln!(out, "{}", DIVIDER);

    for r in results {
        let bytes = r
            .mean_bytes
            .map(|b| format!("{:.2}", b))
            .unwrap_or_else(|| "N/A".to_string());
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} | {:.2} | {:.2} | {:.2} | {:.2} | {:.2} | {:.2} | {} |",
            r.scenario,
            r.concurrency,
            r.attempted,
            r.completed,
            r.succeeded,
            r.failed,
            r.requests_per_second,
            r.mean_latency_ms,
            r.p50_latency_ms,
            r.p90_latency_ms,
            r.p99_latency_ms,
            r.error_rate_percent,
            bytes,
        );
    }

    out
}

/// Writes a rendered report to `path`.
pub fn write_report(path: &Path, markdown: &str) -> std::io::Result<()> {
    std::fs::write(path, markdown)
}
