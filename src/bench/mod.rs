//! Load-generation harness.
//!
//! Drives the resolve and process endpoints at several concurrency levels
//! and summarizes throughput, latency and error rate per scenario.

pub mod report;
pub mod runner;
pub mod stats;

// Re-export commonly used items
pub use report::{render_markdown, write_report};
pub use runner::{default_scenarios, requests_for, BenchConfig, BenchRunner, Scenario, ScenarioKind};
pub use stats::{percentile, RequestSample, ScenarioStats};
