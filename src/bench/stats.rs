//! Latency and throughput statistics for benchmark scenarios.

use std::time::Duration;

use serde::Serialize;

/// Outcome of one benchmark request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSample {
    /// Whether the request counts as a success.
    pub success: bool,
    /// Time from send to last byte. `None` when the request failed before
    /// it could be timed.
    pub latency: Option<Duration>,
    /// Body bytes received, for processing requests.
    pub bytes: Option<usize>,
}

impl RequestSample {
    /// A request that failed before timing started.
    pub fn failed_before_start() -> Self {
        Self {
            success: false,
            latency: None,
            bytes: None,
        }
    }
}

/// Aggregated results of one scenario at one concurrency level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioStats {
    pub scenario: String,
    pub concurrency: usize,
    pub attempted: usize,
    pub completed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub requests_per_second: f64,
    pub mean_latency_ms: f64,
    pub p50_latency_ms: f64,
    pub p90_latency_ms: f64,
    pub p99_latency_ms: f64,
    pub error_rate_percent: f64,
    /// Mean body size; `None` for scenarios that do not stream audio.
    pub mean_bytes: Option<f64>,
}

impl ScenarioStats {
    /// Aggregates samples collected over `wall_time`.
    pub fn from_samples(
        scenario: impl Into<String>,
        concurrency: usize,
        attempted: usize,
        samples: &[RequestSample],
        wall_time: Duration,
        tracks_bytes: bool,
    ) -> Self {
        let succeeded = samples.iter().filter(|s| s.success).count();
        let completed = samples.len();
        let failed = completed - succeeded;

        let mut latencies: Vec<f64> = samples
            .iter()
            .filter_map(|s| s.latency)
            .map(|d| d.as_secs_f64() * 1000.0)
            .collect();
        latencies.sort_by(|a, b| a.total_cmp(b));

        let bytes: Vec<f64> = samples
            .iter()
            .filter_map(|s| s.bytes)
            .map(|b| b as f64)
            .collect();

        let wall_secs = wall_time.as_secs_f64();
        let requests_per_second = if wall_secs > 0.0 {
            completed as f64 / wall_secs
        } else {
            0.0
        };

        let error_rate_percent = if completed > 0 {
            failed as f64 / completed as f64 * 100.0
        } else {
            0.0
        };

        Self {
            scenario: scenario.into(),
            concurrency,
            attempted,
            completed,
            succeeded,
            failed,
            requests_per_second,
            mean_latency_ms: mean(&latencies),
            p50_latency_ms: percentile(&latencies, 50.0),
            p90_latency_ms: percentile(&latencies, 90.0),
            p99_latency_ms: percentile(&latencies, 99.0),
            error_rate_percent,
            mean_bytes: tracks_bytes.then(|| mean(&bytes)),
        }
    }

    /// Stats for a scenario that could not start: every request failed.
    pub fn all_failed(scenario: impl Into<String>, concurrency: usize, attempted: usize) -> Self {
        Self {
            scenario: scenario.into(),
            concurrency,
            attempted,
            completed: attempted,
            succeeded: 0,
            failed: attempted,
            requests_per_second: 0.0,
            mean_latency_ms: 0.0,
            p50_latency_ms: 0.0,
            p90_latency_ms: 0.0,
            p99_latency_ms: 0.0,
            error_rate_percent: if attempted > 0 { 100.0 } else { 0.0 },
            mean_bytes: Some(0.0),
        }
    }
}

/// Arithmetic mean; zero for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Percentile of sorted values with linear interpolation between ranks.
///
/// `p` is in `[0, 100]`. Returns zero for an empty slice.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (p.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let frac = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * frac
        }
    }
}
