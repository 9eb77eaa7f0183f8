//! Benchmark scenarios and the load generator that runs them.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use serde_json::{json, Value};

use crate::types::BASE_FREQUENCY_HZ;

use super::stats::{RequestSample, ScenarioStats};

/// Default concurrency levels.
pub const DEFAULT_CONCURRENCY_LEVELS: [usize; 3] = [1, 5, 10];

/// Default number of requests per concurrency level.
pub const DEFAULT_REQUESTS_PER_LEVEL: usize = 20;

/// Target frequency for the pitch-shift scenarios: A4 raised four semitones.
pub fn default_target_frequency() -> f64 {
    BASE_FREQUENCY_HZ * 2f64.powf(4.0 / 12.0)
}

/// Settings for a benchmark run.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Base URL of the daemon, without a trailing slash.
    pub base_url: String,
    /// Media page URL used by every scenario.
    pub source_url: String,
    pub concurrency_levels: Vec<usize>,
    pub requests_per_level: usize,
    /// Target frequency for the pitch-shift scenarios.
    pub target_frequency_hz: f64,
    /// Per-request timeout, including the full body.
    pub request_timeout: Duration,
    /// Where the Markdown report is written.
    pub report_path: PathBuf,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            source_url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
            concurrency_levels: DEFAULT_CONCURRENCY_LEVELS.to_vec(),
            requests_per_level: DEFAULT_REQUESTS_PER_LEVEL,
            target_frequency_hz: default_target_frequency(),
            request_timeout: Duration::from_secs(300),
            report_path: PathBuf::from("benchmark_report.md"),
        }
    }
}

/// What a scenario exercises.
#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioKind {
    /// Only `POST /resolve`.
    Resolve,
    /// `POST /process` on a stream URL resolved once up front.
    Process {
        target_frequency_hz: Option<f64>,
        effect_preset_enabled: bool,
    },
}

/// A named benchmark scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: String,
    pub kind: ScenarioKind,
}

/// The five standard scenarios.
pub fn default_scenarios(target_frequency_hz: f64) -> Vec<Scenario> {
    let process = |name: &str, target: Option<f64>, effect: bool| Scenario {
        name: name.to_string(),
        kind: ScenarioKind::Process {
            target_frequency_hz: target,
            effect_preset_enabled: effect,
        },
    };

    vec![
        Scenario {
            name: "/resolve".to_string(),
            kind: ScenarioKind::Resolve,
        },
        process("/process (baseline)", None, false),
        process("/process (pitch shift)", Some(target_frequency_hz), false),
        process("/process (effect preset)", None, true),
        process(
            "/process (pitch shift + effect preset)",
            Some(target_frequency_hz),
            true,
        ),
    ]
}

/// Request count for a level: `per_level` rounded down to a multiple of
/// `concurrency`, but at least one batch.
pub fn requests_for(concurrency: usize, per_level: usize) -> usize {
    let concurrency = concurrency.max(1);
    (per_level / concurrency).max(1) * concurrency
}

/// Drives the daemon's HTTP API.
pub struct BenchRunner {
    client: reqwest::Client,
    config: BenchConfig,
}

impl BenchRunner {
    /// Creates a runner with its own HTTP client.
    pub fn new(config: BenchConfig) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Runs every scenario at every concurrency level.
    pub async fn run_all(&self, scenarios: &[Scenario]) -> Vec<ScenarioStats> {
        let mut results = Vec::new();
        for scenario in scenarios {
            for &concurrency in &self.config.concurrency_levels {
                let total = requests_for(concurrency, self.config.requests_per_level);
                results.push(self.run_scenario(scenario, concurrency, total).await);
            }
        }
        results
    }

    /// Runs `total` requests of one scenario, at most `concurrency` in flight.
    pub async fn run_scenario(
        &self,
        scenario: &Scenario,
        concurrency: usize,
        total: usize,
    ) -> ScenarioStats {
        let concurrency = concurrency.max(1);
        tracing::info!(
            scenario = %scenario.name,
            concurrency,
            total,
            "running scenario"
        );

        let stats = match &scenario.kind {
            ScenarioKind::Resolve => {
                let started = Instant::now();
                let samples: Vec<RequestSample> = stream::iter(0..total)
                    .map(|_| async { self.resolve_once().await.1 })
                    .buffer_unordered(concurrency)
                    .collect()
                    .await;
                ScenarioStats::from_samples(
                    &scenario.name,
                    concurrency,
                    total,
                    &samples,
                    started.elapsed(),
                    false,
                )
            }
            ScenarioKind::Process {
                target_frequency_hz,
                effect_preset_enabled,
            } => {
                let Some(stream_url) = self.resolve_once().await.0 else {
                    tracing::error!(
                        scenario = %scenario.name,
                        source = %self.config.source_url,
                        "could not resolve source, aborting scenario"
                    );
                    return ScenarioStats::all_failed(&scenario.name, concurrency, total);
                };

                let started = Instant::now();
                let samples: Vec<RequestSample> = stream::iter(0..total)
                    .map(|_| {
                        self.process_once(&stream_url, *target_frequency_hz, *effect_preset_enabled)
                    })
                    .buffer_unordered(concurrency)
                    .collect()
                    .await;
                ScenarioStats::from_samples(
                    &scenario.name,
                    concurrency,
                    total,
                    &samples,
                    started.elapsed(),
                    true,
                )
            }
        };

        tracing::info!(
            scenario = %stats.scenario,
            concurrency = stats.concurrency,
            succeeded = stats.succeeded,
            failed = stats.failed,
            rps = stats.requests_per_second,
            p50_ms = stats.p50_latency_ms,
            "scenario finished"
        );
        stats
    }

    /// Resolves the configured source once, returning the stream URL on success.
    pub async fn resolve_once(&self) -> (Option<String>, RequestSample) {
        let request = match self
            .client
            .post(self.endpoint("/resolve"))
            .json(&json!({ "sourceUrl": self.config.source_url }))
            .build()
        {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "could not build resolve request");
                return (None, RequestSample::failed_before_start());
            }
        };

        let started = Instant::now();
        let outcome = async {
            let response = self.client.execute(request).await?;
            let status = response.status();
            let body: Value = response.json().await?;
            Ok::<_, reqwest::Error>((status, body))
        }
        .await;

        // Transport failures carry no latency sample
        let (stream_url, latency) = match outcome {
            Ok((status, body)) if status.is_success() => {
                let url = body
                    .get("playableStreamUrl")
                    .and_then(Value::as_str)
                    .filter(|url| !url.is_empty())
                    .map(str::to_string);
                (url, Some(started.elapsed()))
            }
            Ok((status, body)) => {
                tracing::warn!(status = status.as_u16(), detail = %body["detail"], "resolve failed");
                (None, Some(started.elapsed()))
            }
            Err(e) => {
                tracing::warn!(error = %e, "resolve request failed");
                (None, None)
            }
        };

        let sample = RequestSample {
            success: stream_url.is_some(),
            latency,
            bytes: None,
        };
        (stream_url, sample)
    }

    /// Requests processed audio and consumes the whole body.
    pub async fn process_once(
        &self,
        stream_url: &str,
        target_frequency_hz: Option<f64>,
        effect_preset_enabled: bool,
    ) -> RequestSample {
        let request = match self
            .client
            .post(self.endpoint("/process"))
            .json(&json!({
                "sourceStreamUrl": stream_url,
                "targetFrequencyHz": target_frequency_hz,
                "effectPresetEnabled": effect_preset_enabled,
            }))
            .build()
        {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "could not build process request");
                return RequestSample::failed_before_start();
            }
        };

        let started = Instant::now();
        let mut bytes = 0usize;

        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "process request failed");
                return RequestSample {
                    success: false,
                    latency: None,
                    bytes: Some(0),
                };
            }
        };

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), detail = %detail, "process failed");
            return RequestSample {
                success: false,
                latency: Some(started.elapsed()),
                bytes: Some(0),
            };
        }

        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(chunk) => bytes += chunk.len(),
                Err(e) => {
                    tracing::warn!(error = %e, bytes, "audio stream ended early");
                    return RequestSample {
                        success: false,
                        latency: None,
                        bytes: Some(bytes),
                    };
                }
            }
        }

        if bytes == 0 {
            tracing::warn!("process returned an empty body");
        }

        RequestSample {
            success: bytes > 0,
            latency: Some(started.elapsed()),
            bytes: Some(bytes),
        }
    }
}
