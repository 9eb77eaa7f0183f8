//! Command-line arguments for the daemon and the benchmark harness.
//!
//! Flags override the environment-derived [`DaemonConfig`].

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::bench::runner::{default_target_frequency, BenchConfig};
use crate::config::{DaemonConfig, ShiftFallback};

/// Pitch-shift failure policy as a CLI value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FallbackArg {
    /// Stream unshifted audio silently
    PassThrough,
    /// Stream unshifted audio and report it in `x-pitch-shift`
    Annotate,
    /// Abort the request with EFFECT_FAILED
    Fail,
}

impl From<FallbackArg> for ShiftFallback {
    fn from(arg: FallbackArg) -> Self {
        match arg {
            FallbackArg::PassThrough => ShiftFallback::PassThrough,
            FallbackArg::Annotate => ShiftFallback::Annotate,
            FallbackArg::Fail => ShiftFallback::Fail,
        }
    }
}

/// lambro-daemon: resolve media pages and stream retuned audio over HTTP
#[derive(Parser, Debug, Default)]
#[command(name = "lambro-daemon")]
#[command(about = "Audio resolution and retuning HTTP service")]
#[command(version)]
pub struct Cli {
    /// Interface to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to the ffmpeg executable
    #[arg(long)]
    pub ffmpeg: Option<PathBuf>,

    /// Path to the yt-dlp executable
    #[arg(long = "yt-dlp")]
    pub ytdlp: Option<PathBuf>,

    /// Number of resolution descriptors kept in memory
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub cache_capacity: Option<u64>,

    /// Maximum concurrent ffmpeg processes
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=256))]
    pub max_transcodes: Option<u64>,

    /// Requests allowed to wait for a transcode slot
    #[arg(long)]
    pub max_pending: Option<usize>,

    /// What to do when pitch shifting fails
    #[arg(long, value_enum)]
    pub shift_fallback: Option<FallbackArg>,

    /// Seconds before an ffmpeg run is stopped
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub transcode_timeout: Option<u64>,

    /// Seconds before a yt-dlp run is stopped
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub resolve_timeout: Option<u64>,

    /// Milliseconds between SIGTERM and SIGKILL
    #[arg(long)]
    pub terminate_grace_ms: Option<u64>,

    /// Log filter used when RUST_LOG is unset (e.g. "info,lambro_daemon=debug")
    #[arg(long)]
    pub log_filter: Option<String>,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Applies flags on top of `config`.
    pub fn apply(&self, mut config: DaemonConfig) -> DaemonConfig {
        if let Some(ref host) = self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(ref path) = self.ffmpeg {
            config.ffmpeg_path = path.clone();
        }
        if let Some(ref path) = self.ytdlp {
            config.ytdlp_path = path.clone();
        }
        if let Some(capacity) = self.cache_capacity {
            config.cache_capacity = capacity as usize;
        }
        if let Some(max) = self.max_transcodes {
            config.max_concurrent_transcodes = max as usize;
        }
        if let Some(pending) = self.max_pending {
            config.max_pending_transcodes = pending;
        }
        if let Some(policy) = self.shift_fallback {
            config.shift_fallback = policy.into();
        }
        if let Some(secs) = self.transcode_timeout {
            config.transcode_timeout_secs = secs;
        }
        if let Some(secs) = self.resolve_timeout {
            config.resolve_timeout_secs = secs;
        }
        if let Some(ms) = self.terminate_grace_ms {
            config.terminate_grace_ms = ms;
        }
        if let Some(ref filter) = self.log_filter {
            config.log_filter = filter.clone();
        }
        config
    }
}

/// lambro-bench: load generator for a running lambro-daemon
#[derive(Parser, Debug)]
#[command(name = "lambro-bench")]
#[command(about = "Benchmark the resolve and process endpoints")]
#[command(version)]
pub struct BenchCli {
    /// Base URL of the daemon
    #[arg(long, default_value = "http://localhost:8000")]
    pub base_url: String,

    /// Media page URL to resolve and process
    #[arg(long, default_value = "https://www.youtube.com/watch?v=dQw4w9WgXcQ")]
    pub source_url: String,

    /// Concurrency levels, comma separated
    #[arg(short, long, value_delimiter = ',', default_values_t = vec![1usize, 5, 10])]
    pub concurrency: Vec<usize>,

    /// Requests per concurrency level
    #[arg(short = 'n', long, default_value = "20")]
    pub requests: usize,

    /// Target frequency for the pitch-shift scenarios, in Hz
    #[arg(long)]
    pub target_frequency: Option<f64>,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "300")]
    pub timeout: u64,

    /// Markdown report path
    #[arg(short, long, default_value = "benchmark_report.md")]
    pub output: PathBuf,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_filter: String,
}

impl BenchCli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        BenchCli::parse()
    }

    /// Converts the arguments into a runner configuration.
    pub fn to_config(&self) -> BenchConfig {
        let mut levels: Vec<usize> = self.concurrency.iter().copied().filter(|&c| c > 0).collect();
        if levels.is_empty() {
            levels.push(1);
        }

        BenchConfig {
            base_url: self.base_url.trim_end_matches('/').to_string(),
            source_url: self.source_url.clone(),
            concurrency_levels: levels,
            requests_per_level: self.requests.max(1),
            target_frequency_hz: self
                .target_frequency
                .filter(|f| f.is_finite() && *f > 0.0)
                .unwrap_or_else(default_target_frequency),
            request_timeout: std::time::Duration::from_secs(self.timeout.max(1)),
            report_path: self.output.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flags_leave_config_untouched() {
        let config = Cli::default().apply(DaemonConfig::default());
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
        assert_eq!(config.shift_fallback, ShiftFallback::Annotate);
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "lambro-daemon",
            "--host",
            "127.0.0.1",
            "--port",
            "9000",
            "--yt-dlp",
            "/opt/yt-dlp",
            "--cache-capacity",
            "8",
            "--max-transcodes",
            "2",
            "--shift-fallback",
            "fail",
            "--terminate-grace-ms",
            "500",
        ])
        .unwrap();

        let config = cli.apply(DaemonConfig::default());
        assert_eq!(config.bind_address(), "127.0.0.1:9000");
        assert_eq!(config.ytdlp_path, PathBuf::from("/opt/yt-dlp"));
        assert_eq!(config.cache_capacity, 8);
        assert_eq!(config.max_concurrent_transcodes, 2);
        assert_eq!(config.shift_fallback, ShiftFallback::Fail);
        assert_eq!(config.terminate_grace_ms, 500);
        assert!(config.validate().is_none());
    }

    #[test]
    fn zero_cache_capacity_is_rejected() {
        assert!(Cli::try_parse_from(["lambro-daemon", "--cache-capacity", "0"]).is_err());
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        assert!(Cli::try_parse_from(["lambro-daemon", "--transcode-timeout", "0"]).is_err());
        assert!(Cli::try_parse_from(["lambro-daemon", "--resolve-timeout", "0"]).is_err());

        let cli = Cli::try_parse_from(["lambro-daemon", "--transcode-timeout", "30"]).unwrap();
        assert_eq!(cli.apply(DaemonConfig::default()).transcode_timeout_secs, 30);
    }

    #[test]
    fn fallback_values() {
        let cli = Cli::try_parse_from(["lambro-daemon", "--shift-fallback", "pass-through"]).unwrap();
        assert_eq!(cli.shift_fallback, Some(FallbackArg::PassThrough));
    }

    #[test]
    fn bench_defaults() {
        let config = BenchCli::try_parse_from(["lambro-bench"]).unwrap().to_config();
        assert_eq!(config.concurrency_levels, vec![1, 5, 10]);
        assert_eq!(config.requests_per_level, 20);
        assert_eq!(config.report_path, PathBuf::from("benchmark_report.md"));
        assert!((config.target_frequency_hz - 554.365).abs() < 1e-3);
    }

    #[test]
    fn bench_concurrency_list() {
        let cli = BenchCli::try_parse_from([
            "lambro-bench",
            "--base-url",
            "http://10.0.0.2:8000/",
            "-c",
            "2,4",
            "-n",
            "8",
        ])
        .unwrap();
        let config = cli.to_config();
        assert_eq!(config.base_url, "http://10.0.0.2:8000");
        assert_eq!(config.concurrency_levels, vec![2, 4]);
        assert_eq!(config.requests_per_level, 8);
    }
}
