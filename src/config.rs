//! Daemon configuration module.
//!
//! Contains the runtime configuration for the lambro-daemon: listen address,
//! external tool paths, cache and admission limits, and the pitch-shift
//! fallback policy.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// What to do when the pitch-shift DSP fails on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShiftFallback {
    /// Stream the unshifted audio and say nothing.
    PassThrough,

    /// Stream the unshifted audio and report the outcome in the
    /// `x-pitch-shift` response header.
    #[default]
    Annotate,

    /// Abort the request with EFFECT_FAILED.
    Fail,
}

impl ShiftFallback {
    /// Returns the string representation of the policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftFallback::PassThrough => "pass_through",
            ShiftFallback::Annotate => "annotate",
            ShiftFallback::Fail => "fail",
        }
    }

    /// Parses a policy from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "pass_through" | "passthrough" | "silent" => Some(ShiftFallback::PassThrough),
            "annotate" | "header" => Some(ShiftFallback::Annotate),
            "fail" => Some(ShiftFallback::Fail),
            _ => None,
        }
    }
}

impl std::fmt::Display for ShiftFallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Runtime configuration for the daemon.
///
/// This configuration is typically loaded from environment variables at
/// startup and then overridden by command-line arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Interface to bind the HTTP server to.
    pub host: String,

    /// Port to bind the HTTP server to.
    pub port: u16,

    /// Path to the ffmpeg executable.
    pub ffmpeg_path: PathBuf,

    /// Path to the yt-dlp executable.
    pub ytdlp_path: PathBuf,

    /// Maximum number of resolution descriptors kept in memory.
    pub cache_capacity: usize,

    /// Maximum number of ffmpeg processes running at once.
    pub max_concurrent_transcodes: usize,

    /// Maximum number of requests waiting for a transcode slot.
    pub max_pending_transcodes: usize,

    /// Pitch-shift failure policy.
    pub shift_fallback: ShiftFallback,

    /// Time between SIGTERM and SIGKILL when stopping a subprocess.
    pub terminate_grace_ms: u64,

    /// Upper bound on a single ffmpeg run.
    pub transcode_timeout_secs: u64,

    /// Upper bound on a single yt-dlp run.
    pub resolve_timeout_secs: u64,

    /// Size of each chunk of the streamed response body.
    pub chunk_size: usize,

    /// Sample rate of the streamed WAV.
    pub output_sample_rate: u32,

    /// Log filter used when RUST_LOG is not set.
    pub log_filter: String,
}

impl DaemonConfig {
    /// Creates a new DaemonConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a DaemonConfig from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `LAMBRO_HOST` / `LAMBRO_PORT` - Listen address
    /// - `LAMBRO_FFMPEG` - Path to ffmpeg
    /// - `LAMBRO_YTDLP` - Path to yt-dlp
    /// - `LAMBRO_CACHE_CAPACITY` - Resolution cache size
    /// - `LAMBRO_MAX_TRANSCODES` - Concurrent ffmpeg processes
    /// - `LAMBRO_MAX_PENDING` - Requests allowed to wait for a slot
    /// - `LAMBRO_SHIFT_FALLBACK` - pass_through, annotate or fail
    /// - `LAMBRO_TERMINATE_GRACE_MS` - SIGTERM grace period
    /// - `LAMBRO_TRANSCODE_TIMEOUT_SECS` / `LAMBRO_RESOLVE_TIMEOUT_SECS`
    /// - `LAMBRO_LOG` - Log filter
    ///
    /// Falls back to defaults for unset or unparsable variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("LAMBRO_HOST") {
            if !host.trim().is_empty() {
                config.host = host;
            }
        }

        if let Some(port) = env_parse::<u16>("LAMBRO_PORT") {
            config.port = port;
        }

        if let Ok(path) = std::env::var("LAMBRO_FFMPEG") {
            config.ffmpeg_path = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("LAMBRO_YTDLP") {
            config.ytdlp_path = PathBuf::from(path);
        }

        if let Some(capacity) = env_parse::<usize>("LAMBRO_CACHE_CAPACITY") {
            if capacity > 0 {
                config.cache_capacity = capacity;
            }
        }

        if let Some(max) = env_parse::<usize>("LAMBRO_MAX_TRANSCODES") {
            if max > 0 {
                config.max_concurrent_transcodes = max;
            }
        }

        if let Some(pending) = env_parse::<usize>("LAMBRO_MAX_PENDING") {
            config.max_pending_transcodes = pending;
        }

        if let Ok(policy) = std::env::var("LAMBRO_SHIFT_FALLBACK") {
            if let Some(policy) = ShiftFallback::parse(&policy) {
                config.shift_fallback = policy;
            }
        }

        if let Some(grace) = env_parse::<u64>("LAMBRO_TERMINATE_GRACE_MS") {
            config.terminate_grace_ms = grace;
        }

        if let Some(secs) = env_parse::<u64>("LAMBRO_TRANSCODE_TIMEOUT_SECS") {
            if secs > 0 {
                config.transcode_timeout_secs = secs;
            }
        }

        if let Some(secs) = env_parse::<u64>("LAMBRO_RESOLVE_TIMEOUT_SECS") {
            if secs > 0 {
                config.resolve_timeout_secs = secs;
            }
        }

        if let Ok(filter) = std::env::var("LAMBRO_LOG") {
            config.log_filter = filter;
        }

        config
    }

    /// Returns the socket address string to bind to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Grace period between SIGTERM and SIGKILL.
    pub fn terminate_grace(&self) -> Duration {
        Duration::from_millis(self.terminate_grace_ms)
    }

    /// Upper bound on a single ffmpeg run.
    pub fn transcode_timeout(&self) -> Duration {
        Duration::from_secs(self.transcode_timeout_secs)
    }

    /// Upper bound on a single yt-dlp run.
    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }

    /// Validates the configuration.
    ///
    /// Returns an error message if validation fails, None otherwise.
    pub fn validate(&self) -> Option<String> {
        if self.cache_capacity == 0 {
            return Some("cache_capacity must be > 0".to_string());
        }

        if self.max_concurrent_transcodes == 0 {
            return Some("max_concurrent_transcodes must be > 0".to_string());
        }

        if self.max_concurrent_transcodes > 256 {
            return Some(format!(
                "max_concurrent_transcodes too high: {} (max 256)",
                self.max_concurrent_transcodes
            ));
        }

        if self.transcode_timeout_secs == 0 {
            return Some("transcode_timeout_secs must be > 0".to_string());
        }

        if self.resolve_timeout_secs == 0 {
            return Some("resolve_timeout_secs must be > 0".to_string());
        }

        if self.chunk_size == 0 {
            return Some("chunk_size must be > 0".to_string());
        }

        if !(8_000..=192_000).contains(&self.output_sample_rate) {
            return Some(format!(
                "output_sample_rate out of range: {} (8000-192000)",
                self.output_sample_rate
            ));
        }

        None
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ytdlp_path: PathBuf::from("yt-dlp"),
            cache_capacity: 128,
            max_concurrent_transcodes: 4,
            max_pending_transcodes: 16,
            shift_fallback: ShiftFallback::default(),
            terminate_grace_ms: 2_000,
            transcode_timeout_secs: 300,
            resolve_timeout_secs: 60,
            chunk_size: 8_192,
            output_sample_rate: 44_100,
            log_filter: "info".to_string(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.trim().parse().ok()
}
