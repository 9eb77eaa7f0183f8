//! Resolution backend: yt-dlp metadata extraction.
//!
//! The backend turns a page URL into the raw metadata JSON that yt-dlp
//! prints with `-J`. Picking a stream out of that metadata is the job of
//! [`super::formats`].

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::DaemonConfig;
use crate::pipeline::process::ProcessGuard;

/// Failure to obtain metadata from the backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with code {}", .code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    Exited {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{program} timed out after {secs}s")]
    TimedOut { program: String, secs: u64 },

    #[error("reading backend output: {0}")]
    Io(#[source] io::Error),

    #[error("could not parse backend output: {0}")]
    Parse(#[from] serde_json::Error),
}

impl BackendError {
    /// Diagnostic text printed by the backend, if any.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            BackendError::Exited { stderr, .. } if !stderr.trim().is_empty() => Some(stderr),
            _ => None,
        }
    }
}

/// Subset of yt-dlp's `-J` output used for stream selection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaInfo {
    pub title: Option<String>,
    pub duration: Option<f64>,
    pub thumbnail: Option<String>,
    /// Top-level URL, present when a single format was selected.
    pub url: Option<String>,
    pub acodec: Option<String>,
    pub vcodec: Option<String>,
    pub ext: Option<String>,
    #[serde(default)]
    pub formats: Vec<FormatEntry>,
}

/// One entry of yt-dlp's format list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormatEntry {
    pub format_id: Option<String>,
    pub url: Option<String>,
    pub acodec: Option<String>,
    pub vcodec: Option<String>,
    pub ext: Option<String>,
    pub abr: Option<f64>,
}

/// Source of media metadata.
#[async_trait]
pub trait ResolutionBackend: Send + Sync {
    /// Extracts metadata for `source` without downloading media.
    async fn fetch(&self, source: &str) -> Result<MediaInfo, BackendError>;
}

/// [`ResolutionBackend`] backed by the yt-dlp executable.
#[derive(Debug, Clone)]
pub struct YtDlpBackend {
    ytdlp_path: PathBuf,
    timeout: Duration,
    grace: Duration,
}

impl YtDlpBackend {
    /// Creates a backend for the given executable.
    pub fn new(ytdlp_path: impl Into<PathBuf>, timeout: Duration, grace: Duration) -> Self {
        Self {
            ytdlp_path: ytdlp_path.into(),
            timeout,
            grace,
        }
    }

    /// Creates a backend from daemon configuration.
    pub fn from_config(config: &DaemonConfig) -> Self {
        Self::new(
            config.ytdlp_path.clone(),
            config.resolve_timeout(),
            config.terminate_grace(),
        )
    }

    fn program(&self) -> String {
        self.ytdlp_path.display().to_string()
    }
}

/// Builds the yt-dlp argument list.
pub fn ytdlp_args(source: &str) -> Vec<String> {
    [
        "-J",
        "--no-playlist",
        "--no-warnings",
        "-f",
        "bestaudio/best",
        "--",
        source,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[async_trait]
impl ResolutionBackend for YtDlpBackend {
    async fn fetch(&self, source: &str) -> Result<MediaInfo, BackendError> {
        let mut guard = ProcessGuard::spawn(&self.ytdlp_path, ytdlp_args(source), self.grace)
            .map_err(|source| BackendError::Spawn {
                program: self.program(),
                source,
            })?;

        let output = match tokio::time::timeout(self.timeout, guard.collect()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                guard.terminate().await;
                return Err(BackendError::Io(e));
            }
            Err(_) => {
                guard.terminate().await;
                return Err(BackendError::TimedOut {
                    program: self.program(),
                    secs: self.timeout.as_secs(),
                });
            }
        };

        if !output.status.success() {
            return Err(BackendError::Exited {
                program: self.program(),
                code: output.exit_code(),
                stderr: output.stderr_text(),
            });
        }

        let info: MediaInfo = serde_json::from_slice(&output.stdout)?;
        tracing::debug!(
            source,
            title = ?info.title,
            formats = info.formats.len(),
            "backend returned metadata"
        );
        Ok(info)
    }
}
