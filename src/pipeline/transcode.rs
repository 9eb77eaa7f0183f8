//! Transcode stage: remote stream URL to decoded PCM.
//!
//! Runs ffmpeg to convert whatever container the source uses into 44.1kHz
//! stereo 16-bit WAV on stdout, then decodes that into a [`SampleBuffer`].

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::audio::wav::{decode_wav, CHANNELS, SAMPLE_RATE};
use crate::config::DaemonConfig;
use crate::error::{DaemonError, ErrorCode, Result};
use crate::pipeline::process::ProcessGuard;
use crate::types::{EffectPreset, SampleBuffer};

/// Converts a remote audio stream into decoded samples.
#[async_trait]
pub trait Transcode: Send + Sync {
    /// Fetches and decodes `stream_url`, applying `effect` on the way.
    ///
    /// Fails with TRANSCODE_FAILED when the process exits non-zero, writes
    /// nothing or times out, and with DECODE_FAILED when its output is not
    /// valid audio. Never returns partial audio.
    async fn transcode(&self, stream_url: &str, effect: EffectPreset) -> Result<SampleBuffer>;
}

/// [`Transcode`] implementation backed by the ffmpeg executable.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    ffmpeg_path: PathBuf,
    timeout: Duration,
    grace: Duration,
}

impl FfmpegTranscoder {
    /// Creates a transcoder for the given executable.
    pub fn new(ffmpeg_path: impl Into<PathBuf>, timeout: Duration, grace: Duration) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            timeout,
            grace,
        }
    }

    /// Creates a transcoder from daemon configuration.
    pub fn from_config(config: &DaemonConfig) -> Self {
        Self::new(
            config.ffmpeg_path.clone(),
            config.transcode_timeout(),
            config.terminate_grace(),
        )
    }
}

/// Builds the ffmpeg argument list.
pub fn ffmpeg_args(stream_url: &str, effect: EffectPreset) -> Vec<String> {
    let mut args: Vec<String> = ["-hide_banner", "-nostdin", "-i", stream_url, "-vn"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    if let Some(graph) = effect.filter_graph() {
        args.push("-af".to_string());
        args.push(graph.to_string());
    }

    args.extend(
        [
            "-acodec".to_string(),
            "pcm_s16le".to_string(),
            "-ar".to_string(),
            SAMPLE_RATE.to_string(),
            "-ac".to_string(),
            CHANNELS.to_string(),
            "-f".to_string(),
            "wav".to_string(),
            "-".to_string(),
        ],
    );

    args
}

#[async_trait]
impl Transcode for FfmpegTranscoder {
    async fn transcode(&self, stream_url: &str, effect: EffectPreset) -> Result<SampleBuffer> {
        let args = ffmpeg_args(stream_url, effect);

        let mut guard = ProcessGuard::spawn(&self.ffmpeg_path, &args, self.grace).map_err(|e| {
            DaemonError::with_source(
                ErrorCode::TranscodeFailed,
                format!("failed to start {}: {}", self.ffmpeg_path.display(), e),
                e,
            )
        })?;

        let output = match tokio::time::timeout(self.timeout, guard.collect()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                guard.terminate().await;
                return Err(DaemonError::with_source(
                    ErrorCode::Internal,
                    format!("reading ffmpeg output: {}", e),
                    e,
                ));
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.timeout.as_secs(),
                    "ffmpeg timed out, terminating"
                );
                guard.terminate().await;
                return Err(DaemonError::new(
                    ErrorCode::TranscodeFailed,
                    format!("ffmpeg timed out after {}s", self.timeout.as_secs()),
                ));
            }
        };

        let diagnostics = output.stderr_text();

        if !output.status.success() {
            tracing::warn!(code = ?output.exit_code(), "ffmpeg failed");
            return Err(DaemonError::transcode_failed(output.exit_code(), diagnostics));
        }
        if output.stdout.is_empty() {
            tracing::warn!("ffmpeg exited cleanly without output");
            return Err(DaemonError::transcode_empty(diagnostics));
        }

        let wav_bytes = output.stdout.len();
        let stdout = output.stdout;
        let buffer = tokio::task::spawn_blocking(move || decode_wav(&stdout))
            .await
            .map_err(|e| DaemonError::internal(format!("decode task failed: {}", e)))?
            .map_err(|e| e.with_diagnostics(diagnostics))?;

        tracing::info!(
            wav_bytes,
            frames = buffer.frames(),
            sample_rate = buffer.sample_rate,
            channels = buffer.channels,
            "transcode complete"
        );

        Ok(buffer)
    }
}
