//! Pipeline orchestrator.
//!
//! Runs one processing request through Transcode, Pitch-Shift and Encode,
//! tracking the request's [`PipelineState`] and applying the configured
//! pitch-shift fallback policy.

use std::sync::Arc;

use bytes::Bytes;
use futures::stream::{self, Stream};

use crate::audio::pitch::{GranularPitchShifter, PitchShifter, PitchStage, ShiftStatus};
use crate::config::{DaemonConfig, ShiftFallback};
use crate::error::{DaemonError, ErrorCode, Result};
use crate::pipeline::gate::TranscodeGate;
use crate::pipeline::stream::{encode, WavChunks};
use crate::pipeline::transcode::{FfmpegTranscoder, Transcode};
use crate::types::{ProcessingRequest, SampleBuffer};

/// Lifecycle of a single processing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Request accepted, waiting for a transcode slot.
    Idle,
    /// The transcoder is running.
    Transcoding,
    /// Decoded samples are being pitch shifted.
    PitchShifting,
    /// Samples are being written to WAV.
    Encoding,
    /// Chunks are being sent to the client.
    Streaming,
    /// Every chunk was emitted.
    Done,
    /// The request failed; no further stages run.
    Aborted,
}

impl PipelineState {
    /// Returns the string representation of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Transcoding => "transcoding",
            PipelineState::PitchShifting => "pitch_shifting",
            PipelineState::Encoding => "encoding",
            PipelineState::Streaming => "streaming",
            PipelineState::Done => "done",
            PipelineState::Aborted => "aborted",
        }
    }

    /// Returns true for `Done` and `Aborted`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Aborted)
    }

    /// Returns true if `next` is a legal successor of this state.
    pub fn can_advance_to(&self, next: PipelineState) -> bool {
        use PipelineState::*;
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (_, Aborted) => true,
            (Idle, Transcoding)
            | (Transcoding, PitchShifting)
            | (PitchShifting, Encoding)
            | (Encoding, Streaming)
            | (Streaming, Done) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tracks the state of one run and logs every transition.
struct RunState {
    state: PipelineState,
}

impl RunState {
    fn new() -> Self {
        Self {
            state: PipelineState::Idle,
        }
    }

    fn advance(&mut self, next: PipelineState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!(from = %self.state, to = %next, "pipeline state");
        self.state = next;
    }

    fn abort(&mut self, err: DaemonError) -> DaemonError {
        tracing::warn!(
            state = %self.state,
            code = %err.code,
            exit_code = ?err.exit_code,
            error = %err.message,
            "pipeline aborted"
        );
        self.state = PipelineState::Aborted;
        err
    }
}

/// Output of a successful run, ready to stream.
#[derive(Debug)]
pub struct ProcessedAudio {
    /// Encoded WAV chunks.
    pub chunks: WavChunks,
    /// Outcome of the pitch-shift stage.
    pub shift: ShiftStatus,
    /// Semitone shift that was requested.
    pub semitones: f64,
}

impl ProcessedAudio {
    /// Converts the chunks into a body stream that logs completion.
    pub fn into_stream(self) -> impl Stream<Item = std::result::Result<Bytes, std::io::Error>> {
        let total_bytes = self.chunks.total_bytes();
        stream::unfold(Some(self.chunks), move |chunks| async move {
            let mut chunks = chunks?;
            match chunks.next() {
                Some(chunk) => Some((Ok(chunk), Some(chunks))),
                None => {
                    tracing::debug!(total_bytes, state = %PipelineState::Done, "stream finished");
                    None
                }
            }
        })
    }
}

/// Per-request Transcode → Pitch-Shift → Encode pipeline.
#[derive(Clone)]
pub struct Pipeline {
    transcoder: Arc<dyn Transcode>,
    pitch: PitchStage,
    gate: TranscodeGate,
    fallback: ShiftFallback,
    output_rate: u32,
    chunk_size: usize,
}

impl Pipeline {
    /// Creates a pipeline from its stages and configuration.
    pub fn new(
        transcoder: Arc<dyn Transcode>,
        shifter: Arc<dyn PitchShifter>,
        config: &DaemonConfig,
    ) -> Self {
        Self {
            transcoder,
            pitch: PitchStage::new(shifter),
            gate: TranscodeGate::new(
                config.max_concurrent_transcodes,
                config.max_pending_transcodes,
            ),
            fallback: config.shift_fallback,
            output_rate: config.output_sample_rate,
            chunk_size: config.chunk_size,
        }
    }

    /// Creates the production pipeline: ffmpeg plus the granular shifter.
    pub fn from_config(config: &DaemonConfig) -> Self {
        Self::new(
            Arc::new(FfmpegTranscoder::from_config(config)),
            Arc::new(GranularPitchShifter::new()),
            config,
        )
    }

    /// Admission gate in front of the transcoder.
    pub fn gate(&self) -> &TranscodeGate {
        &self.gate
    }

    /// Configured fallback policy.
    pub fn fallback(&self) -> ShiftFallback {
        self.fallback
    }

    /// Runs `request` up to the point where streaming can begin.
    ///
    /// Errors are returned before any byte is produced, so the caller can
    /// still answer with a JSON error.
    pub async fn run(&self, request: &ProcessingRequest) -> Result<ProcessedAudio> {
        let mut run = RunState::new();
        let semitones = request.semitone_shift();

        tracing::info!(
            url = %request.source_stream_url,
            target_hz = ?request.target_frequency_hz,
            semitones,
            effect = ?request.effect,
            "processing audio"
        );

        let slot = self.gate.acquire().await.map_err(|e| run.abort(e))?;

        run.advance(PipelineState::Transcoding);
        let decoded = self
            .transcoder
            .transcode(&request.source_stream_url, request.effect)
            .await
            .map_err(|e| run.abort(e))?;
        drop(slot);
        tracing::debug!(
            frames = decoded.frames(),
            duration_secs = decoded.duration_secs(),
            sample_rate = decoded.sample_rate,
            "transcode finished"
        );

        run.advance(PipelineState::PitchShifting);
        let outcome = {
            let pitch = self.pitch.clone();
            tokio::task::spawn_blocking(move || pitch.apply(decoded, semitones))
                .await
                .map_err(|e| run.abort(DaemonError::internal(format!("pitch task failed: {}", e))))?
        };

        if let ShiftStatus::FellBack(reason) = &outcome.status {
            if self.fallback == ShiftFallback::Fail {
                // The reason is already a complete message from the pitch stage
                return Err(run.abort(DaemonError::new(ErrorCode::EffectFailed, reason.clone())));
            }
        }

        run.advance(PipelineState::Encoding);
        let chunks = self
            .encode_blocking(outcome.buffer)
            .await
            .map_err(|e| run.abort(e))?;

        run.advance(PipelineState::Streaming);
        tracing::info!(
            bytes = chunks.total_bytes(),
            chunks = chunks.chunk_count(),
            pitch_shift = outcome.status.header_value(),
            "audio ready to stream"
        );

        Ok(ProcessedAudio {
            chunks,
            shift: outcome.status,
            semitones,
        })
    }

    async fn encode_blocking(&self, buffer: SampleBuffer) -> Result<WavChunks> {
        let output_rate = self.output_rate;
        let chunk_size = self.chunk_size;
        tokio::task::spawn_blocking(move || encode(buffer, output_rate, chunk_size))
            .await
            .map_err(|e| DaemonError::internal(format!("encode task failed: {}", e)))?
    }
}
