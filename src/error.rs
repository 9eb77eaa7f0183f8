//! Error types for the lambro-daemon.
//!
//! Every fallible operation in the library returns [`Result`], whose error
//! carries an [`ErrorCode`] that the HTTP layer maps onto a status code.

use std::fmt;

/// Error codes returned by the daemon in error responses.
///
/// These codes are serialized into the `code` field of JSON error bodies and
/// allow clients to programmatically handle specific failure conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Request body is malformed or a field is missing/out of range.
    /// Trigger: empty source URL, non-positive target frequency.
    InvalidRequest,

    /// The resolution backend returned no playable audio-only stream.
    NoAudioStream,

    /// The source exists but is unavailable (private, removed, offline).
    ResolutionUnavailable,

    /// The source is geographically or age restricted.
    ResolutionRestricted,

    /// Any other resolution backend or network failure.
    ResolutionFailed,

    /// The transcoding process exited non-zero, produced no output or timed out.
    TranscodeFailed,

    /// Transcoder output could not be parsed as audio.
    DecodeFailed,

    /// The pitch-shift DSP failed and the fallback policy is `fail`.
    EffectFailed,

    /// The processed samples could not be serialized to WAV.
    EncodeFailed,

    /// The transcode admission queue is at capacity.
    QueueFull,

    /// Unexpected internal failure (task join error, I/O on pipes).
    Internal,
}

impl ErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidRequest => "INVALID_REQUEST",
            ErrorCode::NoAudioStream => "NO_AUDIO_STREAM",
            ErrorCode::ResolutionUnavailable => "RESOLUTION_UNAVAILABLE",
            ErrorCode::ResolutionRestricted => "RESOLUTION_RESTRICTED",
            ErrorCode::ResolutionFailed => "RESOLUTION_FAILED",
            ErrorCode::TranscodeFailed => "TRANSCODE_FAILED",
            ErrorCode::DecodeFailed => "DECODE_FAILED",
            ErrorCode::EffectFailed => "EFFECT_FAILED",
            ErrorCode::EncodeFailed => "ENCODE_FAILED",
            ErrorCode::QueueFull => "QUEUE_FULL",
            ErrorCode::Internal => "INTERNAL",
        }
    }

    /// Returns a human-readable description of the error.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::InvalidRequest => "Request is missing a field or has an invalid value",
            ErrorCode::NoAudioStream => "No suitable audio stream was found for the source",
            ErrorCode::ResolutionUnavailable => "The source is unavailable",
            ErrorCode::ResolutionRestricted => "The source is region or age restricted",
            ErrorCode::ResolutionFailed => "The resolution backend failed",
            ErrorCode::TranscodeFailed => "The transcoding process failed",
            ErrorCode::DecodeFailed => "Transcoder output could not be decoded as audio",
            ErrorCode::EffectFailed => "Pitch shifting failed",
            ErrorCode::EncodeFailed => "Processed audio could not be encoded",
            ErrorCode::QueueFull => "Too many transcodes are pending",
            ErrorCode::Internal => "Internal error",
        }
    }

    /// Returns a recovery hint suggesting how to resolve this error.
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            ErrorCode::InvalidRequest => {
                "Send a non-empty source URL and, if retuning, a target frequency above 0 Hz"
            }
            ErrorCode::NoAudioStream => "Try another source; this one exposes no audio-only format",
            ErrorCode::ResolutionUnavailable => {
                "The media is private, removed or not live; pick a public source"
            }
            ErrorCode::ResolutionRestricted => {
                "The media is blocked in this region or requires sign-in; pick another source"
            }
            ErrorCode::ResolutionFailed => {
                "Check network access and that yt-dlp is installed and up to date"
            }
            ErrorCode::TranscodeFailed => {
                "Check that ffmpeg is installed and the stream URL has not expired; resolve it again"
            }
            ErrorCode::DecodeFailed => "Resolve the source again; the stream may be truncated",
            ErrorCode::EffectFailed => "Retry without a target frequency",
            ErrorCode::EncodeFailed => "Retry the request; report the issue if it persists",
            ErrorCode::QueueFull => "Wait for pending requests to finish before retrying",
            ErrorCode::Internal => "Retry the request; report the issue if it persists",
        }
    }

    /// Returns the HTTP status code this error surfaces as.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::InvalidRequest => 400,
            ErrorCode::NoAudioStream => 404,
            ErrorCode::QueueFull => 503,
            ErrorCode::ResolutionUnavailable
            | ErrorCode::ResolutionRestricted
            | ErrorCode::ResolutionFailed
            | ErrorCode::TranscodeFailed
            | ErrorCode::DecodeFailed
            | ErrorCode::EffectFailed
            | ErrorCode::EncodeFailed
            | ErrorCode::Internal => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Maximum number of diagnostic bytes kept from a subprocess's stderr.
const MAX_DIAGNOSTICS_LEN: usize = 4096;

/// Main error type for daemon operations.
#[derive(Debug, thiserror::Error)]
#[error("[{code}] {message}")]
pub struct DaemonError {
    /// The error code identifying the type of error.
    pub code: ErrorCode,
    /// Human-readable error message with context.
    pub message: String,
    /// Exit code of the external process, when one was involved.
    pub exit_code: Option<i32>,
    /// Diagnostic text captured from the external process.
    pub diagnostics: Option<String>,
    /// Optional underlying cause of the error.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl DaemonError {
    /// Creates a new DaemonError with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            exit_code: None,
            diagnostics: None,
            source: None,
        }
    }

    /// Creates a new DaemonError with an underlying cause.
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            source: Some(Box::new(source)),
            ..Self::new(code, message)
        }
    }

    /// Attaches diagnostic text, keeping only its tail when it is long.
    pub fn with_diagnostics(mut self, diagnostics: impl Into<String>) -> Self {
        let diagnostics = diagnostics.into();
        let trimmed = diagnostics.trim();
        if !trimmed.is_empty() {
            self.diagnostics = Some(tail(trimmed, MAX_DIAGNOSTICS_LEN).to_string());
        }
        self
    }

    /// Creates an INVALID_REQUEST error.
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, reason)
    }

    /// Creates a NO_AUDIO_STREAM error.
    pub fn no_audio_stream(source_url: &str) -> Self {
        Self::new(
            ErrorCode::NoAudioStream,
            format!("Suitable audio stream not found for {}", source_url),
        )
    }

    /// Creates a TRANSCODE_FAILED error for a process that exited unsuccessfully.
    pub fn transcode_failed(exit_code: Option<i32>, diagnostics: impl Into<String>) -> Self {
        let message = match exit_code {
            Some(code) => format!("ffmpeg failed processing stream (code {})", code),
            None => "ffmpeg was terminated before finishing".to_string(),
        };
        let mut err = Self::new(ErrorCode::TranscodeFailed, message).with_diagnostics(diagnostics);
        err.exit_code = exit_code;
        err
    }

    /// Creates a TRANSCODE_FAILED error for a process that wrote nothing.
    pub fn transcode_empty(diagnostics: impl Into<String>) -> Self {
        let mut err = Self::new(ErrorCode::TranscodeFailed, "ffmpeg produced no audio data")
            .with_diagnostics(diagnostics);
        err.exit_code = Some(0);
        err
    }

    /// Creates a DECODE_FAILED error.
    pub fn decode_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::DecodeFailed,
            format!("Could not read audio buffer: {}", reason.into()),
        )
    }

    /// Creates an EFFECT_FAILED error.
    pub fn effect_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::EffectFailed,
            format!("Pitch shift failed: {}", reason.into()),
        )
    }

    /// Creates an ENCODE_FAILED error.
    pub fn encode_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::EncodeFailed,
            format!("Could not write processed audio: {}", reason.into()),
        )
    }

    /// Creates a QUEUE_FULL error.
    pub fn queue_full(pending: usize) -> Self {
        Self::new(
            ErrorCode::QueueFull,
            format!("Transcode queue is full ({} requests waiting)", pending),
        )
    }

    /// Creates an INTERNAL error.
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, reason)
    }

    /// Returns the detail string sent to HTTP clients.
    ///
    /// Includes the captured diagnostics so that transcoder failures are
    /// actionable from the client side.
    pub fn detail(&self) -> String {
        match &self.diagnostics {
            Some(diagnostics) => format!("{}: {}", self.message, diagnostics),
            None => self.message.clone(),
        }
    }
}

/// Returns at most the last `max` bytes of `text`, on a char boundary.
fn tail(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

/// Result type alias using DaemonError.
pub type Result<T> = std::result::Result<T, DaemonError>;
