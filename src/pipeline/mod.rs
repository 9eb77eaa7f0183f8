//! Audio transformation pipeline.
//!
//! Transcode → Pitch-Shift → Encode/Stream, with subprocess ownership and
//! transcode admission control.

pub mod gate;
pub mod orchestrator;
pub mod process;
pub mod stream;
pub mod transcode;

// Re-export commonly used types
pub use gate::TranscodeGate;
pub use orchestrator::{Pipeline, PipelineState, ProcessedAudio};
pub use process::{ProcessGuard, ProcessOutput};
pub use stream::{encode, WavChunks, DEFAULT_CHUNK_SIZE};
pub use transcode::{ffmpeg_args, FfmpegTranscoder, Transcode};
