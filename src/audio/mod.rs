//! Audio processing module.
//!
//! Provides WAV decoding and encoding, sample rate conversion, and pitch
//! shifting for transcoded audio.

pub mod pitch;
pub mod resample;
pub mod wav;

// Re-export commonly used items
pub use pitch::{GranularPitchShifter, PitchShifter, PitchStage, ShiftOutcome, ShiftStatus};
pub use resample::resample;
pub use wav::{decode_wav, encode_wav, CHANNELS, SAMPLE_RATE};
