//! Pitch shifting of decoded audio.
//!
//! The [`PitchStage`] wraps a [`PitchShifter`] implementation and owns the
//! identity short-circuit and the fallback to unshifted audio. The bundled
//! [`GranularPitchShifter`] transposes without changing duration by reading
//! the signal through two crossfaded taps whose delay sweeps at the shift
//! rate.

use std::f64::consts::PI;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::{DaemonError, Result};
use crate::types::SampleBuffer;

/// Default crossfade window length in seconds.
pub const DEFAULT_WINDOW_SECS: f64 = 0.05;

/// Semitone transposition of channel-major audio.
///
/// Implementations receive one vector per channel and must return the same
/// number of channels, each with the same length as its input.
pub trait PitchShifter: Send + Sync {
    /// Shifts every channel by `semitones` at the given sample rate.
    fn shift(&self, channels: &[Vec<f32>], sample_rate: u32, semitones: f64)
        -> Result<Vec<Vec<f32>>>;
}

/// Duration-preserving pitch shifter using two crossfaded delay taps.
#[derive(Debug, Clone)]
pub struct GranularPitchShifter {
    window_secs: f64,
}

impl GranularPitchShifter {
    /// Creates a shifter with the default 50 ms window.
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW_SECS)
    }

    /// Creates a shifter with a custom window length in seconds.
    pub fn with_window(window_secs: f64) -> Self {
        Self { window_secs }
    }

    fn shift_channel(input: &[f32], window: f64, ratio: f64) -> Vec<f32> {
        let mut output = Vec::with_capacity(input.len());
        let step = (1.0 - ratio) / window;
        let mut phase = 0.0f64;

        for t in 0..input.len() {
            let mut acc = 0.0f64;
            for offset in [0.0, 0.5] {
                let tap = (phase + offset).rem_euclid(1.0);
                let position = t as f64 - tap * window;
                // sin² and cos² windows sum to one across the two taps
                let gain = (PI * tap).sin().powi(2);
                acc += gain * read_interpolated(input, position);
            }
            output.push(acc as f32);
            phase = (phase + step).rem_euclid(1.0);
        }

        output
    }
}

impl Default for GranularPitchShifter {
    fn default() -> Self {
        Self::new()
    }
}

impl PitchShifter for GranularPitchShifter {
    fn shift(
        &self,
        channels: &[Vec<f32>],
        sample_rate: u32,
        semitones: f64,
    ) -> Result<Vec<Vec<f32>>> {
        if !semitones.is_finite() {
            return Err(DaemonError::effect_failed(format!(
                "semitone shift {} is not finite",
                semitones
            )));
        }
        if sample_rate == 0 {
            return Err(DaemonError::effect_failed("sample rate is zero"));
        }

        let window = (self.window_secs * sample_rate as f64).round().max(2.0);
        let ratio = 2f64.powf(semitones / 12.0);

        Ok(channels
            .iter()
            .map(|channel| Self::shift_channel(channel, window, ratio))
            .collect())
    }
}

/// Reads `input` at a fractional position with linear interpolation.
///
/// Positions before the start of the signal read as silence.
fn read_interpolated(input: &[f32], position: f64) -> f64 {
    if position < 0.0 || input.is_empty() {
        return 0.0;
    }
    let index = position.floor() as usize;
    if index >= input.len() {
        return 0.0;
    }
    let frac = position - index as f64;
    let a = input[index] as f64;
    let b = input.get(index + 1).copied().unwrap_or(0.0) as f64;
    a + frac * (b - a)
}

/// How a pitch shift request was honoured.
#[derive(Debug, Clone, PartialEq)]
pub enum ShiftStatus {
    /// The DSP ran and its output is being used.
    Applied,
    /// No shift was needed.
    Skipped,
    /// The DSP failed; the unshifted audio is being used.
    FellBack(String),
}

impl ShiftStatus {
    /// Value reported in the `x-pitch-shift` response header.
    pub fn header_value(&self) -> &'static str {
        match self {
            ShiftStatus::Applied => "applied",
            ShiftStatus::Skipped => "skipped",
            ShiftStatus::FellBack(_) => "fallback",
        }
    }
}

/// Result of the pitch-shift stage.
#[derive(Debug, Clone)]
pub struct ShiftOutcome {
    pub buffer: SampleBuffer,
    pub status: ShiftStatus,
}

/// Applies a [`PitchShifter`] to interleaved buffers.
#[derive(Clone)]
pub struct PitchStage {
    shifter: Arc<dyn PitchShifter>,
}

impl PitchStage {
    /// Creates a stage around the given shifter.
    pub fn new(shifter: Arc<dyn PitchShifter>) -> Self {
        Self { shifter }
    }

    /// Shifts `buffer` by `semitones`.
    ///
    /// A shift of exactly zero returns the buffer untouched without calling
    /// the shifter. Any DSP failure, including a panic or output of the wrong
    /// shape, yields the original buffer with [`ShiftStatus::FellBack`].
    pub fn apply(&self, buffer: SampleBuffer, semitones: f64) -> ShiftOutcome {
        if semitones == 0.0 {
            return ShiftOutcome {
                buffer,
                status: ShiftStatus::Skipped,
            };
        }

        let planar = buffer.to_planar();
        let frames = buffer.frames();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.shifter.shift(&planar, buffer.sample_rate, semitones)
        }));

        let shifted = match result {
            Ok(Ok(shifted)) => check_shape(shifted, planar.len(), frames),
            Ok(Err(e)) => Err(e.message),
            Err(_) => Err("pitch shifter panicked".to_string()),
        };

        match shifted {
            Ok(channels) => ShiftOutcome {
                buffer: SampleBuffer::from_planar(&channels, buffer.sample_rate),
                status: ShiftStatus::Applied,
            },
            Err(reason) => {
                tracing::warn!(semitones, reason = %reason, "pitch shift failed, using unshifted audio");
                ShiftOutcome {
                    buffer,
                    status: ShiftStatus::FellBack(reason),
                }
            }
        }
    }
}

fn check_shape(
    shifted: Vec<Vec<f32>>,
    channels: usize,
    frames: usize,
) -> std::result::Result<Vec<Vec<f32>>, String> {
    if shifted.len() != channels {
        return Err(format!(
            "shifter returned {} channels, expected {}",
            shifted.len(),
            channels
        ));
    }
    if let Some(bad) = shifted.iter().find(|c| c.len() != frames) {
        return Err(format!(
            "shifter returned {} frames, expected {}",
            bad.len(),
            frames
        ));
    }
    if shifted.iter().flatten().any(|s| !s.is_finite()) {
        return Err("shifter returned non-finite samples".to_string());
    }
    Ok(shifted)
}
