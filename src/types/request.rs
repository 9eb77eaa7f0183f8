//! ProcessingRequest type describing one retune-and-stream job.
//!
//! A request is validated once, when it is built; everything downstream can
//! rely on a non-empty source URL and a strictly positive target frequency.

use serde::Serialize;

use crate::error::{DaemonError, Result};

/// Reference pitch (A4) that target frequencies are measured against.
pub const BASE_FREQUENCY_HZ: f64 = 440.0;

/// Optional effect chain applied by the transcoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EffectPreset {
    /// No filter graph.
    #[default]
    None,
    /// Fixed echo chain.
    Echo,
}

impl EffectPreset {
    /// Returns the preset for the request's boolean flag.
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            EffectPreset::Echo
        } else {
            EffectPreset::None
        }
    }

    /// Returns the ffmpeg audio filter graph for this preset.
    pub fn filter_graph(&self) -> Option<&'static str> {
        match self {
            EffectPreset::None => None,
            EffectPreset::Echo => Some("aecho=0.8:0.88:60:0.4"),
        }
    }
}

/// A validated request to transcode, retune and stream one audio source.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingRequest {
    /// Direct audio stream URL, usually a descriptor's playable URL.
    pub source_stream_url: String,

    /// Desired frequency for the reference A4, if retuning.
    pub target_frequency_hz: Option<f64>,

    /// Effect chain applied during transcoding.
    pub effect: EffectPreset,
}

impl ProcessingRequest {
    /// Validates raw request fields and builds a request.
    ///
    /// Rejects an empty source URL and any target frequency that is not a
    /// finite number strictly above zero.
    pub fn new(
        source_stream_url: Option<String>,
        target_frequency_hz: Option<f64>,
        effect_preset_enabled: bool,
    ) -> Result<Self> {
        let source_stream_url = source_stream_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| DaemonError::invalid_request("sourceStreamUrl is required"))?;

        // ffmpeg would otherwise open local paths and its own pseudo-protocols
        if !is_remote_url(&source_stream_url) {
            return Err(DaemonError::invalid_request(
                "sourceStreamUrl must be an http or https URL",
            ));
        }

        if let Some(hz) = target_frequency_hz {
            if !hz.is_finite() || hz <= 0.0 {
                return Err(DaemonError::invalid_request(
                    "Invalid targetFrequencyHz value. Must be a positive number.",
                ));
            }
        }

        Ok(Self {
            source_stream_url,
            target_frequency_hz,
            effect: EffectPreset::from_enabled(effect_preset_enabled),
        })
    }

    /// Returns the semitone shift implied by the target frequency.
    pub fn semitone_shift(&self) -> f64 {
        self.target_frequency_hz.map(semitones_for).unwrap_or(0.0)
    }
}

fn is_remote_url(url: &str) -> bool {
    let lowered = url.to_ascii_lowercase();
    ["http://", "https://"]
        .iter()
        .any(|scheme| lowered.len() > scheme.len() && lowered.starts_with(scheme))
}

/// Computes `12 * log2(target / 440)`.
///
/// Non-positive or non-finite targets yield no shift.
pub fn semitones_for(target_hz: f64) -> f64 {
    if !target_hz.is_finite() || target_hz <= 0.0 {
        return 0.0;
    }
    12.0 * (target_hz / BASE_FREQUENCY_HZ).log2()
}
