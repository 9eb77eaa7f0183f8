//! ResolutionDescriptor type representing a resolved media source.
//!
//! A descriptor is created once per successful resolution and is immutable
//! afterwards; the resolution cache hands out clones of it.

use serde::{Deserialize, Serialize};

/// Title used when the backend does not report one.
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// A successfully resolved, directly fetchable audio stream for a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionDescriptor {
    /// Source URL the descriptor was resolved from. Used as the cache key.
    #[serde(skip_serializing, default)]
    pub identifier: String,

    /// Direct audio URL ffmpeg can read. Never empty.
    pub playable_stream_url: String,

    /// Media title.
    pub title: String,

    /// Media duration in seconds, 0 when unknown.
    pub duration_seconds: f64,

    /// Thumbnail image URL, when the backend exposes one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl ResolutionDescriptor {
    /// Creates a descriptor, normalizing missing or invalid metadata.
    ///
    /// Returns `None` when `playable_stream_url` is empty: an unresolved
    /// source never produces a descriptor.
    pub fn new(
        identifier: impl Into<String>,
        playable_stream_url: impl Into<String>,
        title: Option<String>,
        duration_seconds: Option<f64>,
        thumbnail_url: Option<String>,
    ) -> Option<Self> {
        let playable_stream_url = playable_stream_url.into();
        if playable_stream_url.trim().is_empty() {
            return None;
        }

        let title = title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string());

        let duration_seconds = duration_seconds
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(0.0);

        Some(Self {
            identifier: identifier.into(),
            playable_stream_url,
            title,
            duration_seconds,
            thumbnail_url: thumbnail_url.filter(|t| !t.trim().is_empty()),
        })
    }
}
