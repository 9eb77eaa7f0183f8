//! Request and response bodies of the HTTP API.
//!
//! Field names are camelCase; the snake_case names used by older clients
//! are accepted as aliases.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::ProcessingRequest;

/// Body of `POST /resolve`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    #[serde(alias = "url", alias = "source_url")]
    pub source_url: Option<String>,
}

/// Body of `POST /process`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    #[serde(alias = "audio_stream_url", alias = "source_stream_url")]
    pub source_stream_url: Option<String>,

    #[serde(alias = "target_frequency", alias = "target_frequency_hz")]
    pub target_frequency_hz: Option<f64>,

    #[serde(alias = "ai_preset", alias = "effect_preset_enabled")]
    pub effect_preset_enabled: Option<bool>,
}

impl ProcessRequest {
    /// Validates the body into a [`ProcessingRequest`].
    pub fn into_processing_request(self) -> Result<ProcessingRequest> {
        ProcessingRequest::new(
            self.source_stream_url,
            self.target_frequency_hz,
            self.effect_preset_enabled.unwrap_or(false),
        )
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub cached_descriptors: usize,
    pub transcode_slots_available: usize,
    pub transcodes_waiting: usize,
}

/// Body of the liveness and welcome endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
    pub code: String,
    /// What the client can do about it.
    pub hint: String,
}
