//! HTTP request handlers.

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::config::ShiftFallback;
use crate::types::ResolutionDescriptor;

use super::error::ApiError;
use super::state::AppState;
use super::types::{HealthResponse, MessageResponse, ProcessRequest, ResolveRequest};

/// Response header reporting how the pitch shift was honoured.
pub const PITCH_SHIFT_HEADER: &str = "x-pitch-shift";

/// `GET /`
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Welcome to lambro-daemon".to_string(),
    })
}

/// `GET /keepalive`
pub async fn keepalive() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "alive".to_string(),
    })
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let gate = state.pipeline.gate();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cached_descriptors: state.resolver.cache().len(),
        transcode_slots_available: gate.available(),
        transcodes_waiting: gate.waiting(),
    })
}

/// `POST /resolve`
pub async fn resolve(
    State(state): State<AppState>,
    payload: Result<Json<ResolveRequest>, JsonRejection>,
) -> Result<Json<ResolutionDescriptor>, ApiError> {
    let Json(request) = payload?;
    let source = request.source_url.unwrap_or_default();

    let descriptor = state.resolver.resolve(&source).await?;
    Ok(Json(descriptor))
}

/// `POST /process`
///
/// Every failure up to the first streamed byte is answered with a JSON
/// error. Once the body starts, the response can only end early.
pub async fn process(
    State(state): State<AppState>,
    payload: Result<Json<ProcessRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = payload?;
    let request = body.into_processing_request()?;

    let audio = state.pipeline.run(&request).await?;
    let shift_header = match state.pipeline.fallback() {
        ShiftFallback::Annotate => Some(audio.shift.header_value()),
        ShiftFallback::PassThrough | ShiftFallback::Fail => None,
    };

    let mut response = Body::from_stream(audio.into_stream()).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("audio/wav"));
    if let Some(value) = shift_header {
        headers.insert(PITCH_SHIFT_HEADER, HeaderValue::from_static(value));
    }

    Ok(response)
}
