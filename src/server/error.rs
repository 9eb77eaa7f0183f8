//! Mapping of daemon errors onto HTTP responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::error::DaemonError;

use super::types::ErrorBody;

/// Error returned by handlers; renders as `{detail, code, hint}` JSON.
#[derive(Debug)]
pub struct ApiError(pub DaemonError);

impl From<DaemonError> for ApiError {
    fn from(err: DaemonError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(DaemonError::invalid_request(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = StatusCode::from_u16(err.code.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                code = %err.code,
                kind = err.code.description(),
                exit_code = ?err.exit_code,
                error = %err.message,
                "request failed"
            );
        } else {
            tracing::info!(code = %err.code, kind = err.code.description(), error = %err.message, "request rejected");
        }

        (
            status,
            Json(ErrorBody {
                detail: err.detail(),
                code: err.code.as_str().to_string(),
                hint: err.code.recovery_hint().to_string(),
            }),
        )
            .into_response()
    }
}
