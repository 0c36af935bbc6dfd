//! Maps the portal error taxonomy onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use portal_core::PortalError;
use tracing::{error, warn};

use crate::models::ErrorResponse;

/// Handler-facing error: every failure is recovered here into a structured
/// JSON body.
#[derive(Debug)]
pub struct ApiError(pub PortalError);

impl From<PortalError> for ApiError {
    fn from(err: PortalError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::BAD_GATEWAY);

        match self.0 {
            // Engine replies go back untouched.
            PortalError::Upstream { body, .. } if body.is_null() => status.into_response(),
            PortalError::Upstream { body, .. } => (status, Json(body)).into_response(),
            err => {
                if status.is_server_error() {
                    error!(error = %err, "Request failed");
                } else {
                    warn!(error = %err, code = err.code(), "Request rejected");
                }
                let code = err.code().to_string();
                let message = err.to_string();
                let fields = match err {
                    PortalError::Validation(fields) => Some(fields),
                    _ => None,
                };
                (
                    status,
                    Json(ErrorResponse {
                        error: code,
                        message,
                        fields,
                    }),
                )
                    .into_response()
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
