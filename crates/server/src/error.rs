//! JSON error responses for the HTTP surface.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use ordermate_core::errors::{ApplicationError, InterfaceError};

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub detail: String,
    pub correlation_id: String,
}

#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self(InterfaceError::NotFound { message: message.into(), correlation_id: correlation_id() })
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(InterfaceError::BadRequest { message: message.into(), correlation_id: correlation_id() })
    }
}

pub fn correlation_id() -> String {
    Uuid::new_v4().to_string()
}

impl From<ApplicationError> for ApiError {
    fn from(value: ApplicationError) -> Self {
        Self(value.into_interface(correlation_id()))
    }
}

// Extractor rejections are answered in the same JSON shape as every other
// failure, always as 400.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match &self.0 {
            InterfaceError::BadRequest { .. } => (StatusCode::BAD_REQUEST, "bad_request"),
            InterfaceError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            InterfaceError::Conflict { .. } => (StatusCode::CONFLICT, "conflict"),
            InterfaceError::ServiceUnavailable { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
            }
            InterfaceError::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        if status.is_server_error() {
            warn!(
                event_name = "http.request.failed",
                correlation_id = self.0.correlation_id(),
                error = %self.0,
                "request failed"
            );
        }

        // Server-side failures keep internals out of the body.
        let detail = if status.is_server_error() {
            self.0.user_message().to_string()
        } else {
            self.0.message().to_string()
        };

        let body = ErrorBody { error, detail, correlation_id: self.0.correlation_id().to_string() };
        (status, Json(body)).into_response()
    }
}
