use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pulsedeck_core::error::OverviewError;
use serde::Serialize;

/// Caller-facing error: a status plus a stable machine-readable code.
/// Dependency failures are reported to Sentry here and surface only a generic
/// message, never the underlying query error.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'static str,
    message: &'a str,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn service_unavailable() -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "service_unavailable",
            "database is not available",
        )
    }

    pub fn rate_limited() -> Self {
        Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "too many requests for this workspace",
        )
    }
}

impl From<OverviewError> for ApiError {
    fn from(err: OverviewError) -> Self {
        let code = err.code();
        match err {
            OverviewError::Validation { .. } => {
                Self::new(StatusCode::BAD_REQUEST, code, err.to_string())
            }
            OverviewError::WorkspaceNotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, code, err.to_string())
            }
            OverviewError::Dependency(cause) => {
                let cause = anyhow::Error::new(cause);
                tracing::error!(error = %cause, "overview query failed");
                sentry_anyhow::capture_anyhow(&cause);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, code, "internal error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.code,
            message: &self.message,
        });
        (self.status, body).into_response()
    }
}
