use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

/// Caller-facing failures. Messages are safe to show; upstream diagnostics are
/// logged where the failure is detected and never carried into the body.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthenticated,

    #[error("The trip planner is temporarily unavailable, please try again")]
    UpstreamUnavailable,

    #[error("The trip planner returned an unusable answer, please try again")]
    SchemaViolation,

    #[error("Failed to save: {0}")]
    PersistenceFailure(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    fn error_type(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "invalid_request_error",
            AppError::Unauthenticated => "authentication_error",
            AppError::UpstreamUnavailable => "upstream_unavailable",
            AppError::SchemaViolation => "schema_violation",
            AppError::PersistenceFailure(_) => "persistence_error",
            AppError::Internal(_) => "api_error",
        }
    }
}

#[derive(Serialize)]
struct JsonError {
    message: String,
    r#type: String,
}

#[derive(Serialize)]
struct JsonErrorWrapper {
    error: JsonError,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::UpstreamUnavailable
            | AppError::SchemaViolation
            | AppError::PersistenceFailure(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let error_response = JsonErrorWrapper {
            error: JsonError {
                message: self.to_string(),
                r#type: self.error_type().to_string(),
            },
        };
        HttpResponse::build(status_code).json(error_response)
    }
}
