use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;
use uuid::Uuid;

use crate::services::ai_service::ProviderError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Quiz {0} has expired")]
    QuizExpired(Uuid),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

const TRY_AGAIN_LATER: &str = "Failed to generate quiz. Please try again later.";
const TRY_DIFFERENT_TOPIC: &str =
    "Failed to generate quiz. Please try a different topic or try again later.";

impl Error {
    /// Whether a failure on the generation path may be answered with a
    /// fallback quiz. Validation and configuration problems never are.
    pub fn is_generation_failure(&self) -> bool {
        matches!(
            self,
            Error::Generation(_)
                | Error::Provider(
                    ProviderError::Transport { .. }
                        | ProviderError::Status { .. }
                        | ProviderError::EmptyResponse { .. }
                )
        )
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = match self {
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Error::Validation(err) => (StatusCode::BAD_REQUEST, "validation_error", err.to_string()),
            Error::Json(err) => (StatusCode::BAD_REQUEST, "bad_request", err.to_string()),
            Error::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            Error::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            Error::QuizExpired(_) => (
                StatusCode::GONE,
                "quiz_expired",
                "This quiz is no longer valid. Please generate a new quiz.".to_string(),
            ),
            Error::Provider(ProviderError::MissingCredentials { family }) => {
                tracing::error!(family = %family, "Provider credentials are not configured");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "generation_unavailable",
                    "Quiz generation is not available for this model. Please try again later."
                        .to_string(),
                )
            }
            Error::Provider(err) => {
                tracing::warn!(error = %err, "Quiz generation provider failed");
                (StatusCode::BAD_GATEWAY, "generation_failed", TRY_AGAIN_LATER.to_string())
            }
            Error::Generation(reason) => {
                tracing::warn!(reason = %reason, "Quiz generation produced no usable quiz");
                (StatusCode::BAD_GATEWAY, "generation_failed", TRY_DIFFERENT_TOPIC.to_string())
            }
            Error::Config(msg) => {
                tracing::error!("Configuration error: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "service_unavailable",
                    "Service is not configured correctly. Please try again later.".to_string(),
                )
            }
            other => {
                tracing::error!(error = ?other, "Internal failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An unexpected error occurred. Please try again later.".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": code, "message": message }));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            other => Error::Database(other),
        }
    }
}
