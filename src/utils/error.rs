use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// The error taxonomy surfaced to every caller of this core: HTTP
/// handlers, the CLI, and the ingestion/retrieval coordinators
/// themselves. Each variant maps to exactly one HTTP status and one
/// CLI exit code (see `exit_code`).
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error("pipeline failed: {0}")]
    PipelineFailed(String),

    #[error("embed failed: {0}")]
    EmbedFailed(String),

    #[error("index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::PermissionDenied(_) => "permission_denied",
            CoreError::NotFound(_) => "not_found",
            CoreError::QuotaExceeded(_) => "quota_exceeded",
            CoreError::ValidationError(_) => "validation_error",
            CoreError::PayloadTooLarge(_) => "payload_too_large",
            CoreError::Duplicate(_) => "duplicate",
            CoreError::PipelineFailed(_) => "pipeline_failed",
            CoreError::EmbedFailed(_) => "embed_failed",
            CoreError::IndexUnavailable(_) => "index_unavailable",
            CoreError::Internal(_) => "internal",
        }
    }

    /// Exit code for the `kb` CLI surface: 0 success, 1 usage error,
    /// 2 authorization failure, 3 quota exceeded, 4 not found,
    /// 5 transient backend error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CoreError::PermissionDenied(_) => 2,
            CoreError::QuotaExceeded(_) => 3,
            CoreError::NotFound(_) => 4,
            CoreError::ValidationError(_) | CoreError::PayloadTooLarge(_) | CoreError::Duplicate(_) => 1,
            CoreError::PipelineFailed(_)
            | CoreError::EmbedFailed(_)
            | CoreError::IndexUnavailable(_)
            | CoreError::Internal(_) => 5,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            CoreError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            CoreError::ValidationError(_) => StatusCode::BAD_REQUEST,
            CoreError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            CoreError::Duplicate(_) => StatusCode::CONFLICT,
            CoreError::PipelineFailed(_) | CoreError::EmbedFailed(_) => StatusCode::BAD_GATEWAY,
            CoreError::IndexUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => CoreError::NotFound("row not found".into()),
            other => CoreError::IndexUnavailable(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for CoreError {
    fn from(e: anyhow::Error) -> Self {
        CoreError::Internal(e.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        match self.status() {
            StatusCode::INTERNAL_SERVER_ERROR | StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => {
                tracing::error!(kind = self.kind(), "{}", self);
            }
            _ => tracing::warn!(kind = self.kind(), "{}", self),
        }

        let body = Json(ErrorBody {
            error: self.kind().to_string(),
            message: self.to_string(),
        });

        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_kind_maps_to_a_distinct_exit_code_bucket() {
        assert_eq!(CoreError::PermissionDenied("x".into()).exit_code(), 2);
        assert_eq!(CoreError::QuotaExceeded("x".into()).exit_code(), 3);
        assert_eq!(CoreError::NotFound("x".into()).exit_code(), 4);
        assert_eq!(CoreError::ValidationError("x".into()).exit_code(), 1);
        assert_eq!(CoreError::IndexUnavailable("x".into()).exit_code(), 5);
        assert_eq!(CoreError::Internal("x".into()).exit_code(), 5);
    }

    #[test]
    fn kind_strings_match_the_taxonomy_names() {
        assert_eq!(CoreError::Duplicate("x".into()).kind(), "duplicate");
        assert_eq!(CoreError::EmbedFailed("x".into()).kind(), "embed_failed");
    }
}
