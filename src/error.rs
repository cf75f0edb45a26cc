use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    response::{IntoResponse, Response},
    Json,
    http::StatusCode,
};
use serde::Serialize;

#[derive(Serialize)]
pub struct ErrorResponse {
    detail: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Failed to fetch page: {0}")]
    FetchError(String),

    #[error("Could not extract readable content: {0}")]
    ExtractionError(String),

    #[error("Summarization failed: {0}")]
    SummarizationError(String),

    #[error("Translation failed: {0}")]
    TranslationError(String),

    #[error("Daily summarization limit of {0} requests reached, try again tomorrow")]
    RateLimitExceeded(u32),

    #[error("{0}")]
    NotFoundError(String),

    #[error("Datastore error: {0}")]
    PersistenceError(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Authentication service error: {0}")]
    AuthServiceError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::FetchError(_)
            | AppError::ExtractionError(_)
            | AppError::InvalidInput(_)
            | AppError::AuthError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFoundError(_) => StatusCode::NOT_FOUND,
            AppError::RateLimitExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::SummarizationError(_)
            | AppError::TranslationError(_)
            | AppError::PersistenceError(_)
            | AppError::AuthServiceError(_)
            | AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), "{}", self);
        } else {
            tracing::info!(status = status.as_u16(), "{}", self);
        }

        let body = Json(ErrorResponse {
            detail: self.to_string(),
        });

        (status, body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<std::env::VarError> for AppError {
    fn from(err: std::env::VarError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_4xx() {
        assert_eq!(AppError::FetchError("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::ExtractionError("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotFoundError("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::RateLimitExceeded(10).status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(AppError::AuthError("x".into()).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn upstream_errors_map_to_500() {
        for err in [
            AppError::SummarizationError("x".into()),
            AppError::TranslationError("x".into()),
            AppError::PersistenceError("x".into()),
            AppError::AuthServiceError("x".into()),
        ] {
            assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}
