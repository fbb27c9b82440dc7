use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::corpus::CorpusError;
use crate::retrieval::RetrievalError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Corpus error: {0}")]
    Corpus(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<RetrievalError> for AppError {
    fn from(e: RetrievalError) -> Self {
        AppError::CollaboratorUnavailable(e.to_string())
    }
}

impl From<CorpusError> for AppError {
    fn from(e: CorpusError) -> Self {
        match e {
            CorpusError::Io { .. } => AppError::Internal(anyhow::Error::new(e)),
            other => AppError::Corpus(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::CollaboratorUnavailable(msg) => {
                tracing::error!("Collaborator unavailable: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "COLLABORATOR_UNAVAILABLE",
                    msg.clone(),
                )
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "LLM_ERROR",
                    "The narrative service could not be reached".to_string(),
                )
            }
            AppError::Corpus(msg) => {
                tracing::warn!("Corpus rejected: {msg}");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "CORPUS_ERROR",
                    msg.clone(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
