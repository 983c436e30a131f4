//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors become a JSON body of the form
//! `{"error": "..."}` with a matching status code.
//!
//! Database and internal errors are logged with full detail; the caller only
//! sees a generic message so SQL and file paths never leak.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use parley_core::{CoreError, GenerationError};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// All errors that can occur in the parley-server request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The request body or query failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// The caller referenced a user or conversation that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The generation pipeline failed.
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),

    /// Propagated from the store.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// An unclassified internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CoreError> for ServerError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Validation(m) => ServerError::Validation(m),
            CoreError::NotFound(m) => ServerError::NotFound(m),
            CoreError::Generation(g) => ServerError::Generation(g),
            CoreError::Database(d) => ServerError::Database(d),
            CoreError::Document(d) => ServerError::Internal(format!("stored document is invalid: {d}")),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match &self {
            // Client-facing errors: expose the message directly.
            ServerError::Validation(m) => (StatusCode::UNPROCESSABLE_ENTITY, m.clone()),
            ServerError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),

            ServerError::Generation(e @ GenerationError::Service(_)) => {
                warn!(error = %e, "model invocation failed");
                (StatusCode::BAD_GATEWAY, format!("Model invocation failed: {e}"))
            }
            ServerError::Generation(e) => {
                error!(error = %e, "generation pipeline returned unusable output");
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Model invocation failed: {e}"))
            }

            ServerError::Database(e) => {
                error!(error = %e, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
            ServerError::Internal(m) => {
                error!(message = %m, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn status_of(err: ServerError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn core_errors_map_to_statuses() {
        assert_eq!(
            status_of(CoreError::Validation("x".into()).into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(CoreError::NotFound("x".into()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(CoreError::Generation(GenerationError::Service("down".into())).into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(
                CoreError::Generation(GenerationError::MalformedResponse("123".into())).into()
            ),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(CoreError::Database(sqlx::Error::RowNotFound).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
