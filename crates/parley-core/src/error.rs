//! Error type shared by the stores and the conversation workflow.

use thiserror::Error;

use crate::pipeline::GenerationError;

/// All errors surfaced by parley-core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The caller supplied invalid input (e.g. an empty user name).
    #[error("{0}")]
    Validation(String),

    /// The referenced user or conversation does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The generation pipeline failed or returned unusable output.
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// Propagated from the database driver.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored JSON document could not be encoded or decoded.
    #[error("document error: {0}")]
    Document(#[from] serde_json::Error),
}

impl CoreError {
    pub(crate) fn user_not_found(id: i64) -> Self {
        CoreError::NotFound(format!("No profile with id={id}"))
    }

    pub(crate) fn conversation_not_found(id: i64) -> Self {
        CoreError::NotFound(format!("No conversation with id={id}"))
    }
}
