use thiserror::Error;

use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Authentication error: {0}")]
    Unauthorized(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("No rows returned from {0}")]
    EmptyResult(String),

    #[error("Refusing to delete from {0} without a filter")]
    UnfilteredDelete(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Unauthorized(msg) => AppError::Auth(msg),
            DatabaseError::NotFound(msg) => AppError::NotFound(msg),
            DatabaseError::Conflict(msg) => AppError::Conflict(msg),
            DatabaseError::Transport(e) => AppError::ExternalService(e.to_string()),
            other => AppError::Database(other.to_string()),
        }
    }
}
