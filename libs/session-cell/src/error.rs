use thiserror::Error;

use shared_api::ApiError;
use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum SessionError {
    /// No usable credential; the caller should route to the login screen.
    #[error("No active session")]
    MissingSession,

    #[error("Login failed: {0}")]
    LoginRejected(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Stored session is corrupt: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::MissingSession => AppError::Auth("No active session".to_string()),
            SessionError::LoginRejected(msg) => AppError::Auth(msg),
            SessionError::ValidationError(msg) => AppError::ValidationError(msg),
            SessionError::Storage(e) => AppError::Internal(e.to_string()),
            SessionError::Serialization(e) => AppError::Internal(e.to_string()),
            SessionError::Api(e) => e.into(),
        }
    }
}
