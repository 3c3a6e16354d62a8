use reqwest::StatusCode;
use thiserror::Error;

use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Authentication error: {0}")]
    Unauthorized(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("API error ({status}): {message}")]
    Status { status: StatusCode, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

impl ApiError {
    pub(crate) fn from_status(status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized(message),
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            StatusCode::CONFLICT => ApiError::Conflict(message),
            _ => ApiError::Status { status, message },
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiError::Conflict(_))
    }

    /// The human-readable message the backend sent with a failed response.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::Status { message: msg, .. } => Some(msg.as_str()),
            _ => None,
        }
    }
}

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized(msg) => AppError::Auth(msg),
            ApiError::NotFound(msg) => AppError::NotFound(msg),
            ApiError::Conflict(msg) => AppError::Conflict(msg),
            ApiError::Status { status, message } if status.is_client_error() => {
                AppError::BadRequest(message)
            }
            ApiError::Status { message, .. } => AppError::ExternalService(message),
            ApiError::Transport(e) => AppError::Network(e.to_string()),
            ApiError::Decode(_) => {
                AppError::ExternalService("Unexpected response from server".to_string())
            }
            ApiError::NotConfigured(msg) => AppError::Internal(msg),
        }
    }
}
