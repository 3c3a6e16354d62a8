use thiserror::Error;

/// Failure as presented to the patient. Every variant degrades to a
/// non-blocking notice except `Auth`, which sends the screen back to login.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn requires_login(&self) -> bool {
        matches!(self, AppError::Auth(_))
    }

    pub fn user_message(&self) -> String {
        let message = match self {
            AppError::Auth(_) => "Your session has ended. Please log in again.".to_string(),
            AppError::Conflict(_) => "This slot is already booked.".to_string(),
            AppError::Network(_) => {
                "Could not reach the hospital server. Please try again.".to_string()
            }
            AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::ValidationError(msg)
            | AppError::ExternalService(msg)
            | AppError::Internal(msg) => msg.clone(),
        };

        tracing::debug!("Presenting notice: {}", self);
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_auth_requires_login() {
        assert!(AppError::Auth("expired".into()).requires_login());
        assert!(!AppError::Conflict("taken".into()).requires_login());
        assert!(!AppError::Network("down".into()).requires_login());
    }

    #[test]
    fn test_conflict_has_targeted_message() {
        let notice = AppError::Conflict("slot taken".into()).user_message();
        assert_eq!(notice, "This slot is already booked.");
    }

    #[test]
    fn test_backend_message_passes_through() {
        let notice = AppError::BadRequest("Reason is required".into()).user_message();
        assert_eq!(notice, "Reason is required");
    }
}
