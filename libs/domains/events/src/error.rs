//! Event domain error types

use domain_users::UserError;
use http::StatusCode;
use thiserror::Error;

/// Result type for event operations
pub type Result<T> = std::result::Result<T, EventError>;

/// Event domain errors
#[derive(Debug, Error)]
pub enum EventError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    /// Missing data and missing permission look the same to the caller
    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    User(#[from] UserError),

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] mongodb::bson::de::Error),
}

impl From<validator::ValidationErrors> for EventError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl EventError {
    pub fn event_not_found() -> Self {
        Self::NotFound("This event could not be found or you do not have access to it".to_string())
    }

    pub fn user_not_found() -> Self {
        Self::NotFound(
            "No user by this id exists or you do not have access to them".to_string(),
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            EventError::BadRequest(_) => StatusCode::BAD_REQUEST,
            EventError::Forbidden(_) => StatusCode::FORBIDDEN,
            EventError::NotFound(_) => StatusCode::NOT_FOUND,
            EventError::User(e) => e.status_code(),
            EventError::Database(_) | EventError::Deserialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to hand back to the caller; internal details are only logged
    pub fn public_message(&self) -> String {
        match self {
            EventError::User(e) => e.public_message(),
            _ if self.status_code().is_server_error() => {
                tracing::error!(error = %self, "Event operation failed");
                "An internal error occurred".to_string()
            }
            _ => self.to_string(),
        }
    }
}
