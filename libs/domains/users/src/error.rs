use http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("User '{0}' is already registered")]
    Conflict(String),

    #[error("Identity provider error: {0}")]
    Provider(String),

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type UserResult<T> = Result<T, UserError>;

impl From<validator::ValidationErrors> for UserError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl UserError {
    pub fn unauthenticated() -> Self {
        Self::Unauthenticated("Missing or invalid bearer token".to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            UserError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            UserError::BadRequest(_) => StatusCode::BAD_REQUEST,
            UserError::Conflict(_) => StatusCode::CONFLICT,
            UserError::Provider(_)
            | UserError::Database(_)
            | UserError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand back to the caller; internal details are only logged
    pub fn public_message(&self) -> String {
        if self.status_code().is_server_error() {
            tracing::error!(error = %self, "User operation failed");
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            UserError::unauthenticated().status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            UserError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            UserError::Conflict("u1".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            UserError::Provider("timeout".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_public_message_hides_internal_details() {
        let err = UserError::Internal("connection string leaked".into());
        assert_eq!(err.public_message(), "An internal error occurred");

        let err = UserError::BadRequest("firstName must not be empty".into());
        assert_eq!(err.public_message(), "firstName must not be empty");
    }
}
