// Domain error types - Secure error handling with no information disclosure

use thiserror::Error;

/// Main error type for the registrar kernel
#[derive(Error, Debug)]
pub enum RegistrarError {
    /// Target entity does not exist (HTTP 404)
    #[error("Not found")]
    NotFound,

    /// Payload violates a referential or shape constraint (HTTP 422)
    #[error("Validation failure: {0}")]
    Validation(String),

    /// Mutation violates a uniqueness invariant (HTTP 409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Missing, expired, malformed, or tampered credential (HTTP 401)
    #[error("Unauthorized")]
    Unauthorized,

    /// Authenticated caller lacks the required role (HTTP 403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Store or transaction failure unrelated to the data itself (HTTP 500)
    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl RegistrarError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            RegistrarError::NotFound => 404,
            RegistrarError::Validation(_) => 422,
            RegistrarError::Conflict(_) => 409,
            RegistrarError::Unauthorized => 401,
            RegistrarError::Forbidden(_) => 403,
            RegistrarError::Infrastructure(_) => 500,
        }
    }

    /// Get user-friendly error message (no sensitive information)
    ///
    /// Unauthorized is surfaced uniformly regardless of which check failed so
    /// a caller cannot probe whether an email, signature, or expiry check
    /// rejected the credential. Infrastructure detail stays in the logs.
    pub fn user_message(&self) -> String {
        match self {
            RegistrarError::NotFound => "Not found".to_string(),
            RegistrarError::Validation(detail) => format!("Validation failure: {}", detail),
            RegistrarError::Conflict(detail) => format!("Conflict: {}", detail),
            RegistrarError::Unauthorized => "Invalid credentials".to_string(),
            RegistrarError::Forbidden(reason) => format!("Forbidden: {}", reason),
            RegistrarError::Infrastructure(_) => "Internal error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(RegistrarError::NotFound.status_code(), 404);
        assert_eq!(RegistrarError::Validation("x".to_string()).status_code(), 422);
        assert_eq!(RegistrarError::Conflict("x".to_string()).status_code(), 409);
        assert_eq!(RegistrarError::Unauthorized.status_code(), 401);
        assert_eq!(RegistrarError::Forbidden("x".to_string()).status_code(), 403);
        assert_eq!(RegistrarError::Infrastructure("x".to_string()).status_code(), 500);
    }

    #[test]
    fn test_unauthorized_message_is_uniform() {
        // Message must not reveal which check rejected the credential
        let err = RegistrarError::Unauthorized;
        assert_eq!(err.user_message(), "Invalid credentials");
    }

    #[test]
    fn test_infrastructure_message_hides_detail() {
        let err = RegistrarError::Infrastructure("store poisoned at table users".to_string());
        let user_msg = err.user_message();
        assert!(!user_msg.contains("users"));
        assert_eq!(user_msg, "Internal error");
    }

    #[test]
    fn test_validation_detail_preserved() {
        let err = RegistrarError::Validation("unknown course id".to_string());
        assert!(err.user_message().contains("unknown course id"));
    }

    #[test]
    fn test_conflict_distinct_from_validation() {
        let conflict = RegistrarError::Conflict("already enrolled".to_string());
        let validation = RegistrarError::Validation("already enrolled".to_string());
        assert_ne!(conflict.status_code(), validation.status_code());
    }
}
