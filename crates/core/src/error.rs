// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Cannot establish or use a database connection. Never retried here.
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// A write would duplicate a unique key (`erp_code`, `business_number`)
    #[error("Unique constraint violation on {constraint}: {message}")]
    UniqueViolation { constraint: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    /// A status change that breaks the forward-only workflow
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True when the error is a duplicate `business_number` on write.
    ///
    /// Callers branch on this to answer "already registered" instead of
    /// reporting a generic failure.
    pub fn is_duplicate_business_number(&self) -> bool {
        matches!(
            self,
            AppError::UniqueViolation { constraint, .. } if constraint.contains("business_number")
        )
    }

    /// True for any unique-key violation
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, AppError::UniqueViolation { .. })
    }
}

impl From<crate::domain::DomainError> for AppError {
    fn from(err: crate::domain::DomainError) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;

    #[test]
    fn test_duplicate_business_number_detection() {
        let err = AppError::UniqueViolation {
            constraint: "business_registrations_business_number_key".to_string(),
            message: "duplicate key".to_string(),
        };
        assert!(err.is_unique_violation());
        assert!(err.is_duplicate_business_number());

        let err = AppError::UniqueViolation {
            constraint: "business_registrations_erp_code_key".to_string(),
            message: "duplicate key".to_string(),
        };
        assert!(err.is_unique_violation());
        assert!(!err.is_duplicate_business_number());
    }

    #[test]
    fn test_domain_error_maps_to_validation() {
        let err: AppError = DomainError::MissingField("client_name").into();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.to_string().contains("client_name"));
    }
}
