use thiserror::Error;

/// Error type for the account directory and its token lifecycles.
///
/// "Not found" on a lookup or redemption is never an error: those paths
/// return `Ok(None)` or `Ok(false)`.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("UserService was not properly initialized: no backend bound")]
    NotConfigured,

    #[error("UserService backend is already bound")]
    AlreadyConfigured,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Mail delivery failed: {0}")]
    Mail(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl AccountError {
    /// Get the error code string for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AccountError::NotConfigured => "NOT_CONFIGURED",
            AccountError::AlreadyConfigured => "ALREADY_CONFIGURED",
            AccountError::NotFound(_) => "NOT_FOUND",
            AccountError::Conflict(_) => "CONFLICT",
            AccountError::Validation(_) => "VALIDATION_ERROR",
            AccountError::Mail(_) => "MAIL_ERROR",
            AccountError::Internal(_) => "INTERNAL_ERROR",
            AccountError::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Whether this is a configuration error (backend missing or bound twice).
    ///
    /// These are precondition violations of the process setup and should
    /// not be retried.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AccountError::NotConfigured | AccountError::AlreadyConfigured
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(AccountError::NotConfigured.error_code(), "NOT_CONFIGURED");
        assert_eq!(
            AccountError::Conflict("email".into()).error_code(),
            "CONFLICT"
        );
        assert_eq!(
            AccountError::Database(sea_orm::DbErr::Custom("down".into())).error_code(),
            "DATABASE_ERROR"
        );
    }

    #[test]
    fn test_configuration_classification() {
        assert!(AccountError::NotConfigured.is_configuration());
        assert!(AccountError::AlreadyConfigured.is_configuration());
        assert!(!AccountError::NotFound("x".into()).is_configuration());
    }

    #[test]
    fn test_db_err_converts() {
        let err: AccountError = sea_orm::DbErr::Custom("boom".into()).into();
        assert!(err.to_string().contains("boom"));
    }
}
