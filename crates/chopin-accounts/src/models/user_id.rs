use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AccountError;

/// Identity key: an account's id as issued by one identity provider.
///
/// `provider` names the provider (`"userpass"`, `"github"`, ...), `id` is
/// the provider-scoped user id. For username/password accounts `id` is the
/// username that password-reset requests are scoped to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId {
    pub provider: String,
    pub id: String,
}

impl UserId {
    pub const USERPASS: &'static str = "userpass";

    pub fn new(provider: impl Into<String>, id: impl Into<String>) -> Self {
        UserId {
            provider: provider.into(),
            id: id.into(),
        }
    }

    /// Identity key for a username/password account.
    pub fn userpass(username: impl Into<String>) -> Self {
        UserId::new(Self::USERPASS, username)
    }

    /// Both halves must be non-blank.
    pub fn validate(&self) -> Result<(), AccountError> {
        if self.provider.trim().is_empty() {
            return Err(AccountError::Validation(
                "identity provider must not be empty".to_string(),
            ));
        }
        if self.id.trim().is_empty() {
            return Err(AccountError::Validation(
                "provider user id must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(UserId::new("github", "42").to_string(), "github:42");
        assert_eq!(UserId::userpass("alice").to_string(), "userpass:alice");
    }

    #[test]
    fn test_same_id_different_provider_is_distinct() {
        assert_ne!(UserId::new("github", "alice"), UserId::userpass("alice"));
    }

    #[test]
    fn test_validate_rejects_blank_parts() {
        assert!(UserId::new("", "x").validate().is_err());
        assert!(UserId::new("github", "  ").validate().is_err());
        assert!(UserId::userpass("bob").validate().is_ok());
    }
}
