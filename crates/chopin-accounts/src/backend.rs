use crate::error::AccountError;
use crate::models::{Account, UserId};

/// Storage-backed implementation of the account directory and its token
/// lifecycles.
///
/// Lookups and redemptions report "no match" as `Ok(None)` / `Ok(false)`;
/// `Err` is reserved for backend faults, which must be propagated rather
/// than swallowed. Every method may be called concurrently and each one
/// must apply its state change atomically: a token is never left
/// half-consumed.
///
/// Token lifecycles:
///
/// ```text
/// activation:  (none) --create_activation--> pending --activate--> consumed
/// reset:       (none) --create_password_reset--> active --disable_reset_code--> disabled
/// ```
///
/// Terminal states have no outgoing transitions.
#[async_trait::async_trait]
pub trait UserBackend: Send + Sync {
    /// Find the account bound to an identity key.
    async fn find(&self, id: &UserId) -> Result<Option<Account>, AccountError>;

    /// Find the account with the given e-mail (see [`crate::email`] for
    /// the matching policy).
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountError>;

    /// Insert or update an account, keyed by its identity key.
    ///
    /// Does not touch activation or reset tokens. Fails with
    /// [`AccountError::Conflict`] if the e-mail belongs to another account.
    async fn save(&self, account: &Account) -> Result<(), AccountError>;

    /// Issue a pending activation token for a saved account.
    async fn create_activation(&self, account: &Account) -> Result<String, AccountError>;

    /// Redeem an activation token. Returns `true` exactly once per token;
    /// unknown and consumed tokens both return `false`.
    async fn activate(&self, token: &str) -> Result<bool, AccountError>;

    /// Issue an active password-reset token scoped to the account's username.
    async fn create_password_reset(&self, account: &Account) -> Result<String, AccountError>;

    /// Return the account for an active, unexpired `(username, token)` pair.
    /// Does not disable the token.
    async fn fetch_for_password_reset(
        &self,
        username: &str,
        token: &str,
    ) -> Result<Option<Account>, AccountError>;

    /// Disable a reset token. Returns `true` only for the call that moved
    /// the token from active to disabled; unknown or already-disabled pairs
    /// are a no-op returning `false`.
    async fn disable_reset_code(&self, username: &str, token: &str) -> Result<bool, AccountError>;

    /// Remove unverified accounts whose activation has been pending longer
    /// than the backend's threshold, together with their activation tokens.
    /// Returns the number of accounts removed.
    async fn delete_pending_activations(&self) -> Result<u64, AccountError>;

    /// Drop token records that can never be redeemed again: consumed
    /// activations and disabled or expired reset tokens. Pending
    /// activations are left for [`UserBackend::delete_pending_activations`].
    /// Returns the number of records removed.
    async fn purge_spent_tokens(&self) -> Result<u64, AccountError>;
}
