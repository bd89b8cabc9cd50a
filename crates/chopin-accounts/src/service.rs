use std::sync::{Arc, OnceLock};

use crate::backend::UserBackend;
use crate::error::AccountError;
use crate::models::{Account, UserId};

/// Entry point for looking up users and driving the activation and
/// password-reset lifecycles, independent of the storage backend.
///
/// The backend is bound exactly once, at startup, and read lock-free
/// afterwards. Clones share the same binding, so the service can be put in
/// application state and handed to every request.
///
/// ```rust,ignore
/// let service = UserService::new();
/// service.bind(SeaOrmUserBackend::new(db, &config))?;
///
/// // In your handler:
/// if let Some(account) = service.find_by_email(&payload.email).await? {
///     let token = service.create_password_reset(&account).await?;
///     mailer.send_password_reset(&email, account.username(), &token).await?;
/// }
/// ```
///
/// Every operation on an unbound service fails with
/// [`AccountError::NotConfigured`].
#[derive(Clone, Default)]
pub struct UserService {
    backend: Arc<OnceLock<Arc<dyn UserBackend>>>,
}

impl UserService {
    /// Create a service with no backend bound yet.
    pub fn new() -> Self {
        UserService::default()
    }

    /// Create a service already bound to `backend`.
    pub fn with_backend(backend: impl UserBackend + 'static) -> Self {
        let service = UserService::new();
        // A fresh OnceLock cannot already be set.
        let _ = service.backend.set(Arc::new(backend));
        service
    }

    /// Bind the backend. Fails with [`AccountError::AlreadyConfigured`] on
    /// a second call; the first binding stays in place.
    pub fn bind(&self, backend: impl UserBackend + 'static) -> Result<(), AccountError> {
        self.bind_arc(Arc::new(backend))
    }

    /// Bind a backend that is shared with other owners.
    pub fn bind_arc(&self, backend: Arc<dyn UserBackend>) -> Result<(), AccountError> {
        self.backend.set(backend).map_err(|_| {
            tracing::error!("attempted to bind a second UserService backend");
            AccountError::AlreadyConfigured
        })?;
        tracing::info!("UserService backend bound");
        Ok(())
    }

    pub fn is_bound(&self) -> bool {
        self.backend.get().is_some()
    }

    fn backend(&self) -> Result<&dyn UserBackend, AccountError> {
        match self.backend.get() {
            Some(backend) => Ok(backend.as_ref()),
            None => {
                tracing::warn!("UserService used before a backend was bound");
                Err(AccountError::NotConfigured)
            }
        }
    }

    /// Find the account bound to an identity key.
    pub async fn find(&self, id: &UserId) -> Result<Option<Account>, AccountError> {
        self.backend()?.find(id).await
    }

    /// Find the account registered with an e-mail address.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountError> {
        self.backend()?.find_by_email(email).await
    }

    /// Insert or update an account.
    pub async fn save(&self, account: &Account) -> Result<(), AccountError> {
        self.backend()?.save(account).await
    }

    /// Issue an activation token to embed in the welcome e-mail.
    pub async fn create_activation(&self, account: &Account) -> Result<String, AccountError> {
        self.backend()?.create_activation(account).await
    }

    /// Mark the account behind `token` as verified. `true` only for the
    /// first redemption of a pending token.
    pub async fn activate(&self, token: &str) -> Result<bool, AccountError> {
        self.backend()?.activate(token).await
    }

    /// Issue a password-reset token to embed in the reset e-mail.
    pub async fn create_password_reset(&self, account: &Account) -> Result<String, AccountError> {
        self.backend()?.create_password_reset(account).await
    }

    pub async fn fetch_for_password_reset(
        &self,
        username: &str,
        token: &str,
    ) -> Result<Option<Account>, AccountError> {
        self.backend()?.fetch_for_password_reset(username, token).await
    }

    /// Disable a reset token. `true` only for the caller whose call
    /// disabled it, so it can double as a claim on the token.
    pub async fn disable_reset_code(
        &self,
        username: &str,
        token: &str,
    ) -> Result<bool, AccountError> {
        self.backend()?.disable_reset_code(username, token).await
    }

    /// Delete accounts whose activation was never completed.
    pub async fn delete_pending_activations(&self) -> Result<u64, AccountError> {
        self.backend()?.delete_pending_activations().await
    }

    /// Remove consumed, disabled and expired token records.
    pub async fn purge_spent_tokens(&self) -> Result<u64, AccountError> {
        self.backend()?.purge_spent_tokens().await
    }
}
