use chrono::{Duration, NaiveDateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::backend::UserBackend;
use crate::config::AccountsConfig;
use crate::email::normalize_email;
use crate::error::AccountError;
use crate::models::{Account, ActivationState, ResetState, UserId};
use crate::token::{generate_token, hash_token};

/// Map-backed directory. Good for development and testing; state is lost
/// when the process exits.
///
/// All state sits behind one lock, so every check-and-transition happens
/// under a single write guard.
#[derive(Clone)]
pub struct InMemoryUserBackend {
    state: Arc<RwLock<MemoryState>>,
    activation_ttl: Duration,
    reset_ttl: Duration,
}

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<UserId, Account>,
    /// normalized e-mail -> owner
    emails: HashMap<String, UserId>,
    /// token hash -> record
    activations: HashMap<String, ActivationRecord>,
    /// token hash -> record
    resets: HashMap<String, ResetRecord>,
}

struct ActivationRecord {
    user_id: UserId,
    state: ActivationState,
    created_at: NaiveDateTime,
}

struct ResetRecord {
    username: String,
    user_id: UserId,
    state: ResetState,
    expires_at: NaiveDateTime,
}

impl InMemoryUserBackend {
    pub fn new() -> Self {
        Self::from_config(&AccountsConfig::default())
    }

    pub fn from_config(config: &AccountsConfig) -> Self {
        Self::with_ttls(config.activation_ttl(), config.password_reset_ttl())
    }

    /// `activation_ttl` is the pending-sweep threshold, `reset_ttl` the
    /// lifetime of a password-reset token.
    pub fn with_ttls(activation_ttl: Duration, reset_ttl: Duration) -> Self {
        InMemoryUserBackend {
            state: Arc::new(RwLock::new(MemoryState::default())),
            activation_ttl,
            reset_ttl,
        }
    }

    /// Number of stored accounts.
    pub async fn len(&self) -> usize {
        self.state.read().await.accounts.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for InMemoryUserBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryState {
    fn require_account(&self, id: &UserId) -> Result<(), AccountError> {
        if self.accounts.contains_key(id) {
            Ok(())
        } else {
            Err(AccountError::NotFound(format!("account {} is not saved", id)))
        }
    }

    /// Pick a token whose hash is not already in use by either table.
    fn fresh_token(&self) -> (String, String) {
        loop {
            let raw = generate_token();
            let hash = hash_token(&raw);
            if !self.activations.contains_key(&hash) && !self.resets.contains_key(&hash) {
                return (raw, hash);
            }
        }
    }

    fn remove_account(&mut self, id: &UserId) {
        if let Some(account) = self.accounts.remove(id) {
            if let Some(key) = account.email_key() {
                if self.emails.get(&key) == Some(id) {
                    self.emails.remove(&key);
                }
            }
        }
        self.activations.retain(|_, record| &record.user_id != id);
        self.resets.retain(|_, record| &record.user_id != id);
    }
}

#[async_trait::async_trait]
impl UserBackend for InMemoryUserBackend {
    async fn find(&self, id: &UserId) -> Result<Option<Account>, AccountError> {
        Ok(self.state.read().await.accounts.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountError> {
        let Some(key) = normalize_email(email) else {
            return Ok(None);
        };
        let state = self.state.read().await;
        Ok(state
            .emails
            .get(&key)
            .and_then(|id| state.accounts.get(id))
            .cloned())
    }

    async fn save(&self, account: &Account) -> Result<(), AccountError> {
        account.id.validate()?;
        let new_key = account.email_key();
        let mut state = self.state.write().await;

        if let Some(key) = &new_key {
            if let Some(owner) = state.emails.get(key) {
                if owner != &account.id {
                    return Err(AccountError::Conflict(format!(
                        "email is already registered to {}",
                        owner
                    )));
                }
            }
        }

        let old_key = state.accounts.get(&account.id).and_then(Account::email_key);
        if let Some(old_key) = old_key {
            if Some(&old_key) != new_key.as_ref() {
                state.emails.remove(&old_key);
            }
        }
        if let Some(key) = new_key {
            state.emails.insert(key, account.id.clone());
        }
        state.accounts.insert(account.id.clone(), account.clone());

        tracing::debug!(user = %account.id, "account saved");
        Ok(())
    }

    async fn create_activation(&self, account: &Account) -> Result<String, AccountError> {
        let mut state = self.state.write().await;
        state.require_account(&account.id)?;

        let (raw, hash) = state.fresh_token();
        state.activations.insert(
            hash,
            ActivationRecord {
                user_id: account.id.clone(),
                state: ActivationState::Pending,
                created_at: Utc::now().naive_utc(),
            },
        );

        tracing::info!(user = %account.id, "activation token issued");
        Ok(raw)
    }

    async fn activate(&self, token: &str) -> Result<bool, AccountError> {
        let hash = hash_token(token);
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let Some(record) = state.activations.get_mut(&hash) else {
            tracing::warn!("activation rejected: unknown token");
            return Ok(false);
        };
        if record.state != ActivationState::Pending {
            tracing::warn!(user = %record.user_id, "activation rejected: token already consumed");
            return Ok(false);
        }
        let Some(account) = state.accounts.get_mut(&record.user_id) else {
            return Ok(false);
        };

        record.state = ActivationState::Consumed;
        account.email_verified = true;

        tracing::info!(user = %account.id, "account activated");
        Ok(true)
    }

    async fn create_password_reset(&self, account: &Account) -> Result<String, AccountError> {
        let mut state = self.state.write().await;
        state.require_account(&account.id)?;

        let (raw, hash) = state.fresh_token();
        state.resets.insert(
            hash,
            ResetRecord {
                username: account.username().to_string(),
                user_id: account.id.clone(),
                state: ResetState::Active,
                expires_at: Utc::now().naive_utc() + self.reset_ttl,
            },
        );

        tracing::info!(user = %account.id, "password reset token issued");
        Ok(raw)
    }

    async fn fetch_for_password_reset(
        &self,
        username: &str,
        token: &str,
    ) -> Result<Option<Account>, AccountError> {
        let hash = hash_token(token);
        let now = Utc::now().naive_utc();
        let state = self.state.read().await;

        let account = state
            .resets
            .get(&hash)
            .filter(|r| r.username == username)
            .filter(|r| r.state == ResetState::Active && r.expires_at > now)
            .and_then(|r| state.accounts.get(&r.user_id))
            .cloned();

        if account.is_none() {
            tracing::debug!(username, "password reset lookup found no active token");
        }
        Ok(account)
    }

    async fn disable_reset_code(&self, username: &str, token: &str) -> Result<bool, AccountError> {
        let hash = hash_token(token);
        let mut state = self.state.write().await;

        match state.resets.get_mut(&hash) {
            Some(record) if record.username == username && record.state == ResetState::Active => {
                record.state = ResetState::Disabled;
                tracing::info!(username, "password reset token disabled");
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_pending_activations(&self) -> Result<u64, AccountError> {
        let cutoff = Utc::now().naive_utc() - self.activation_ttl;
        let mut state = self.state.write().await;

        let stale: HashSet<UserId> = state
            .activations
            .values()
            .filter(|r| r.state == ActivationState::Pending && r.created_at <= cutoff)
            .filter(|r| {
                state
                    .accounts
                    .get(&r.user_id)
                    .is_some_and(|a| !a.email_verified)
            })
            .map(|r| r.user_id.clone())
            .collect();

        for id in &stale {
            state.remove_account(id);
        }

        let removed = stale.len() as u64;
        if removed > 0 {
            tracing::info!(removed, "pending activations swept");
        }
        Ok(removed)
    }

    async fn purge_spent_tokens(&self) -> Result<u64, AccountError> {
        let now = Utc::now().naive_utc();
        let mut state = self.state.write().await;
        let before = state.activations.len() + state.resets.len();

        state
            .activations
            .retain(|_, r| r.state == ActivationState::Pending);
        state
            .resets
            .retain(|_, r| r.state == ResetState::Active && r.expires_at > now);

        let purged = (before - state.activations.len() - state.resets.len()) as u64;
        if purged > 0 {
            tracing::debug!(purged, "spent tokens purged");
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_email_change_releases_old_address() {
        let backend = InMemoryUserBackend::new();
        let mut account = Account::userpass("alice", "alice@example.com", "hash");
        backend.save(&account).await.unwrap();

        account.email = Some("alice@new.example.com".to_string());
        backend.save(&account).await.unwrap();

        assert!(
            backend
                .find_by_email("alice@example.com")
                .await
                .unwrap()
                .is_none()
        );
        let other = Account::userpass("carol", "alice@example.com", "hash");
        backend.save(&other).await.expect("old address is free again");
    }

    #[tokio::test]
    async fn test_sweep_cascades_reset_tokens() {
        let backend = InMemoryUserBackend::with_ttls(Duration::zero(), Duration::hours(1));
        let account = Account::userpass("dave", "dave@example.com", "hash");
        backend.save(&account).await.unwrap();
        backend.create_activation(&account).await.unwrap();
        let reset = backend.create_password_reset(&account).await.unwrap();

        assert_eq!(backend.delete_pending_activations().await.unwrap(), 1);
        assert!(backend.is_empty().await);
        let state = backend.state.read().await;
        assert!(state.activations.is_empty());
        assert!(!state.resets.contains_key(&hash_token(&reset)));
    }

    #[tokio::test]
    async fn test_purge_keeps_redeemable_tokens() {
        let backend = InMemoryUserBackend::new();
        let account = Account::userpass("erin", "erin@example.com", "hash");
        backend.save(&account).await.unwrap();

        let consumed = backend.create_activation(&account).await.unwrap();
        assert!(backend.activate(&consumed).await.unwrap());
        let pending = backend.create_activation(&account).await.unwrap();
        let disabled = backend.create_password_reset(&account).await.unwrap();
        assert!(backend.disable_reset_code("erin", &disabled).await.unwrap());
        let active = backend.create_password_reset(&account).await.unwrap();

        assert_eq!(backend.purge_spent_tokens().await.unwrap(), 2);
        assert_eq!(backend.purge_spent_tokens().await.unwrap(), 0);

        let state = backend.state.read().await;
        assert!(state.activations.contains_key(&hash_token(&pending)));
        assert!(!state.activations.contains_key(&hash_token(&consumed)));
        assert!(state.resets.contains_key(&hash_token(&active)));
        assert!(!state.resets.contains_key(&hash_token(&disabled)));
    }
}
