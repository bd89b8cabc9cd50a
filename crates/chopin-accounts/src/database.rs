use chrono::{Duration, Utc};
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, SqlErr, TransactionTrait,
};
use std::collections::BTreeSet;

use crate::backend::UserBackend;
use crate::config::AccountsConfig;
use crate::email::normalize_email;
use crate::entities::{account, activation_token, password_reset_token};
use crate::error::AccountError;
use crate::models::{Account, ActivationState, ResetState, UserId};
use crate::token::{generate_token, hash_token};

/// Attempts at issuing a token before a hash collision is reported.
const MAX_ISSUE_ATTEMPTS: usize = 3;

/// Relational directory on top of sea-orm (SQLite, PostgreSQL, MySQL).
///
/// Run [`crate::migrations::Migrator`] before use. State transitions are
/// conditional updates; a redemption wins only if its
/// `UPDATE ... WHERE state = 'pending'` touched exactly one row.
///
/// Every transaction opens with a write, never a read. On SQLite a
/// deferred transaction that reads first and writes later fails with
/// `SQLITE_BUSY` under contention instead of waiting out the busy timeout.
#[derive(Clone)]
pub struct SeaOrmUserBackend {
    db: DatabaseConnection,
    activation_ttl: Duration,
    reset_ttl: Duration,
}

enum TokenKind {
    Activation,
    Reset,
}

impl SeaOrmUserBackend {
    pub fn new(db: DatabaseConnection, config: &AccountsConfig) -> Self {
        Self::with_ttls(db, config.activation_ttl(), config.password_reset_ttl())
    }

    pub fn with_ttls(db: DatabaseConnection, activation_ttl: Duration, reset_ttl: Duration) -> Self {
        SeaOrmUserBackend {
            db,
            activation_ttl,
            reset_ttl,
        }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Insert a token row for a saved account, retrying on a hash collision.
    async fn issue(&self, account: &Account, kind: TokenKind) -> Result<String, AccountError> {
        for _ in 0..MAX_ISSUE_ATTEMPTS {
            let raw = generate_token();
            match self.try_issue(account, &kind, &raw).await {
                Ok(()) => return Ok(raw),
                Err(AccountError::Database(err)) if is_unique_violation(&err) => {
                    tracing::warn!(user = %account.id, "token hash collision, regenerating");
                }
                Err(err) => return Err(err),
            }
        }
        Err(AccountError::Internal(
            "could not issue a unique token".to_string(),
        ))
    }

    /// Insert the token row with `INSERT ... SELECT ... FROM accounts`, so
    /// the existence check and the write are one statement. No row inserted
    /// means the account is not saved.
    async fn try_issue(
        &self,
        account: &Account,
        kind: &TokenKind,
        raw: &str,
    ) -> Result<(), AccountError> {
        let now = Utc::now().naive_utc();
        let provider = account.id.provider.as_str();
        let user_id = account.id.id.as_str();

        let mut insert = Query::insert();
        let values = match kind {
            TokenKind::Activation => {
                insert.into_table(activation_token::Entity).columns([
                    activation_token::Column::TokenHash,
                    activation_token::Column::Provider,
                    activation_token::Column::ProviderUserId,
                    activation_token::Column::State,
                    activation_token::Column::CreatedAt,
                ]);
                vec![
                    Expr::val(hash_token(raw)),
                    Expr::val(provider),
                    Expr::val(user_id),
                    Expr::val(ActivationState::Pending.as_str()),
                    Expr::val(now),
                ]
            }
            TokenKind::Reset => {
                insert.into_table(password_reset_token::Entity).columns([
                    password_reset_token::Column::TokenHash,
                    password_reset_token::Column::Username,
                    password_reset_token::Column::Provider,
                    password_reset_token::Column::ProviderUserId,
                    password_reset_token::Column::State,
                    password_reset_token::Column::ExpiresAt,
                    password_reset_token::Column::CreatedAt,
                ]);
                vec![
                    Expr::val(hash_token(raw)),
                    Expr::val(account.username()),
                    Expr::val(provider),
                    Expr::val(user_id),
                    Expr::val(ResetState::Active.as_str()),
                    Expr::val(now + self.reset_ttl),
                    Expr::val(now),
                ]
            }
        };

        let mut source = Query::select();
        source
            .exprs(values)
            .from(account::Entity)
            .and_where(account::Column::Provider.eq(provider))
            .and_where(account::Column::ProviderUserId.eq(user_id));
        insert
            .select_from(source)
            .map_err(|e| AccountError::Internal(format!("Failed to build token insert: {}", e)))?;

        let backend = self.db.get_database_backend();
        let result = self.db.execute(backend.build(&insert)).await?;
        if result.rows_affected() == 0 {
            return Err(AccountError::NotFound(format!(
                "account {} is not saved",
                account.id
            )));
        }
        Ok(())
    }

    /// Update the stored row for `account`. Returns `false` if there is none.
    async fn update_existing(
        &self,
        account: &Account,
        mut model: account::ActiveModel,
    ) -> Result<bool, AccountError> {
        model.provider = NotSet;
        model.provider_user_id = NotSet;
        model.created_at = NotSet;

        match account::Entity::update_many()
            .set(model)
            .filter(account::Column::Provider.eq(account.id.provider.as_str()))
            .filter(account::Column::ProviderUserId.eq(account.id.id.as_str()))
            .exec(&self.db)
            .await
        {
            Ok(result) => Ok(result.rows_affected > 0),
            Err(err) if is_unique_violation(&err) => Err(email_taken()),
            Err(err) => Err(err.into()),
        }
    }

    /// Remove one stale pending account. Returns whether it was removed.
    ///
    /// Token rows are touched before the account row, the same order
    /// `activate` uses. If the account turns out to be verified the whole
    /// transaction is rolled back.
    async fn sweep_one(&self, id: &UserId) -> Result<bool, AccountError> {
        let txn = self.db.begin().await?;

        activation_token::Entity::delete_many()
            .filter(activation_token::Column::Provider.eq(id.provider.as_str()))
            .filter(activation_token::Column::ProviderUserId.eq(id.id.as_str()))
            .filter(activation_token::Column::State.eq(ActivationState::Pending.as_str()))
            .exec(&txn)
            .await?;

        let deleted = account::Entity::delete_many()
            .filter(account::Column::Provider.eq(id.provider.as_str()))
            .filter(account::Column::ProviderUserId.eq(id.id.as_str()))
            .filter(account::Column::EmailVerified.eq(false))
            .exec(&txn)
            .await?;

        if deleted.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(false);
        }

        activation_token::Entity::delete_many()
            .filter(activation_token::Column::Provider.eq(id.provider.as_str()))
            .filter(activation_token::Column::ProviderUserId.eq(id.id.as_str()))
            .exec(&txn)
            .await?;
        password_reset_token::Entity::delete_many()
            .filter(password_reset_token::Column::Provider.eq(id.provider.as_str()))
            .filter(password_reset_token::Column::ProviderUserId.eq(id.id.as_str()))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(true)
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn email_taken() -> AccountError {
    AccountError::Conflict("email is already registered to another account".to_string())
}

#[async_trait::async_trait]
impl UserBackend for SeaOrmUserBackend {
    async fn find(&self, id: &UserId) -> Result<Option<Account>, AccountError> {
        account::Entity::find_by_id((id.provider.clone(), id.id.clone()))
            .one(&self.db)
            .await?
            .map(Account::try_from)
            .transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountError> {
        let Some(key) = normalize_email(email) else {
            return Ok(None);
        };
        account::Entity::find()
            .filter(account::Column::EmailKey.eq(key))
            .one(&self.db)
            .await?
            .map(Account::try_from)
            .transpose()
    }

    async fn save(&self, account: &Account) -> Result<(), AccountError> {
        account.id.validate()?;
        let model = account::active_model(account, Utc::now().naive_utc())?;

        if let Some(key) = account.email_key() {
            let owner = account::Entity::find()
                .filter(account::Column::EmailKey.eq(key))
                .one(&self.db)
                .await?;
            if let Some(owner) = owner {
                if owner.provider != account.id.provider
                    || owner.provider_user_id != account.id.id
                {
                    return Err(AccountError::Conflict(format!(
                        "email is already registered to {}:{}",
                        owner.provider, owner.provider_user_id
                    )));
                }
            }
        }

        if !self.update_existing(account, model.clone()).await? {
            match account::Entity::insert(model.clone())
                .exec_without_returning(&self.db)
                .await
            {
                Ok(_) => {}
                // Either a concurrent first save of the same account got in
                // first, or the e-mail was taken after the check above.
                Err(err) if is_unique_violation(&err) => {
                    if !self.update_existing(account, model).await? {
                        return Err(email_taken());
                    }
                }
                Err(err) => return Err(err.into()),
            }
        }

        tracing::debug!(user = %account.id, "account saved");
        Ok(())
    }

    async fn create_activation(&self, account: &Account) -> Result<String, AccountError> {
        let token = self.issue(account, TokenKind::Activation).await?;
        tracing::info!(user = %account.id, "activation token issued");
        Ok(token)
    }

    async fn activate(&self, token: &str) -> Result<bool, AccountError> {
        let hash = hash_token(token);
        let txn = self.db.begin().await?;

        let consumed = activation_token::Entity::update_many()
            .col_expr(
                activation_token::Column::State,
                Expr::value(ActivationState::Consumed.as_str()),
            )
            .filter(activation_token::Column::TokenHash.eq(hash.as_str()))
            .filter(activation_token::Column::State.eq(ActivationState::Pending.as_str()))
            .exec(&txn)
            .await?;

        if consumed.rows_affected != 1 {
            txn.rollback().await?;
            tracing::warn!("activation rejected: unknown or consumed token");
            return Ok(false);
        }

        let Some(record) = activation_token::Entity::find()
            .filter(activation_token::Column::TokenHash.eq(hash.as_str()))
            .one(&txn)
            .await?
        else {
            txn.rollback().await?;
            return Ok(false);
        };

        let verified = account::Entity::update_many()
            .col_expr(account::Column::EmailVerified, Expr::value(true))
            .col_expr(
                account::Column::UpdatedAt,
                Expr::value(Utc::now().naive_utc()),
            )
            .filter(account::Column::Provider.eq(record.provider.as_str()))
            .filter(account::Column::ProviderUserId.eq(record.provider_user_id.as_str()))
            .exec(&txn)
            .await?;

        if verified.rows_affected == 0 {
            txn.rollback().await?;
            tracing::warn!("activation rejected: account no longer exists");
            return Ok(false);
        }

        txn.commit().await?;
        tracing::info!(
            user = %UserId::new(record.provider, record.provider_user_id),
            "account activated"
        );
        Ok(true)
    }

    async fn create_password_reset(&self, account: &Account) -> Result<String, AccountError> {
        let token = self.issue(account, TokenKind::Reset).await?;
        tracing::info!(user = %account.id, "password reset token issued");
        Ok(token)
    }

    async fn fetch_for_password_reset(
        &self,
        username: &str,
        token: &str,
    ) -> Result<Option<Account>, AccountError> {
        let now = Utc::now().naive_utc();
        let record = password_reset_token::Entity::find()
            .filter(password_reset_token::Column::TokenHash.eq(hash_token(token)))
            .filter(password_reset_token::Column::Username.eq(username))
            .filter(password_reset_token::Column::State.eq(ResetState::Active.as_str()))
            .filter(password_reset_token::Column::ExpiresAt.gt(now))
            .one(&self.db)
            .await?;

        let Some(record) = record else {
            tracing::debug!(username, "password reset lookup found no active token");
            return Ok(None);
        };

        self.find(&UserId::new(record.provider, record.provider_user_id))
            .await
    }

    async fn disable_reset_code(&self, username: &str, token: &str) -> Result<bool, AccountError> {
        let result = password_reset_token::Entity::update_many()
            .col_expr(
                password_reset_token::Column::State,
                Expr::value(ResetState::Disabled.as_str()),
            )
            .filter(password_reset_token::Column::TokenHash.eq(hash_token(token)))
            .filter(password_reset_token::Column::Username.eq(username))
            .filter(password_reset_token::Column::State.eq(ResetState::Active.as_str()))
            .exec(&self.db)
            .await?;

        let disabled = result.rows_affected == 1;
        if disabled {
            tracing::info!(username, "password reset token disabled");
        }
        Ok(disabled)
    }

    async fn delete_pending_activations(&self) -> Result<u64, AccountError> {
        let cutoff = Utc::now().naive_utc() - self.activation_ttl;

        let stale: BTreeSet<UserId> = activation_token::Entity::find()
            .filter(activation_token::Column::State.eq(ActivationState::Pending.as_str()))
            .filter(activation_token::Column::CreatedAt.lte(cutoff))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|r| UserId::new(r.provider, r.provider_user_id))
            .collect();

        let mut removed = 0;
        for id in &stale {
            if self.sweep_one(id).await? {
                tracing::debug!(user = %id, "pending account removed");
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!(removed, "pending activations swept");
        }
        Ok(removed)
    }

    async fn purge_spent_tokens(&self) -> Result<u64, AccountError> {
        let now = Utc::now().naive_utc();

        let activations = activation_token::Entity::delete_many()
            .filter(activation_token::Column::State.eq(ActivationState::Consumed.as_str()))
            .exec(&self.db)
            .await?;
        let resets = password_reset_token::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(password_reset_token::Column::State.eq(ResetState::Disabled.as_str()))
                    .add(password_reset_token::Column::ExpiresAt.lte(now)),
            )
            .exec(&self.db)
            .await?;

        let purged = activations.rows_affected + resets.rows_affected;
        if purged > 0 {
            tracing::debug!(purged, "spent tokens purged");
        }
        Ok(purged)
    }
}
