use chrono::NaiveDateTime;
use sea_orm::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::AccountError;
use crate::models::{self, UserId};

/// Stored account row, keyed by (provider, provider_user_id).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub provider: String,

    #[sea_orm(primary_key, auto_increment = false)]
    pub provider_user_id: String,

    pub display_name: String,

    /// E-mail as entered by the user
    pub email: Option<String>,

    /// Normalized e-mail used for lookups
    #[sea_orm(unique)]
    pub email_key: Option<String>,

    #[sea_orm(default_value = false)]
    pub email_verified: bool,

    pub avatar_url: Option<String>,

    pub auth_method: String,

    /// Opaque credential (excluded from serialization)
    #[serde(skip_serializing)]
    pub password: Option<String>,

    pub last_access: Option<NaiveDateTime>,

    /// Profile attributes as a JSON object
    pub profile: String,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for models::Account {
    type Error = AccountError;

    fn try_from(row: Model) -> Result<Self, Self::Error> {
        let profile: BTreeMap<String, String> = serde_json::from_str(&row.profile)
            .map_err(|e| AccountError::Internal(format!("Corrupt profile column: {}", e)))?;

        Ok(models::Account {
            id: UserId::new(row.provider, row.provider_user_id),
            display_name: row.display_name,
            email: row.email,
            email_verified: row.email_verified,
            avatar_url: row.avatar_url,
            auth_method: row.auth_method.parse()?,
            password: row.password,
            last_access: row.last_access,
            profile,
        })
    }
}

/// Build a fully-set active model for `account`, stamped with `now`.
pub fn active_model(account: &models::Account, now: NaiveDateTime) -> Result<ActiveModel, AccountError> {
    let profile = serde_json::to_string(&account.profile)
        .map_err(|e| AccountError::Internal(format!("Profile serialize error: {}", e)))?;

    Ok(ActiveModel {
        provider: Set(account.id.provider.clone()),
        provider_user_id: Set(account.id.id.clone()),
        display_name: Set(account.display_name.clone()),
        email: Set(account.email.clone()),
        email_key: Set(account.email_key()),
        email_verified: Set(account.email_verified),
        avatar_url: Set(account.avatar_url.clone()),
        auth_method: Set(account.auth_method.as_str().to_string()),
        password: Set(account.password.clone()),
        last_access: Set(account.last_access),
        profile: Set(profile),
        created_at: Set(now),
        updated_at: Set(now),
    })
}
