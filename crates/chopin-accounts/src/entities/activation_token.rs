use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Activation token issued at registration. Only the hash is stored.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activation_tokens")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Hash of the token value
    #[sea_orm(unique)]
    pub token_hash: String,

    /// Identity key of the account being activated
    pub provider: String,
    pub provider_user_id: String,

    /// "pending" or "consumed"
    pub state: String,

    pub created_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
