use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::UserId;
use crate::email::normalize_email;
use crate::error::AccountError;

/// How the account authenticates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthMethod {
    #[serde(rename = "oauth1")]
    OAuth1,
    #[serde(rename = "oauth2")]
    OAuth2,
    #[serde(rename = "openid")]
    OpenId,
    #[serde(rename = "user_password")]
    UserPassword,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::OAuth1 => "oauth1",
            AuthMethod::OAuth2 => "oauth2",
            AuthMethod::OpenId => "openid",
            AuthMethod::UserPassword => "user_password",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMethod {
    type Err = AccountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "oauth1" => Ok(AuthMethod::OAuth1),
            "oauth2" => Ok(AuthMethod::OAuth2),
            "openid" => Ok(AuthMethod::OpenId),
            "user_password" => Ok(AuthMethod::UserPassword),
            other => Err(AccountError::Internal(format!(
                "unknown auth method: {}",
                other
            ))),
        }
    }
}

/// A registered user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: UserId,

    pub display_name: String,

    pub email: Option<String>,

    #[serde(default)]
    pub email_verified: bool,

    pub avatar_url: Option<String>,

    pub auth_method: AuthMethod,

    /// Opaque credential owned by the authentication layer (never serialized)
    #[serde(skip_serializing, default)]
    pub password: Option<String>,

    pub last_access: Option<NaiveDateTime>,

    #[serde(default)]
    pub profile: BTreeMap<String, String>,
}

impl Account {
    pub fn new(id: UserId, display_name: impl Into<String>, auth_method: AuthMethod) -> Self {
        Account {
            id,
            display_name: display_name.into(),
            email: None,
            email_verified: false,
            avatar_url: None,
            auth_method,
            password: None,
            last_access: None,
            profile: BTreeMap::new(),
        }
    }

    /// A username/password account that still needs e-mail verification.
    pub fn userpass(
        username: impl Into<String>,
        email: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        let username = username.into();
        let mut account = Account::new(
            UserId::userpass(username.clone()),
            username,
            AuthMethod::UserPassword,
        );
        account.email = Some(email.into());
        account.password = Some(credential.into());
        account
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.profile.insert(key.into(), value.into());
        self
    }

    /// The username password-reset requests are scoped to.
    pub fn username(&self) -> &str {
        &self.id.id
    }

    /// Normalized e-mail used as the lookup key, if any.
    pub fn email_key(&self) -> Option<String> {
        self.email.as_deref().and_then(normalize_email)
    }

    /// Stamp `last_access` with the current time. Callers save afterwards.
    pub fn touch(&mut self) {
        self.last_access = Some(Utc::now().naive_utc());
    }
}
