use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::AccountError;

/// State of an activation token. `Consumed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationState {
    Pending,
    Consumed,
}

impl ActivationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivationState::Pending => "pending",
            ActivationState::Consumed => "consumed",
        }
    }
}

impl FromStr for ActivationState {
    type Err = AccountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ActivationState::Pending),
            "consumed" => Ok(ActivationState::Consumed),
            other => Err(AccountError::Internal(format!(
                "unknown activation state: {}",
                other
            ))),
        }
    }
}

/// State of a password-reset token. `Disabled` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetState {
    Active,
    Disabled,
}

impl ResetState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResetState::Active => "active",
            ResetState::Disabled => "disabled",
        }
    }
}

impl FromStr for ResetState {
    type Err = AccountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ResetState::Active),
            "disabled" => Ok(ResetState::Disabled),
            other => Err(AccountError::Internal(format!(
                "unknown reset state: {}",
                other
            ))),
        }
    }
}
