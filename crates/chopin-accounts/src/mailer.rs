use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::AccountError;

/// External collaborator that delivers activation and reset links.
///
/// The directory only produces the token; building the link and sending
/// the message is up to the implementation.
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send_activation(&self, email: &str, token: &str) -> Result<(), AccountError>;

    async fn send_password_reset(
        &self,
        email: &str,
        username: &str,
        token: &str,
    ) -> Result<(), AccountError>;
}

/// Mailer that only records the delivery in the log (development).
///
/// Token values are not logged.
#[derive(Clone, Default)]
pub struct TracingMailer;

#[async_trait::async_trait]
impl Mailer for TracingMailer {
    async fn send_activation(&self, email: &str, _token: &str) -> Result<(), AccountError> {
        tracing::info!(email, "activation email would be sent");
        Ok(())
    }

    async fn send_password_reset(
        &self,
        email: &str,
        username: &str,
        _token: &str,
    ) -> Result<(), AccountError> {
        tracing::info!(email, username, "password reset email would be sent");
        Ok(())
    }
}

/// A message captured by [`OutboxMailer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SentMail {
    Activation {
        email: String,
        token: String,
    },
    PasswordReset {
        email: String,
        username: String,
        token: String,
    },
}

/// Mailer that keeps every message in memory. Useful in tests.
#[derive(Clone, Default)]
pub struct OutboxMailer {
    sent: Arc<Mutex<Vec<SentMail>>>,
}

impl OutboxMailer {
    pub fn new() -> Self {
        OutboxMailer::default()
    }

    pub async fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().await.clone()
    }

    /// Token of the most recent message, if any.
    pub async fn last_token(&self) -> Option<String> {
        self.sent.lock().await.last().map(|mail| match mail {
            SentMail::Activation { token, .. } => token.clone(),
            SentMail::PasswordReset { token, .. } => token.clone(),
        })
    }
}

#[async_trait::async_trait]
impl Mailer for OutboxMailer {
    async fn send_activation(&self, email: &str, token: &str) -> Result<(), AccountError> {
        self.sent.lock().await.push(SentMail::Activation {
            email: email.to_string(),
            token: token.to_string(),
        });
        Ok(())
    }

    async fn send_password_reset(
        &self,
        email: &str,
        username: &str,
        token: &str,
    ) -> Result<(), AccountError> {
        self.sent.lock().await.push(SentMail::PasswordReset {
            email: email.to_string(),
            username: username.to_string(),
            token: token.to_string(),
        });
        Ok(())
    }
}
