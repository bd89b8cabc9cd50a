//! Registration and password-reset flows built on [`UserService`] and a
//! [`Mailer`].

use crate::error::AccountError;
use crate::mailer::Mailer;
use crate::models::Account;
use crate::service::UserService;

/// Register an account that must verify its e-mail.
///
/// Saves the account unverified, issues an activation token and mails it.
/// Returns the token so callers can build their own link if they need to.
pub async fn sign_up(
    service: &UserService,
    mailer: &dyn Mailer,
    mut account: Account,
) -> Result<String, AccountError> {
    let Some(email) = account.email.clone().filter(|e| !e.trim().is_empty()) else {
        return Err(AccountError::Validation(
            "an email address is required for activation".to_string(),
        ));
    };

    account.email_verified = false;
    service.save(&account).await?;
    let token = service.create_activation(&account).await?;
    mailer.send_activation(&email, &token).await?;

    tracing::info!(user = %account.id, "sign-up started, awaiting activation");
    Ok(token)
}

/// Mail a reset token to the account registered with `email`.
///
/// Unknown addresses succeed without sending anything, so the caller's
/// response does not reveal which addresses are registered.
pub async fn request_password_reset(
    service: &UserService,
    mailer: &dyn Mailer,
    email: &str,
) -> Result<(), AccountError> {
    let Some(account) = service.find_by_email(email).await? else {
        tracing::debug!("password reset requested for unknown email");
        return Ok(());
    };

    let token = service.create_password_reset(&account).await?;
    let address = account.email.as_deref().unwrap_or(email);
    mailer
        .send_password_reset(address, account.username(), &token)
        .await
}

/// Store a new credential for the holder of a valid reset token and
/// disable the token. Returns the updated account, or `None` if the token
/// is unknown, disabled or expired.
///
/// The token is claimed before the credential is written, so concurrent
/// completions with the same token store at most one credential. If the
/// save fails after the claim the token stays spent and the user has to
/// request a new one.
pub async fn complete_password_reset(
    service: &UserService,
    username: &str,
    token: &str,
    new_credential: String,
) -> Result<Option<Account>, AccountError> {
    let Some(mut account) = service.fetch_for_password_reset(username, token).await? else {
        tracing::warn!(username, "password reset rejected");
        return Ok(None);
    };

    if !service.disable_reset_code(username, token).await? {
        tracing::warn!(username, "password reset rejected: token claimed by another request");
        return Ok(None);
    }

    account.password = Some(new_credential);
    service.save(&account).await?;

    tracing::info!(user = %account.id, "password reset completed");
    Ok(Some(account))
}
