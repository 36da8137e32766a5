//! Registration entry point.
//!
//! Order within one request: validate, check duplicates, hash, stage in the
//! pending store, then dispatch the verification email. The email is never
//! awaited; the response is ready as soon as the entry is staged.

use log::error;
use serde::Serialize;

use super::credentials::{ConfirmationToken, RegistrationCredentials};
use super::duplicates::find_conflict;
use super::error::RegistrationError;
use super::validation::validate_credentials;
use crate::modules::context::AppContext;
use crate::modules::email::DeliveryHandle;
use crate::modules::storage::PendingRegistration;
use crate::modules::utils::logging::{
    format_sensitive, log_data_operation, log_registration_event,
};
use crate::REGISTRATION_SUCCESS_MESSAGE;

/// Shape returned to callers of the registration entry point
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationResponse {
    pub message: String,
    pub error: bool,
}

impl RegistrationResponse {
    pub fn success() -> Self {
        Self {
            message: REGISTRATION_SUCCESS_MESSAGE.to_string(),
            error: false,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: true,
        }
    }
}

/// A registration that made it into the pending store
pub struct StagedRegistration {
    pub token: ConfirmationToken,
    pub delivery: DeliveryHandle,
}

/// Run the registration workflow, returning typed errors
pub async fn stage_registration(
    ctx: &AppContext,
    credentials: RegistrationCredentials,
) -> Result<StagedRegistration, RegistrationError> {
    validate_credentials(&credentials)?;

    let username = credentials.username.trim().to_string();
    let email = credentials.email.trim().to_string();

    if find_conflict(ctx.users.as_ref(), &username, &email)
        .await?
        .is_some()
    {
        return Err(RegistrationError::Conflict);
    }

    let hashed_password = ctx.hasher.hash_async(credentials.password.clone()).await?;

    let token = ConfirmationToken::generate();
    let pending = PendingRegistration {
        username,
        email,
        hashed_password,
    };
    ctx.pending.put(&token, &pending, ctx.pending_ttl).await?;
    log_data_operation(
        "stage_registration",
        &pending.username,
        "pending_store",
        true,
        Some(&format!("ttl={}s", ctx.pending_ttl.as_secs())),
    );

    let delivery = ctx.dispatcher.dispatch(&credentials, &token);

    Ok(StagedRegistration { token, delivery })
}

/// Registration entry point that also hands back the delivery handle
/// when the caller wants to observe the email outcome.
pub async fn register_with_delivery(
    ctx: &AppContext,
    credentials: RegistrationCredentials,
) -> (RegistrationResponse, Option<DeliveryHandle>) {
    let username = credentials.username.trim().to_string();

    match stage_registration(ctx, credentials).await {
        Ok(staged) => {
            log_registration_event("register", &username, true, Some("pending confirmation"));
            (RegistrationResponse::success(), Some(staged.delivery))
        }
        Err(e) => {
            match &e {
                RegistrationError::Validation(_) | RegistrationError::Conflict => {
                    log_registration_event("register", &username, false, Some(&e.to_string()));
                }
                _ => error!(
                    "Registration failed: user={}, error={}",
                    format_sensitive(&username),
                    e
                ),
            }
            (RegistrationResponse::failure(e.user_message()), None)
        }
    }
}

/// Registration entry point. Never fails; every error becomes `error: true`.
pub async fn register(ctx: &AppContext, credentials: RegistrationCredentials) -> RegistrationResponse {
    // Dropping the handle detaches the send; it still runs and logs its outcome
    register_with_delivery(ctx, credentials).await.0
}
