//! Confirmation Handler.
//!
//! A token moves from Pending to exactly one of Confirmed, Expired or
//! Conflict. The pending entry is consumed with a single atomic take, so of
//! several concurrent confirmations only one can see it; the repository's own
//! uniqueness check closes the remaining window between the duplicate lookup
//! and the insert.

use log::error;

use super::credentials::ConfirmationToken;
use super::duplicates::find_conflict;
use super::error::ConfirmationError;
use crate::modules::context::AppContext;
use crate::modules::storage::{RepositoryError, TakeOutcome, User};
use crate::modules::utils::logging::log_registration_event;

/// Promote the pending registration behind `token` into a durable user
pub async fn confirm_registration(
    ctx: &AppContext,
    token: &ConfirmationToken,
) -> Result<User, ConfirmationError> {
    let registration = match ctx.pending.take(token).await? {
        TakeOutcome::Found(registration) => registration,
        TakeOutcome::Expired => {
            log_registration_event("confirm", &token.to_string(), false, Some("expired"));
            return Err(ConfirmationError::Expired);
        }
        TakeOutcome::Missing => {
            log_registration_event("confirm", &token.to_string(), false, Some("not found"));
            return Err(ConfirmationError::NotFound);
        }
    };

    // Another registration for this identity may have been confirmed first
    if find_conflict(ctx.users.as_ref(), &registration.username, &registration.email)
        .await?
        .is_some()
    {
        log_registration_event(
            "confirm",
            &registration.username,
            false,
            Some("identity taken while pending"),
        );
        return Err(ConfirmationError::Conflict);
    }

    match ctx.users.create_user(&registration).await {
        Ok(user) => {
            log_registration_event("confirm", &user.username, true, Some("user created"));
            Ok(user)
        }
        Err(RepositoryError::Conflict) => {
            log_registration_event(
                "confirm",
                &registration.username,
                false,
                Some("identity taken during insert"),
            );
            Err(ConfirmationError::Conflict)
        }
        Err(e) => {
            // The entry is already consumed; the user has to register again
            error!("Failed to persist confirmed user: {}", e);
            Err(e.into())
        }
    }
}

/// Confirm from the raw token carried by a link or typed code.
///
/// Strings that cannot be a token are reported as `NotFound`.
pub async fn confirm_from_link(ctx: &AppContext, raw_token: &str) -> Result<User, ConfirmationError> {
    match raw_token.parse::<ConfirmationToken>() {
        Ok(token) => confirm_registration(ctx, &token).await,
        Err(_) => {
            log_registration_event("confirm", raw_token, false, Some("malformed token"));
            Err(ConfirmationError::NotFound)
        }
    }
}
