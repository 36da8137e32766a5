//! Error taxonomy for the registration and confirmation paths.
//!
//! Registration errors never cross the public entry point; they are folded
//! into a [`RegistrationResponse`](super::registration::RegistrationResponse).
//! Confirmation errors are returned as-is so clients can tell "register again"
//! apart from "link already used".

use thiserror::Error;

use super::credentials::HashError;
use super::validation::ValidationError;
use crate::modules::storage::{RepositoryError, StoreError};
use crate::{CONFLICT_MESSAGE, UNAVAILABLE_MESSAGE};

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Identity already taken by a confirmed user
    #[error("Email or username already taken!")]
    Conflict,

    #[error("Pending store failure: {0}")]
    Store(#[from] StoreError),

    #[error("User repository failure: {0}")]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Hashing(#[from] HashError),
}

impl RegistrationError {
    /// Message safe to show the caller
    pub fn user_message(&self) -> String {
        match self {
            RegistrationError::Validation(e) => e.to_string(),
            RegistrationError::Conflict => CONFLICT_MESSAGE.to_string(),
            RegistrationError::Store(_)
            | RegistrationError::Repository(_)
            | RegistrationError::Hashing(_) => UNAVAILABLE_MESSAGE.to_string(),
        }
    }
}

/// Why a confirmation attempt produced no user
#[derive(Debug, Error)]
pub enum ConfirmationError {
    /// The token was issued but its confirmation window has passed
    #[error("Confirmation link has expired, please register again")]
    Expired,

    /// Unknown, malformed, or already used token
    #[error("Confirmation link is invalid or has already been used")]
    NotFound,

    /// Someone confirmed the same username or email first
    #[error("Email or username already taken!")]
    Conflict,

    #[error("Pending store failure: {0}")]
    Store(#[from] StoreError),

    #[error("User repository failure: {0}")]
    Repository(#[from] RepositoryError),
}

impl ConfirmationError {
    /// Short machine-readable kind for clients
    pub fn kind(&self) -> &'static str {
        match self {
            ConfirmationError::Expired => "expired",
            ConfirmationError::NotFound => "not_found",
            ConfirmationError::Conflict => "conflict",
            ConfirmationError::Store(_) | ConfirmationError::Repository(_) => "unavailable",
        }
    }
}
