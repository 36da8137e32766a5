//! Pending-registration store abstraction.
//!
//! A pending registration is an unconfirmed account staged under a one-time
//! confirmation token. Entries carry a TTL and become unreachable once it
//! elapses, whether or not anything deletes them. The store is a staging
//! buffer only; durable identity lives in the
//! [`UserRepository`](super::users::UserRepository).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::StoreResult;
use crate::modules::auth::credentials::ConfirmationToken;

/// Key prefix shared by every backend
pub const PENDING_KEY_PREFIX: &str = "pending-registration";

/// Registration data waiting for email confirmation
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PendingRegistration {
    pub username: String,
    pub email: String,
    pub hashed_password: String,
}

/// Outcome of atomically consuming a pending entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TakeOutcome {
    /// The entry was live and has now been removed
    Found(PendingRegistration),
    /// The token was issued but its TTL has elapsed
    Expired,
    /// The store has no record of the token
    Missing,
}

/// Key-value store with per-entry expiration.
///
/// Implementations must be safe to share across concurrent requests. `take`
/// is the only way the confirmation path reads an entry, so two concurrent
/// calls for the same token can never both observe `Found`.
#[async_trait]
pub trait PendingStore: Send + Sync {
    /// Stage a registration under `token` for at most `ttl`.
    ///
    /// Fails with [`StoreError::Collision`](super::StoreError::Collision) if a
    /// live entry already uses the token.
    async fn put(
        &self,
        token: &ConfirmationToken,
        registration: &PendingRegistration,
        ttl: Duration,
    ) -> StoreResult<()>;

    /// Look up a live entry. Absent and expired entries both return `None`.
    async fn get(&self, token: &ConfirmationToken) -> StoreResult<Option<PendingRegistration>>;

    /// Remove an entry. Removing an absent entry is not an error.
    async fn delete(&self, token: &ConfirmationToken) -> StoreResult<()>;

    /// Atomically return and remove an entry.
    async fn take(&self, token: &ConfirmationToken) -> StoreResult<TakeOutcome>;

    /// Remaining lifetime of a live entry.
    async fn time_to_live(&self, token: &ConfirmationToken) -> StoreResult<Option<Duration>>;
}

/// Build the storage key for a token
pub fn pending_key(token: &ConfirmationToken) -> String {
    format!("{}:{}", PENDING_KEY_PREFIX, token)
}
