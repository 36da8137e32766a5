//! In-memory pending-registration store.
//!
//! Suitable for tests and single-process deployments. Expiry is evaluated on
//! every access against the entry's deadline, so an entry is unreachable the
//! moment its TTL elapses. Expired entries are remembered for a retention
//! window so a late confirmation can be told apart from an unknown token; they
//! are pruned on the next write once that window has passed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::error::{StoreError, StoreResult};
use super::pending::{PendingRegistration, PendingStore, TakeOutcome};
use crate::modules::auth::credentials::ConfirmationToken;

/// How long an expired token is still reported as `Expired`
pub const DEFAULT_EXPIRED_RETENTION: Duration = Duration::from_secs(24 * 3600);

struct Slot {
    registration: PendingRegistration,
    expires_at: Instant,
}

impl Slot {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Thread-safe in-memory store. Clones share the same entries.
#[derive(Clone)]
pub struct MemoryPendingStore {
    slots: Arc<Mutex<HashMap<String, Slot>>>,
    retention: Duration,
}

impl MemoryPendingStore {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_EXPIRED_RETENTION)
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            retention,
        }
    }

    /// Number of live entries
    pub fn live_count(&self) -> usize {
        let now = Instant::now();
        self.slots.lock().values().filter(|s| s.is_live(now)).count()
    }

    fn prune(slots: &mut HashMap<String, Slot>, retention: Duration, now: Instant) {
        slots.retain(|_, slot| slot.expires_at + retention > now);
    }
}

impl Default for MemoryPendingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PendingStore for MemoryPendingStore {
    async fn put(
        &self,
        token: &ConfirmationToken,
        registration: &PendingRegistration,
        ttl: Duration,
    ) -> StoreResult<()> {
        let now = Instant::now();
        let key = token.to_string();
        let mut slots = self.slots.lock();

        Self::prune(&mut slots, self.retention, now);

        if slots.get(&key).is_some_and(|slot| slot.is_live(now)) {
            return Err(StoreError::Collision { token: key });
        }

        slots.insert(
            key,
            Slot {
                registration: registration.clone(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, token: &ConfirmationToken) -> StoreResult<Option<PendingRegistration>> {
        let now = Instant::now();
        let slots = self.slots.lock();
        Ok(slots
            .get(&token.to_string())
            .filter(|slot| slot.is_live(now))
            .map(|slot| slot.registration.clone()))
    }

    async fn delete(&self, token: &ConfirmationToken) -> StoreResult<()> {
        self.slots.lock().remove(&token.to_string());
        Ok(())
    }

    async fn take(&self, token: &ConfirmationToken) -> StoreResult<TakeOutcome> {
        let now = Instant::now();
        let removed = self.slots.lock().remove(&token.to_string());

        Ok(match removed {
            Some(slot) if slot.is_live(now) => TakeOutcome::Found(slot.registration),
            Some(_) => TakeOutcome::Expired,
            None => TakeOutcome::Missing,
        })
    }

    async fn time_to_live(&self, token: &ConfirmationToken) -> StoreResult<Option<Duration>> {
        let now = Instant::now();
        let slots = self.slots.lock();
        Ok(slots
            .get(&token.to_string())
            .filter(|slot| slot.is_live(now))
            .map(|slot| slot.expires_at - now))
    }
}
