//! Shared fixtures for registration and confirmation tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::credentials::{ConfirmationToken, PasswordHasher};
use crate::modules::context::AppContext;
use crate::modules::email::{DeliveryInfo, MailChannel, MailError, OutboundMessage};
use crate::modules::storage::{
    MemoryPendingStore, MemoryUserRepository, PendingRegistration, PendingStore, StoreError,
    StoreResult, TakeOutcome,
};
use crate::MIN_HASH_ITERATIONS;

/// Mail channel that keeps every message it is handed
#[derive(Default)]
pub struct RecordingMailChannel {
    sent: Mutex<Vec<OutboundMessage>>,
    failing: AtomicBool,
}

impl RecordingMailChannel {
    pub fn fail_sends(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    /// Token from the most recent message, read back out of the body
    pub fn last_token(&self) -> Option<ConfirmationToken> {
        let sent = self.sent.lock();
        let message = sent.last()?;
        message.body.lines().find_map(|line| line.parse().ok())
    }
}

#[async_trait]
impl MailChannel for RecordingMailChannel {
    async fn send(&self, message: OutboundMessage) -> Result<DeliveryInfo, MailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MailError::Transport("relay unavailable".to_string()));
        }
        let recipient = message.to.clone();
        self.sent.lock().push(message);
        Ok(DeliveryInfo {
            message_id: "<recorded@localhost>".to_string(),
            recipient,
            response: None,
        })
    }
}

/// Pending store whose backend is always unreachable
pub struct UnreachableStore;

fn unreachable() -> StoreError {
    StoreError::Connection {
        message: "connection refused".to_string(),
        source: None,
    }
}

#[async_trait]
impl PendingStore for UnreachableStore {
    async fn put(
        &self,
        _token: &ConfirmationToken,
        _registration: &PendingRegistration,
        _ttl: Duration,
    ) -> StoreResult<()> {
        Err(unreachable())
    }

    async fn get(&self, _token: &ConfirmationToken) -> StoreResult<Option<PendingRegistration>> {
        Err(unreachable())
    }

    async fn delete(&self, _token: &ConfirmationToken) -> StoreResult<()> {
        Err(unreachable())
    }

    async fn take(&self, _token: &ConfirmationToken) -> StoreResult<TakeOutcome> {
        Err(unreachable())
    }

    async fn time_to_live(&self, _token: &ConfirmationToken) -> StoreResult<Option<Duration>> {
        Err(unreachable())
    }
}

pub struct Harness {
    pub ctx: AppContext,
    pub users: MemoryUserRepository,
    pub pending: MemoryPendingStore,
    pub mail: Arc<RecordingMailChannel>,
}

/// Context over in-memory backends with a cheap work factor
pub fn memory_context(ttl: Duration) -> Harness {
    let users = MemoryUserRepository::new();
    let pending = MemoryPendingStore::new();
    let mail = Arc::new(RecordingMailChannel::default());

    let ctx = AppContext::new(
        Arc::new(users.clone()),
        Arc::new(pending.clone()),
        mail.clone(),
        PasswordHasher::new(MIN_HASH_ITERATIONS),
        "http://localhost:4000/confirm",
        ttl,
    );

    Harness {
        ctx,
        users,
        pending,
        mail,
    }
}

/// Context whose pending store always fails
pub fn failing_store_context() -> AppContext {
    AppContext::new(
        Arc::new(MemoryUserRepository::new()),
        Arc::new(UnreachableStore),
        Arc::new(RecordingMailChannel::default()),
        PasswordHasher::new(MIN_HASH_ITERATIONS),
        "http://localhost:4000/confirm",
        Duration::from_secs(120),
    )
}
