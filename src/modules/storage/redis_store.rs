//! Redis-backed pending-registration store.
//!
//! Entries are JSON strings under `pending-registration:<token>` with a
//! millisecond TTL, so Redis expires them natively. A companion
//! `...:issued` marker outlives the entry for a day, which lets `take` report
//! a late confirmation as `Expired` rather than `Missing`. Multi-key commands
//! run inside `MULTI` pipelines so each operation is atomic.

use std::time::Duration;

use async_trait::async_trait;
use log::info;
use redis::aio::ConnectionManager;

use super::error::{StoreError, StoreResult};
use super::pending::{pending_key, PendingRegistration, PendingStore, TakeOutcome};
use crate::modules::auth::credentials::ConfirmationToken;
use crate::modules::config::RedisConfig;

/// How long the issued marker outlives its entry
pub const ISSUED_MARKER_TTL: Duration = Duration::from_secs(24 * 3600);

/// Store backed by a single managed Redis connection.
///
/// `ConnectionManager` multiplexes one connection and reconnects on failure;
/// cloning the store shares it.
#[derive(Clone)]
pub struct RedisPendingStore {
    conn: ConnectionManager,
}

impl RedisPendingStore {
    /// Open the process-wide connection
    pub async fn connect(config: &RedisConfig) -> StoreResult<Self> {
        let client = redis::Client::open(config.url())?;
        let conn = ConnectionManager::new(client).await?;
        info!("Connected to Redis at {}:{}", config.host, config.port);
        Ok(Self { conn })
    }

    pub fn from_connection(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

fn issued_marker_key(token: &ConfirmationToken) -> String {
    format!("{}:issued", pending_key(token))
}

fn ttl_millis(ttl: Duration) -> u64 {
    // Redis rejects a zero expiry
    (ttl.as_millis() as u64).max(1)
}

#[async_trait]
impl PendingStore for RedisPendingStore {
    async fn put(
        &self,
        token: &ConfirmationToken,
        registration: &PendingRegistration,
        ttl: Duration,
    ) -> StoreResult<()> {
        let value = serde_json::to_string(registration)?;
        let mut conn = self.conn.clone();

        let (stored, _marker): (Option<String>, Option<String>) = redis::pipe()
            .atomic()
            .cmd("SET")
            .arg(pending_key(token))
            .arg(value)
            .arg("PX")
            .arg(ttl_millis(ttl))
            .arg("NX")
            .cmd("SET")
            .arg(issued_marker_key(token))
            .arg(1)
            .arg("PX")
            .arg(ttl_millis(ttl + ISSUED_MARKER_TTL))
            .arg("NX")
            .query_async(&mut conn)
            .await?;

        match stored {
            Some(_) => Ok(()),
            None => Err(StoreError::Collision {
                token: token.to_string(),
            }),
        }
    }

    async fn get(&self, token: &ConfirmationToken) -> StoreResult<Option<PendingRegistration>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET")
            .arg(pending_key(token))
            .query_async(&mut conn)
            .await?;

        match value {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, token: &ConfirmationToken) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("DEL")
            .arg(pending_key(token))
            .arg(issued_marker_key(token))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn take(&self, token: &ConfirmationToken) -> StoreResult<TakeOutcome> {
        let mut conn = self.conn.clone();
        let (value, markers_removed): (Option<String>, i64) = redis::pipe()
            .atomic()
            .cmd("GETDEL")
            .arg(pending_key(token))
            .cmd("DEL")
            .arg(issued_marker_key(token))
            .query_async(&mut conn)
            .await?;

        Ok(match value {
            Some(json) => TakeOutcome::Found(serde_json::from_str(&json)?),
            None if markers_removed > 0 => TakeOutcome::Expired,
            None => TakeOutcome::Missing,
        })
    }

    async fn time_to_live(&self, token: &ConfirmationToken) -> StoreResult<Option<Duration>> {
        let mut conn = self.conn.clone();
        let millis: i64 = redis::cmd("PTTL")
            .arg(pending_key(token))
            .query_async(&mut conn)
            .await?;

        // -2: no such key, -1: key without expiry (never written by this store)
        Ok(u64::try_from(millis).ok().map(Duration::from_millis))
    }
}
