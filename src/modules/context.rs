//! Process-scoped collaborators shared by every request.
//!
//! Built once at startup and cloned into each handler; clones share the same
//! store connection, repository and mail channel.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use thiserror::Error;

use crate::modules::auth::credentials::PasswordHasher;
use crate::modules::config::AppConfig;
use crate::modules::email::{smtp_mailer, LoggingMailChannel, MailChannel, MailError, VerificationDispatcher};
use crate::modules::storage::{
    JsonFileUserRepository, PendingStore, RedisPendingStore, RepositoryError, StoreError,
    UserRepository,
};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Could not connect to the pending store: {0}")]
    Store(#[from] StoreError),

    #[error("Could not open the user repository: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Could not set up mail delivery: {0}")]
    Mail(#[from] MailError),
}

#[derive(Clone)]
pub struct AppContext {
    pub users: Arc<dyn UserRepository>,
    pub pending: Arc<dyn PendingStore>,
    pub hasher: PasswordHasher,
    pub dispatcher: VerificationDispatcher,
    pub pending_ttl: Duration,
}

impl AppContext {
    pub fn new(
        users: Arc<dyn UserRepository>,
        pending: Arc<dyn PendingStore>,
        channel: Arc<dyn MailChannel>,
        hasher: PasswordHasher,
        confirm_url: impl Into<String>,
        pending_ttl: Duration,
    ) -> Self {
        Self {
            users,
            pending,
            hasher,
            dispatcher: VerificationDispatcher::new(channel, confirm_url, pending_ttl),
            pending_ttl,
        }
    }

    /// Connect every collaborator named in the configuration
    pub async fn connect(config: &AppConfig) -> Result<Self, StartupError> {
        let pending = RedisPendingStore::connect(&config.redis).await?;
        let users = JsonFileUserRepository::open(&config.users_file).await?;
        info!("User repository opened at {}", config.users_file.display());

        let channel: Arc<dyn MailChannel> = match &config.smtp {
            Some(smtp) => {
                info!("Sending mail through SMTP relay {}:{}", smtp.host, smtp.port);
                Arc::new(smtp_mailer(smtp, &config.mail_from)?)
            }
            None => {
                warn!("SMTP_HOST not set, verification emails will only be logged");
                Arc::new(LoggingMailChannel)
            }
        };

        Ok(Self::new(
            Arc::new(users),
            Arc::new(pending),
            channel,
            PasswordHasher::new(config.hash_iterations),
            config.confirm_url.clone(),
            config.pending_ttl,
        ))
    }
}
