//! Outbound mail channels.
//!
//! [`MailChannel`] is the seam between the verification dispatcher and
//! whatever actually delivers mail. [`LettreMailer`] adapts any lettre
//! [`Transport`] (SMTP in production, the stub transport in tests);
//! [`LoggingMailChannel`] writes messages to the log for local development.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::transport::smtp::PoolConfig;
use lettre::{Message, SmtpTransport, Transport};
use log::info;
use thiserror::Error;
use uuid::Uuid;

use super::smtp::SmtpConfig;
use crate::modules::utils::logging::format_sensitive;

/// A message ready to hand to a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// What a channel reports back after accepting a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryInfo {
    pub message_id: String,
    pub recipient: String,
    /// Transport response, when the transport gives one
    pub response: Option<String>,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid address {address:?}: {reason}")]
    Address { address: String, reason: String },

    #[error("Failed to build email: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("Failed to configure mail transport: {0}")]
    Setup(String),

    #[error("Failed to send email: {0}")]
    Transport(String),

    #[error("Mail task did not complete: {0}")]
    Task(#[from] tokio::task::JoinError),
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|e: lettre::address::AddressError| MailError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

/// Outbound mail channel
#[async_trait]
pub trait MailChannel: Send + Sync {
    async fn send(&self, message: OutboundMessage) -> Result<DeliveryInfo, MailError>;
}

/// Channel backed by a lettre transport.
///
/// lettre's synchronous transports block, so each send runs on the blocking
/// pool.
pub struct LettreMailer<T> {
    transport: Arc<T>,
    from: Mailbox,
}

impl<T> LettreMailer<T>
where
    T: Transport + Send + Sync + 'static,
{
    pub fn new(transport: T, from: &str) -> Result<Self, MailError> {
        Ok(Self {
            transport: Arc::new(transport),
            from: parse_mailbox(from)?,
        })
    }

    fn build(&self, message: &OutboundMessage) -> Result<(Message, String), MailError> {
        let message_id = format!(
            "<{}@{}>",
            Uuid::new_v4().simple(),
            self.from.email.domain()
        );

        let email = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(&message.to)?)
            .subject(message.subject.clone())
            .message_id(Some(message_id.clone()))
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())?;

        Ok((email, message_id))
    }
}

#[async_trait]
impl<T> MailChannel for LettreMailer<T>
where
    T: Transport + Send + Sync + 'static,
    T::Ok: fmt::Debug + Send + 'static,
    T::Error: fmt::Display + Send + 'static,
{
    async fn send(&self, message: OutboundMessage) -> Result<DeliveryInfo, MailError> {
        let (email, message_id) = self.build(&message)?;
        let transport = Arc::clone(&self.transport);

        let response = tokio::task::spawn_blocking(move || transport.send(&email))
            .await?
            .map_err(|e| MailError::Transport(e.to_string()))?;

        Ok(DeliveryInfo {
            message_id,
            recipient: message.to,
            response: Some(format!("{:?}", response)),
        })
    }
}

/// Build an SMTP channel from environment settings
pub fn smtp_mailer(config: &SmtpConfig, from: &str) -> Result<LettreMailer<SmtpTransport>, MailError> {
    // Configure TLS parameters
    let tls_parameters = TlsParameters::builder(config.host.clone())
        .build()
        .map_err(|e| MailError::Setup(format!("Failed to build TLS parameters: {}", e)))?;

    let mut builder = SmtpTransport::relay(&config.host)
        .map_err(|e| MailError::Setup(format!("Failed to create SMTP transport: {}", e)))?
        .port(config.port)
        .tls(Tls::Required(tls_parameters))
        .pool_config(PoolConfig::new().max_size(4))
        .timeout(Some(Duration::from_secs(10)));

    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
    }

    LettreMailer::new(builder.build(), from)
}

/// Development channel that writes each message to the log instead of sending it
#[derive(Debug, Default, Clone)]
pub struct LoggingMailChannel;

#[async_trait]
impl MailChannel for LoggingMailChannel {
    async fn send(&self, message: OutboundMessage) -> Result<DeliveryInfo, MailError> {
        // Reject what a real transport would reject
        parse_mailbox(&message.to)?;

        let message_id = format!("<{}@localhost>", Uuid::new_v4().simple());
        info!(
            "Mail preview: id={}, to={}, subject={:?}\n{}",
            message_id,
            format_sensitive(&message.to),
            message.subject,
            message.body
        );

        Ok(DeliveryInfo {
            message_id,
            recipient: message.to,
            response: None,
        })
    }
}
