//! Verification Dispatcher.
//!
//! Sending is fire-and-forget: `dispatch` spawns the send and returns at once.
//! The spawned task logs the delivery outcome itself, so dropping the
//! [`DeliveryHandle`] loses nothing but the ability to await that outcome.

use std::sync::Arc;
use std::time::Duration;

use log::{error, info};
use tokio::task::JoinHandle;

use super::templates::verification_message;
use super::transport::{DeliveryInfo, MailChannel, MailError};
use crate::modules::auth::credentials::{ConfirmationToken, RegistrationCredentials};
use crate::modules::utils::logging::format_sensitive;

/// Handle to an in-flight verification email
pub struct DeliveryHandle {
    task: JoinHandle<Result<DeliveryInfo, MailError>>,
}

impl DeliveryHandle {
    /// Wait for the send to finish. Only for diagnostics; never on the request path.
    pub async fn outcome(self) -> Result<DeliveryInfo, MailError> {
        self.task.await?
    }
}

/// Composes verification emails and hands them to a mail channel
#[derive(Clone)]
pub struct VerificationDispatcher {
    channel: Arc<dyn MailChannel>,
    confirm_url: String,
    ttl: Duration,
}

impl VerificationDispatcher {
    pub fn new(channel: Arc<dyn MailChannel>, confirm_url: impl Into<String>, ttl: Duration) -> Self {
        Self {
            channel,
            confirm_url: confirm_url.into(),
            ttl,
        }
    }

    /// Spawn delivery of the confirmation email for `token`
    pub fn dispatch(
        &self,
        credentials: &RegistrationCredentials,
        token: &ConfirmationToken,
    ) -> DeliveryHandle {
        let message = verification_message(
            credentials.username.trim(),
            credentials.email.trim(),
            token,
            &self.confirm_url,
            self.ttl,
        );
        let channel = Arc::clone(&self.channel);

        let task = tokio::spawn(async move {
            let recipient = format_sensitive(&message.to);
            let result = channel.send(message).await;
            match &result {
                Ok(info) => info!(
                    "Verification email sent: message_id={}, recipient={}, response={:?}",
                    info.message_id, recipient, info.response
                ),
                Err(e) => error!(
                    "Verification email failed: recipient={}, error={}",
                    recipient, e
                ),
            }
            result
        });

        DeliveryHandle { task }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::email::transport::OutboundMessage;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingChannel {
        sent: Mutex<Vec<OutboundMessage>>,
    }

    #[async_trait]
    impl MailChannel for RecordingChannel {
        async fn send(&self, message: OutboundMessage) -> Result<DeliveryInfo, MailError> {
            let recipient = message.to.clone();
            self.sent.lock().push(message);
            Ok(DeliveryInfo {
                message_id: "<test@localhost>".to_string(),
                recipient,
                response: None,
            })
        }
    }

    struct FailingChannel;

    #[async_trait]
    impl MailChannel for FailingChannel {
        async fn send(&self, _message: OutboundMessage) -> Result<DeliveryInfo, MailError> {
            Err(MailError::Transport("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_dispatch_sends_token_link() {
        let channel = Arc::new(RecordingChannel::default());
        let dispatcher = VerificationDispatcher::new(
            channel.clone(),
            "http://localhost:4000/confirm",
            Duration::from_secs(120),
        );
        let credentials = RegistrationCredentials::new("johndoe", "johndoe@gmail.com", "Secret123!");
        let token = ConfirmationToken::generate();

        let info = dispatcher.dispatch(&credentials, &token).outcome().await.unwrap();
        assert_eq!(info.recipient, "johndoe@gmail.com");

        let sent = channel.sent.lock();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].body.contains(&token.to_string()));
        assert!(!sent[0].body.contains("Secret123!"));
    }

    #[tokio::test]
    async fn test_dispatch_failure_reported_through_handle() {
        let dispatcher = VerificationDispatcher::new(
            Arc::new(FailingChannel),
            "http://localhost:4000/confirm",
            Duration::from_secs(120),
        );
        let credentials = RegistrationCredentials::new("johndoe", "johndoe@gmail.com", "Secret123!");

        let outcome = dispatcher
            .dispatch(&credentials, &ConfirmationToken::generate())
            .outcome()
            .await;
        assert!(matches!(outcome, Err(MailError::Transport(_))));
    }
}
