pub mod dispatcher;
pub mod smtp;
pub mod templates;
pub mod transport;

pub use dispatcher::{DeliveryHandle, VerificationDispatcher};
pub use smtp::SmtpConfig;
pub use templates::{confirmation_link, verification_message};
pub use transport::{
    smtp_mailer, DeliveryInfo, LettreMailer, LoggingMailChannel, MailChannel, MailError,
    OutboundMessage,
};
