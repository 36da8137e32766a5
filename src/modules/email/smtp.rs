use std::fmt;

/// SMTP relay settings supplied by the environment
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    // SMTP server hostname (e.g., smtp.gmail.com)
    pub host: String,
    // SMTP server port (typically 587 for STARTTLS)
    pub port: u16,
    // The account used for SMTP authentication, if the relay needs one
    pub username: Option<String>,
    // The password or app-specific password for SMTP
    pub password: Option<String>,
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
