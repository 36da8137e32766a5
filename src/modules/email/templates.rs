use std::time::Duration;

use super::transport::OutboundMessage;
use crate::modules::auth::credentials::ConfirmationToken;
use crate::modules::utils::time::format_duration;

pub const VERIFICATION_SUBJECT: &str = "Verify your account";

/// Append the token to the confirmation endpoint
pub fn confirmation_link(confirm_url: &str, token: &ConfirmationToken) -> String {
    let separator = if confirm_url.contains('?') { '&' } else { '?' };
    format!("{}{}token={}", confirm_url, separator, token)
}

/// Compose the verification email for a freshly staged registration
pub fn verification_message(
    username: &str,
    email: &str,
    token: &ConfirmationToken,
    confirm_url: &str,
    ttl: Duration,
) -> OutboundMessage {
    let body = format!(
        "Hi {},\n\
        \n\
        Thanks for signing up! Please confirm your email address by opening this link:\n\
        \n\
        {}\n\
        \n\
        Or enter this confirmation code:\n\
        \n\
        {}\n\
        \n\
        This link will expire in {}. If it expires, simply register again.\n\
        \n\
        If you did not create an account, you can ignore this email.",
        username,
        confirmation_link(confirm_url, token),
        token,
        format_duration(ttl)
    );

    OutboundMessage {
        to: email.to_string(),
        subject: VERIFICATION_SUBJECT.to_string(),
        body,
    }
}
