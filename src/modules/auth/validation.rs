use thiserror::Error;

use super::credentials::RegistrationCredentials;
use super::password::{validate_password, PasswordError};
use crate::modules::utils::io::is_valid_email;

pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 30;

/// Structural problems with submitted credentials.
///
/// Messages are shown to the caller verbatim.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Username is required")]
    UsernameRequired,
    #[error("Username must be between 3 and 30 characters")]
    UsernameLength,
    #[error("Username may only contain letters, numbers, '_', '.' and '-'")]
    UsernameCharset,
    #[error("Email is required")]
    EmailRequired,
    #[error("Email must be a valid email address")]
    InvalidEmail,
    #[error("Password is required")]
    PasswordRequired,
    #[error(transparent)]
    WeakPassword(#[from] PasswordError),
}

fn is_username_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

/// Check credentials before anything is stored or sent
pub fn validate_credentials(credentials: &RegistrationCredentials) -> Result<(), ValidationError> {
    let username = credentials.username.trim();
    if username.is_empty() {
        return Err(ValidationError::UsernameRequired);
    }
    let length = username.chars().count();
    if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&length) {
        return Err(ValidationError::UsernameLength);
    }
    if !username.chars().all(is_username_char) {
        return Err(ValidationError::UsernameCharset);
    }

    let email = credentials.email.trim();
    if email.is_empty() {
        return Err(ValidationError::EmailRequired);
    }
    if !is_valid_email(email) {
        return Err(ValidationError::InvalidEmail);
    }

    if credentials.password.is_empty() {
        return Err(ValidationError::PasswordRequired);
    }
    validate_password(&credentials.password)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(username: &str, email: &str, password: &str) -> RegistrationCredentials {
        RegistrationCredentials::new(username, email, password)
    }

    #[test]
    fn test_valid_credentials() {
        assert!(validate_credentials(&credentials("johndoe", "johndoe@gmail.com", "Secret123!")).is_ok());
        assert!(validate_credentials(&credentials("john.doe-99_x", "j@ex.io", "Secret123!")).is_ok());
    }

    #[test]
    fn test_username_rules() {
        assert_eq!(
            validate_credentials(&credentials("   ", "johndoe@gmail.com", "Secret123!")),
            Err(ValidationError::UsernameRequired)
        );
        assert_eq!(
            validate_credentials(&credentials("jo", "johndoe@gmail.com", "Secret123!")),
            Err(ValidationError::UsernameLength)
        );
        assert_eq!(
            validate_credentials(&credentials(&"a".repeat(31), "johndoe@gmail.com", "Secret123!")),
            Err(ValidationError::UsernameLength)
        );
        assert_eq!(
            validate_credentials(&credentials("john doe", "johndoe@gmail.com", "Secret123!")),
            Err(ValidationError::UsernameCharset)
        );
    }

    #[test]
    fn test_email_rules() {
        assert_eq!(
            validate_credentials(&credentials("johndoe", "", "Secret123!")),
            Err(ValidationError::EmailRequired)
        );
        assert_eq!(
            validate_credentials(&credentials("johndoe", "johndoe@gmail", "Secret123!")),
            Err(ValidationError::InvalidEmail)
        );
    }

    #[test]
    fn test_password_rules() {
        assert_eq!(
            validate_credentials(&credentials("johndoe", "johndoe@gmail.com", "")),
            Err(ValidationError::PasswordRequired)
        );
        assert_eq!(
            validate_credentials(&credentials("johndoe", "johndoe@gmail.com", "secret123!")),
            Err(ValidationError::WeakPassword(PasswordError::NoUppercase))
        );
    }

    #[test]
    fn test_first_failing_rule_reported() {
        // Both username and email are bad; username is checked first
        let err = validate_credentials(&credentials("", "bad", "")).unwrap_err();
        assert_eq!(err.to_string(), "Username is required");
    }

    #[test]
    fn test_weak_password_message_is_transparent() {
        let err = ValidationError::from(PasswordError::NoNumber);
        assert_eq!(err.to_string(), "Password must contain a number");
    }
}
