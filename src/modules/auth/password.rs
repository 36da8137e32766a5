use std::io;

use thiserror::Error;

/// Special characters accepted by the strength policy
pub const SPECIAL_CHARS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Password strength failures, first failing rule wins
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("Password must be at least 8 characters long")]
    TooShort,
    #[error("Password must be at most 128 characters long")]
    TooLong,
    #[error("Password must contain an uppercase letter")]
    NoUppercase,
    #[error("Password must contain a lowercase letter")]
    NoLowercase,
    #[error("Password must contain a number")]
    NoNumber,
    #[error("Password must contain a special character")]
    NoSpecialChar,
}

/// Function to validate password strength
pub fn validate_password(password: &str) -> Result<(), PasswordError> {
    let length = password.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(PasswordError::TooShort);
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(PasswordError::TooLong);
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        return Err(PasswordError::NoUppercase);
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        return Err(PasswordError::NoLowercase);
    }
    if !password.chars().any(|c| c.is_numeric()) {
        return Err(PasswordError::NoNumber);
    }
    if !password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        return Err(PasswordError::NoSpecialChar);
    }
    Ok(())
}

/// Helper function to read a password securely
pub fn read_password(prompt: &str) -> io::Result<String> {
    rpassword::prompt_password(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_validation() {
        // Test valid password
        assert!(validate_password("Secret123!").is_ok());

        // Test too short
        assert_eq!(validate_password("Pass1!"), Err(PasswordError::TooShort));

        // Test too long
        let long_password = format!("Aa1!{}", "x".repeat(125));
        assert_eq!(validate_password(&long_password), Err(PasswordError::TooLong));

        // Test missing uppercase
        assert_eq!(
            validate_password("password123!"),
            Err(PasswordError::NoUppercase)
        );

        // Test missing lowercase
        assert_eq!(
            validate_password("PASSWORD123!"),
            Err(PasswordError::NoLowercase)
        );

        // Test missing number
        assert_eq!(validate_password("Password!"), Err(PasswordError::NoNumber));

        // Test missing special character
        assert_eq!(
            validate_password("Password123"),
            Err(PasswordError::NoSpecialChar)
        );
    }

    #[test]
    fn test_password_error_messages_are_readable() {
        assert_eq!(
            PasswordError::TooShort.to_string(),
            "Password must be at least 8 characters long"
        );
        assert_eq!(
            PasswordError::NoSpecialChar.to_string(),
            "Password must contain a special character"
        );
    }
}
