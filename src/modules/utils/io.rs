use std::io::{self, Write};

/// Longest address accepted by SMTP (RFC 5321 path limit)
const MAX_EMAIL_LENGTH: usize = 254;

/// Helper function to read a line from stdin after printing a prompt
pub fn read_line(prompt: &str) -> io::Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Helper function to validate email format
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 5 || email.len() > MAX_EMAIL_LENGTH {
        return false;
    }
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    // Exactly one '@' with something on both sides
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }

    // Domain needs a dot that is neither leading nor trailing
    domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
}
