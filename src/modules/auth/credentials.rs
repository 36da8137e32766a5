use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::modules::encryption::keys::{
    constant_time_eq, derive_key_from_passphrase, generate_random_salt,
};
use crate::{HASH_ITERATIONS, MIN_HASH_ITERATIONS};

/// Scheme tag written at the front of every encoded hash
const HASH_SCHEME: &str = "pbkdf2-sha256";

/// Credentials submitted to the registration entry point.
///
/// The plaintext password lives only as long as the request; `Debug` never
/// prints it.
#[derive(Deserialize, Clone)]
pub struct RegistrationCredentials {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegistrationCredentials {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for RegistrationCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationCredentials")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One-time token keying a pending registration (random 128-bit UUID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfirmationToken(Uuid);

impl ConfirmationToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConfirmationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// A string that cannot be a token this service issued
#[derive(Debug, Error)]
#[error("Malformed confirmation token")]
pub struct MalformedToken;

impl FromStr for ConfirmationToken {
    type Err = MalformedToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| MalformedToken)
    }
}

/// Failures while preparing a credential
#[derive(Debug, Error)]
pub enum HashError {
    #[error("Password hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Salted one-way password hashing with a fixed work factor.
///
/// Output format: `pbkdf2-sha256$<iterations>$<salt-hex>$<hash-hex>`.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    iterations: u32,
}

impl PasswordHasher {
    /// Build a hasher; work factors below the floor are raised to it
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(MIN_HASH_ITERATIONS),
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Hash synchronously. CPU-bound, keep off async worker threads.
    pub fn hash(&self, plaintext: &str) -> String {
        let salt = generate_random_salt();
        let key = derive_key_from_passphrase(plaintext, &salt, self.iterations);
        format!(
            "{}${}${}${}",
            HASH_SCHEME,
            self.iterations,
            hex::encode(salt),
            hex::encode(key)
        )
    }

    /// Hash on the blocking pool so concurrent requests keep running
    pub async fn hash_async(&self, plaintext: String) -> Result<String, HashError> {
        let hasher = *self;
        let hashed = tokio::task::spawn_blocking(move || hasher.hash(&plaintext)).await?;
        Ok(hashed)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(HASH_ITERATIONS)
    }
}

/// Check a plaintext password against an encoded hash by re-deriving it
pub fn verify_password(plaintext: &str, encoded: &str) -> bool {
    let mut parts = encoded.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };

    if scheme != HASH_SCHEME {
        return false;
    }
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (hex::decode(salt), hex::decode(expected)) else {
        return false;
    };

    let derived = derive_key_from_passphrase(plaintext, &salt, iterations);
    constant_time_eq(&derived, &expected)
}
