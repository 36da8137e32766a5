//! Environment-driven configuration.
//!
//! Values come from the process environment after an optional `.env` file is
//! loaded. Resolution runs over a lookup function so tests can supply a map
//! instead of mutating the real environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::modules::email::smtp::SmtpConfig;
use crate::{
    DEFAULT_REDIS_HOST, DEFAULT_REDIS_PORT, HASH_ITERATIONS, LOG_FILE, MIN_HASH_ITERATIONS,
    PENDING_TTL_SECS, USERS_FILE,
};

pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_MAIL_FROM: &str = "Signup <no-reply@localhost>";
pub const DEFAULT_CONFIRM_URL: &str = "http://localhost:4000/confirm";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Location of the pending-registration Redis instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
}

impl RedisConfig {
    pub fn url(&self) -> String {
        format!("redis://{}:{}/", self.host, self.port)
    }

    /// Use REDIS_HOST/REDIS_PORT only when both are present and usable.
    /// A fallback caused by a bad port comes back as a notice.
    fn resolve(lookup: &impl Fn(&str) -> Option<String>) -> (Self, Option<String>) {
        let host = lookup("REDIS_HOST").filter(|h| !h.trim().is_empty());
        let port = lookup("REDIS_PORT");

        match (host, port) {
            (Some(host), Some(port)) => match port.trim().parse::<u16>() {
                Ok(port) => (Self { host, port }, None),
                Err(_) => (
                    Self::default(),
                    Some(format!(
                        "Ignoring unparsable REDIS_PORT {:?}, using default Redis address",
                        port
                    )),
                ),
            },
            _ => (Self::default(), None),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_REDIS_HOST.to_string(),
            port: DEFAULT_REDIS_PORT,
        }
    }
}

/// Everything the binary needs to build an [`AppContext`](crate::AppContext)
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub redis: RedisConfig,
    /// `None` selects the logging mail channel
    pub smtp: Option<SmtpConfig>,
    pub mail_from: String,
    pub confirm_url: String,
    pub pending_ttl: Duration,
    pub users_file: PathBuf,
    pub log_file: PathBuf,
    pub hash_iterations: u32,
    /// Fallbacks applied while resolving, for logging once logging is up
    pub notices: Vec<String>,
}

impl AppConfig {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let smtp = match lookup("SMTP_HOST").filter(|h| !h.trim().is_empty()) {
            Some(host) => Some(SmtpConfig {
                host,
                port: parse_or(&lookup, "SMTP_PORT", DEFAULT_SMTP_PORT)?,
                username: lookup("SMTP_USERNAME"),
                password: lookup("SMTP_PASSWORD"),
            }),
            None => None,
        };

        let ttl_secs: u64 = parse_or(&lookup, "PENDING_TTL_SECS", PENDING_TTL_SECS)?;
        if ttl_secs == 0 || ttl_secs > PENDING_TTL_SECS {
            return Err(ConfigError::Invalid {
                key: "PENDING_TTL_SECS",
                value: ttl_secs.to_string(),
                reason: format!("must be between 1 and {}", PENDING_TTL_SECS),
            });
        }

        let hash_iterations: u32 = parse_or(&lookup, "HASH_ITERATIONS", HASH_ITERATIONS)?;
        if hash_iterations < MIN_HASH_ITERATIONS {
            return Err(ConfigError::Invalid {
                key: "HASH_ITERATIONS",
                value: hash_iterations.to_string(),
                reason: format!("must be at least {}", MIN_HASH_ITERATIONS),
            });
        }

        let (redis, redis_notice) = RedisConfig::resolve(&lookup);

        Ok(Self {
            redis,
            smtp,
            mail_from: lookup("MAIL_FROM").unwrap_or_else(|| DEFAULT_MAIL_FROM.to_string()),
            confirm_url: lookup("CONFIRM_URL").unwrap_or_else(|| DEFAULT_CONFIRM_URL.to_string()),
            pending_ttl: Duration::from_secs(ttl_secs),
            users_file: lookup("USERS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(USERS_FILE)),
            log_file: lookup("LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(LOG_FILE)),
            hash_iterations,
            notices: redis_notice.into_iter().collect(),
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(value) => match value.trim().parse::<T>() {
            Ok(parsed) => Ok(parsed),
            Err(e) => Err(ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            }),
        },
        None => Ok(default),
    }
}
