// First, declare the modules folder itself
mod modules;

// Re-export everything from modules for easier access
pub use modules::{auth, config, context, email, encryption, storage, utils};

// Re-export commonly used types
pub use modules::auth::confirmation::confirm_registration;
pub use modules::auth::credentials::{ConfirmationToken, RegistrationCredentials};
pub use modules::auth::registration::{register, RegistrationResponse};
pub use modules::config::AppConfig;
pub use modules::context::AppContext;
pub use modules::storage::{PendingRegistration, User};

// Constants
pub const USERS_FILE: &str = "users.json";
pub const LOG_FILE: &str = "application.log";
pub const PENDING_TTL_SECS: u64 = 120;
pub const HASH_ITERATIONS: u32 = 100_000;
pub const MIN_HASH_ITERATIONS: u32 = 1_000;
pub const DEFAULT_REDIS_HOST: &str = "localhost";
pub const DEFAULT_REDIS_PORT: u16 = 5002;

// User-facing registration messages
pub const REGISTRATION_SUCCESS_MESSAGE: &str =
    "Thanks for registering! Check your email to validate your account.";
pub const CONFLICT_MESSAGE: &str = "Email or username already taken!";
pub const UNAVAILABLE_MESSAGE: &str =
    "Registration is temporarily unavailable. Please try again later.";

// Type aliases
pub type HmacSha256 = hmac::Hmac<sha2::Sha256>;
