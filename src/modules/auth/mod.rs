pub mod confirmation;
pub mod credentials;
pub mod duplicates;
pub mod error;
pub mod password;
pub mod registration;
pub mod validation;

#[cfg(test)]
pub mod testutil;

// Re-export the main types and functions
pub use confirmation::{confirm_from_link, confirm_registration};
pub use credentials::{
    verify_password, ConfirmationToken, HashError, PasswordHasher, RegistrationCredentials,
};
pub use error::{ConfirmationError, RegistrationError};
pub use password::{read_password, validate_password, PasswordError};
pub use registration::{
    register, register_with_delivery, stage_registration, RegistrationResponse,
    StagedRegistration,
};
pub use validation::{validate_credentials, ValidationError};
