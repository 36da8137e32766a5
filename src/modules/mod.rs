// Declare all modules
pub mod auth;
pub mod config;
pub mod context;
pub mod email;
pub mod encryption;
pub mod storage;
pub mod utils;

// No re-exports here as they're handled in lib.rs
