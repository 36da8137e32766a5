pub mod error;
pub mod memory;
pub mod pending;
pub mod redis_store;
pub mod users;

// Re-export the main types
pub use error::{RepositoryError, RepositoryResult, StoreError, StoreResult};
pub use memory::MemoryPendingStore;
pub use pending::{PendingRegistration, PendingStore, TakeOutcome};
pub use redis_store::RedisPendingStore;
pub use users::{JsonFileUserRepository, MemoryUserRepository, User, UserRepository};
