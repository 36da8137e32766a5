use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use fs2::FileExt;
use log::warn;
use serde::{Deserialize, Serialize};

use super::error::{RepositoryError, RepositoryResult};
use super::pending::PendingRegistration;
use crate::modules::utils::logging::log_data_operation;
use crate::modules::utils::time::get_current_timestamp;

/// A confirmed account in durable storage
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,            // Username as submitted (for display)
    pub username_normalized: String, // Lowercase version for lookups and comparisons
    pub email: String,
    pub password_hash: String,
    pub created_at: u64,
}

impl User {
    /// Promote a confirmed pending registration
    pub fn from_pending(registration: &PendingRegistration) -> Self {
        Self {
            username: registration.username.clone(),
            username_normalized: normalize(&registration.username),
            email: registration.email.clone(),
            password_hash: registration.hashed_password.clone(),
            created_at: get_current_timestamp(),
        }
    }

    /// True if this user holds either identity
    pub fn collides_with(&self, username: &str, email: &str) -> bool {
        self.username_normalized == normalize(username) || self.email.eq_ignore_ascii_case(email)
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Durable storage for confirmed users.
///
/// `create_user` re-checks uniqueness under the repository's own lock, so it
/// is the final guard against two confirmations for the same identity.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find any user whose username OR email equals the candidate
    async fn find_user_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> RepositoryResult<Option<User>>;

    /// Insert a user built from a confirmed registration
    async fn create_user(&self, registration: &PendingRegistration) -> RepositoryResult<User>;
}

/// Users keyed by normalized username
#[derive(Serialize, Deserialize, Default)]
struct UserTable {
    users: HashMap<String, User>,
}

impl UserTable {
    fn find_conflict(&self, username: &str, email: &str) -> Option<User> {
        self.users
            .values()
            .find(|user| user.collides_with(username, email))
            .cloned()
    }

    fn insert(&mut self, registration: &PendingRegistration) -> RepositoryResult<User> {
        if self
            .find_conflict(&registration.username, &registration.email)
            .is_some()
        {
            return Err(RepositoryError::Conflict);
        }

        let user = User::from_pending(registration);
        self.users
            .insert(user.username_normalized.clone(), user.clone());
        Ok(user)
    }
}

/// In-memory repository for tests and development
#[derive(Clone, Default)]
pub struct MemoryUserRepository {
    table: Arc<parking_lot::RwLock<UserTable>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.table.read().users.len()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_user_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> RepositoryResult<Option<User>> {
        Ok(self.table.read().find_conflict(username, email))
    }

    async fn create_user(&self, registration: &PendingRegistration) -> RepositoryResult<User> {
        self.table.write().insert(registration)
    }
}

/// Repository persisted as a JSON file.
///
/// Every call re-reads the file under an OS-level lock on a sibling `.lock`
/// file, so processes sharing the file see each other's users. Inserts hold
/// the exclusive lock across the read, the uniqueness check and the write.
/// The table is written through a temporary file and a rename, so readers
/// never observe a half-written file.
#[derive(Debug, Clone)]
pub struct JsonFileUserRepository {
    path: PathBuf,
    lock_path: PathBuf,
}

/// Held lock on the repository's lock file, released on drop
struct TableLock {
    file: File,
}

impl TableLock {
    fn acquire(lock_path: &Path, exclusive: bool) -> RepositoryResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(lock_path)?;

        if exclusive {
            FileExt::lock_exclusive(&file)?;
        } else {
            FileExt::lock_shared(&file)?;
        }
        Ok(Self { file })
    }
}

impl Drop for TableLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("Failed to release user store lock: {}", e);
        }
    }
}

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// Missing and empty files are an empty table; anything else must parse
fn read_table(path: &Path) -> RepositoryResult<UserTable> {
    match fs::read(path) {
        Ok(bytes) if bytes.is_empty() => Ok(UserTable::default()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(UserTable::default()),
        Err(e) => Err(e.into()),
    }
}

fn write_table(path: &Path, table: &UserTable) -> RepositoryResult<()> {
    let data = serde_json::to_vec_pretty(table)?;
    let tmp_path = sibling_path(path, "tmp");
    fs::write(&tmp_path, data)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

impl JsonFileUserRepository {
    /// Open the repository at `path`, failing early if an existing file is corrupt
    pub async fn open(path: impl AsRef<Path>) -> RepositoryResult<Self> {
        let path = path.as_ref().to_path_buf();
        let repo = Self {
            lock_path: sibling_path(&path, "lock"),
            path,
        };

        let check = repo.clone();
        tokio::task::spawn_blocking(move || -> RepositoryResult<()> {
            if let Some(parent) = check.path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            let _lock = TableLock::acquire(&check.lock_path, false)?;
            read_table(&check.path)?;
            Ok(())
        })
        .await??;

        Ok(repo)
    }

    /// Run `f` on the current on-disk table while holding the file lock
    async fn with_table<T, F>(&self, exclusive: bool, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Path, UserTable) -> RepositoryResult<T> + Send + 'static,
    {
        let repo = self.clone();
        tokio::task::spawn_blocking(move || {
            let _lock = TableLock::acquire(&repo.lock_path, exclusive)?;
            let table = read_table(&repo.path)?;
            f(&repo.path, table)
        })
        .await?
    }
}

#[async_trait]
impl UserRepository for JsonFileUserRepository {
    async fn find_user_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> RepositoryResult<Option<User>> {
        let (username, email) = (username.to_string(), email.to_string());
        self.with_table(false, move |_, table| {
            Ok(table.find_conflict(&username, &email))
        })
        .await
    }

    async fn create_user(&self, registration: &PendingRegistration) -> RepositoryResult<User> {
        let pending = registration.clone();
        let result = self
            .with_table(true, move |path, mut table| {
                let user = table.insert(&pending)?;
                write_table(path, &table)?;
                Ok(user)
            })
            .await;

        match &result {
            Ok(user) => log_data_operation(
                "create_user",
                &user.username,
                "user_store",
                true,
                Some("user created and store saved"),
            ),
            Err(RepositoryError::Conflict) => {}
            Err(e) => log_data_operation(
                "create_user",
                &registration.username,
                "user_store",
                false,
                Some(&format!("failed to save user store: {}", e)),
            ),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn registration(username: &str, email: &str) -> PendingRegistration {
        PendingRegistration {
            username: username.to_string(),
            email: email.to_string(),
            hashed_password: "pbkdf2-sha256$1000$aa$bb".to_string(),
        }
    }

    #[tokio::test]
    async fn test_user_creation() {
        let repo = MemoryUserRepository::new();

        let user = repo
            .create_user(&registration("JohnDoe", "johndoe@gmail.com"))
            .await
            .unwrap();

        assert_eq!(user.username, "JohnDoe");
        assert_eq!(user.username_normalized, "johndoe");
        assert_eq!(user.email, "johndoe@gmail.com");
        assert_eq!(user.password_hash, "pbkdf2-sha256$1000$aa$bb");
        assert!(user.created_at > 0);
        assert_eq!(repo.user_count(), 1);
    }

    #[tokio::test]
    async fn test_find_matches_username_or_email() {
        let repo = MemoryUserRepository::new();
        repo.create_user(&registration("johndoe", "johndoe@gmail.com"))
            .await
            .unwrap();

        // Same username, different email
        assert!(repo
            .find_user_by_username_or_email("JOHNDOE", "other@gmail.com")
            .await
            .unwrap()
            .is_some());
        // Different username, same email
        assert!(repo
            .find_user_by_username_or_email("someone", "JohnDoe@Gmail.com")
            .await
            .unwrap()
            .is_some());
        // Neither
        assert!(repo
            .find_user_by_username_or_email("someone", "someone@gmail.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_identity() {
        let repo = MemoryUserRepository::new();
        repo.create_user(&registration("johndoe", "johndoe@gmail.com"))
            .await
            .unwrap();

        let same_email = repo
            .create_user(&registration("janedoe", "johndoe@gmail.com"))
            .await;
        assert!(matches!(same_email, Err(RepositoryError::Conflict)));

        let same_name = repo
            .create_user(&registration("JohnDoe", "jane@gmail.com"))
            .await;
        assert!(matches!(same_name, Err(RepositoryError::Conflict)));

        assert_eq!(repo.user_count(), 1);
    }

    #[tokio::test]
    async fn test_json_repository_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("users.json");

        {
            let repo = JsonFileUserRepository::open(&path).await.unwrap();
            repo.create_user(&registration("johndoe", "johndoe@gmail.com"))
                .await
                .unwrap();
        }

        let reopened = JsonFileUserRepository::open(&path).await.unwrap();
        let found = reopened
            .find_user_by_username_or_email("johndoe", "x@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.email, "johndoe@gmail.com");

        let duplicate = reopened
            .create_user(&registration("other", "johndoe@gmail.com"))
            .await;
        assert!(matches!(duplicate, Err(RepositoryError::Conflict)));
    }

    #[tokio::test]
    async fn test_json_repositories_sharing_a_file_see_each_other() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users.json");

        // Both opened before either writes, as two CLI processes would be
        let first = JsonFileUserRepository::open(&path).await.unwrap();
        let second = JsonFileUserRepository::open(&path).await.unwrap();

        first
            .create_user(&registration("johndoe", "johndoe@gmail.com"))
            .await
            .unwrap();

        assert!(second
            .find_user_by_username_or_email("johndoe", "x@example.com")
            .await
            .unwrap()
            .is_some());

        let duplicate = second
            .create_user(&registration("johndoe", "other@gmail.com"))
            .await;
        assert!(matches!(duplicate, Err(RepositoryError::Conflict)));

        // The first user survives the rejected insert
        let reopened = JsonFileUserRepository::open(&path).await.unwrap();
        let kept = reopened
            .find_user_by_username_or_email("johndoe", "x@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(kept.email, "johndoe@gmail.com");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_json_repositories_concurrent_inserts() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users.json");

        let mut handles = Vec::new();
        for i in 0..8 {
            let repo = JsonFileUserRepository::open(&path).await.unwrap();
            handles.push(tokio::spawn(async move {
                repo.create_user(&registration(
                    &format!("user{}", i),
                    &format!("user{}@gmail.com", i),
                ))
                .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // No insert overwrote another
        let reopened = JsonFileUserRepository::open(&path).await.unwrap();
        for i in 0..8 {
            assert!(reopened
                .find_user_by_username_or_email(&format!("user{}", i), "x@example.com")
                .await
                .unwrap()
                .is_some());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_json_repositories_race_on_one_identity() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users.json");

        let mut handles = Vec::new();
        for i in 0..6 {
            let repo = JsonFileUserRepository::open(&path).await.unwrap();
            handles.push(tokio::spawn(async move {
                repo.create_user(&registration("johndoe", &format!("john{}@gmail.com", i)))
                    .await
            }));
        }

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(RepositoryError::Conflict) => {}
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        assert_eq!(created, 1);
        assert!(path.with_file_name("users.json.lock").exists());
    }

    #[tokio::test]
    async fn test_json_repository_rejects_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = JsonFileUserRepository::open(&path).await;
        assert!(matches!(result, Err(RepositoryError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_json_repository_empty_file_is_empty_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, "").unwrap();

        let repo = JsonFileUserRepository::open(&path).await.unwrap();
        assert!(repo
            .find_user_by_username_or_email("a", "a@b.co")
            .await
            .unwrap()
            .is_none());
    }
}
