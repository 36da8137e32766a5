use crate::modules::storage::{RepositoryResult, User, UserRepository};

/// Find a confirmed user holding the candidate username OR email.
///
/// Advisory only: two registrations racing on one identity can both pass.
/// Confirmation re-runs this check and the repository enforces it on insert.
pub async fn find_conflict(
    users: &dyn UserRepository,
    username: &str,
    email: &str,
) -> RepositoryResult<Option<User>> {
    users
        .find_user_by_username_or_email(username.trim(), email.trim())
        .await
}
