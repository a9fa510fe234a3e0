use async_trait::async_trait;
use ipa_notify_core::AppResult;
use ipa_notify_domain::{GroupInfo, UserRecord};

/// Read-only port onto the identity directory.
///
/// Lookups return `Ok(None)` for objects the directory does not have.
/// `AppError::Unauthorized` is reserved for an invalid or expired session.
#[async_trait]
pub trait DirectorySession: Send + Sync {
    /// Establishes the authenticated session.
    async fn authenticate(&self) -> AppResult<()>;

    /// Fetches a group and its direct user members.
    async fn find_group(&self, group_name: &str) -> AppResult<Option<GroupInfo>>;

    /// Fetches one user by login name.
    async fn find_user(&self, user_id: &str) -> AppResult<Option<UserRecord>>;
}
