use std::sync::Arc;
use std::time::Duration;

use ipa_notify_core::{AppError, AppResult};
use ipa_notify_domain::GroupInfo;
use tracing::debug;

use crate::DirectorySession;
use crate::deadline::with_deadline;

/// Recoverable outcome of looking up one configured group.
///
/// Fatal conditions never appear here: they travel in the `Err` arm of
/// [`GroupMembershipResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupResolution {
    /// Group exists; members are in directory order.
    Found(GroupInfo),
    /// Directory has no group with that name.
    NotFound,
    /// Lookup failed or timed out for this group only.
    Unavailable(String),
}

/// Resolves configured group names to member lists.
#[derive(Clone)]
pub struct GroupMembershipResolver {
    directory: Arc<dyn DirectorySession>,
    call_timeout: Duration,
}

impl GroupMembershipResolver {
    /// Creates a resolver bounded by `call_timeout` per lookup.
    #[must_use]
    pub fn new(directory: Arc<dyn DirectorySession>, call_timeout: Duration) -> Self {
        Self {
            directory,
            call_timeout,
        }
    }

    /// Looks up one group.
    ///
    /// Returns `Err` only for an unauthenticated session.
    pub async fn resolve(&self, group_name: &str) -> AppResult<GroupResolution> {
        let lookup = with_deadline(
            self.call_timeout,
            "group lookup",
            self.directory.find_group(group_name),
        )
        .await;

        match lookup {
            Ok(Some(group)) => {
                debug!(
                    group = %group_name,
                    members = group.member_user_ids().len(),
                    "resolved group"
                );
                Ok(GroupResolution::Found(group))
            }
            Ok(None) | Err(AppError::NotFound(_)) => Ok(GroupResolution::NotFound),
            Err(error) if error.is_fatal() => Err(error),
            Err(error) => Ok(GroupResolution::Unavailable(error.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use ipa_notify_core::AppError;

    use super::{GroupMembershipResolver, GroupResolution};
    use crate::test_support::FakeDirectorySession;

    fn resolver(directory: FakeDirectorySession) -> GroupMembershipResolver {
        GroupMembershipResolver::new(Arc::new(directory), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn existing_group_resolves_members_in_order() {
        let resolver = resolver(
            FakeDirectorySession::default().with_group("users", &["carol", "alice", "bob"]),
        );

        let resolution = resolver
            .resolve("users")
            .await
            .unwrap_or_else(|error| panic!("unexpected error: {error}"));

        match resolution {
            GroupResolution::Found(group) => {
                assert_eq!(group.name(), "users");
                assert_eq!(group.member_user_ids(), ["carol", "alice", "bob"]);
            }
            other => panic!("expected group, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_group_is_not_found() {
        let resolver = resolver(FakeDirectorySession::default());

        let resolution = resolver.resolve("ghosts").await;
        assert!(matches!(resolution, Ok(GroupResolution::NotFound)));
    }

    #[tokio::test]
    async fn failing_lookup_is_unavailable() {
        let mut directory = FakeDirectorySession::default();
        directory.failing_groups.insert("users".to_owned());
        let resolver = resolver(directory);

        let resolution = resolver.resolve("users").await;
        assert!(matches!(resolution, Ok(GroupResolution::Unavailable(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_lookup_times_out_as_unavailable() {
        let mut directory = FakeDirectorySession::default().with_group("users", &["alice"]);
        directory.hanging_groups.insert("users".to_owned());
        let resolver = GroupMembershipResolver::new(Arc::new(directory), Duration::from_secs(1));

        let resolution = resolver.resolve("users").await;
        assert!(matches!(
            resolution,
            Ok(GroupResolution::Unavailable(reason)) if reason.starts_with("timed out")
        ));
    }

    #[tokio::test]
    async fn unauthorized_lookup_is_fatal() {
        let mut directory = FakeDirectorySession::default();
        directory.unauthorized_groups.insert("users".to_owned());
        let resolver = resolver(directory);

        let resolution = resolver.resolve("users").await;
        assert!(matches!(resolution, Err(AppError::Unauthorized(_))));
    }
}
