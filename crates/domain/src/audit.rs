//! Audit events and the run-level result they fold into.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Notice owed to a user whose password expires within the threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpirationNotice {
    /// Directory user identifier.
    pub user_id: String,
    /// Canonical mail address the notice goes to.
    pub email: String,
    /// Password expiration timestamp.
    pub expires_at: DateTime<Utc>,
    /// Whole days left, negative once expired.
    pub days_remaining: i64,
}

/// Locked account reported in the administrator digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedUserRecord {
    /// Directory user identifier.
    pub user_id: String,
    /// Canonical mail address, when the directory has one.
    pub email: Option<String>,
}

/// Why a configured group could not be audited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum GroupErrorReason {
    /// The directory has no group with that name.
    NotFound,
    /// The directory call failed or timed out.
    Unavailable(String),
}

/// Group-level recoverable error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupError {
    /// Configured group name.
    pub group_name: String,
    /// Failure category.
    pub reason: GroupErrorReason,
}

/// User-level recoverable problem found while auditing one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum UserIssueKind {
    /// Group lists the member but the user lookup found nothing.
    NotFound,
    /// No canonical mail address, so no expiration notice can be sent.
    MissingEmail,
    /// No password expiration attribute.
    MissingExpiration,
    /// Expiration attribute is not valid generalized time.
    MalformedExpiration(String),
    /// The directory call failed or timed out.
    Unavailable(String),
}

impl UserIssueKind {
    /// Returns a stable short label for logs and summaries.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::MissingEmail => "missing_email",
            Self::MissingExpiration => "missing_expiration",
            Self::MalformedExpiration(_) => "malformed_expiration",
            Self::Unavailable(_) => "unavailable",
        }
    }

    /// Returns true when the user record could not be fetched at all.
    #[must_use]
    pub fn is_lookup_failure(&self) -> bool {
        matches!(self, Self::NotFound | Self::Unavailable(_))
    }
}

/// Recorded user issue with its audit context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIssue {
    /// Group the member was reached through.
    pub group_name: String,
    /// Directory user identifier.
    pub user_id: String,
    /// Issue category.
    pub kind: UserIssueKind,
}

/// Everything one user contributed to the audit.
///
/// Expiration and lock checks are independent: a user can carry both a notice
/// and a locked record, either, or neither.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserAuditOutcome {
    /// Directory user identifier.
    pub user_id: String,
    /// Notice owed to the user, if the password expires within the threshold.
    pub expiration_notice: Option<ExpirationNotice>,
    /// Locked record, if the account is locked.
    pub locked: Option<LockedUserRecord>,
    /// Soft problems that skipped one of the checks.
    pub issues: Vec<UserIssueKind>,
}

impl UserAuditOutcome {
    /// Creates an empty outcome for a user.
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::default()
        }
    }
}

/// Run-level audit result, accumulated across every configured group.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuditResult {
    /// Notices in group order, then member order.
    pub expiration_notices: Vec<ExpirationNotice>,
    /// Locked accounts in group order, then member order.
    pub locked_users: Vec<LockedUserRecord>,
    /// Groups that could not be audited.
    pub group_errors: Vec<GroupError>,
    /// Members whose checks were partly or fully skipped.
    pub user_issues: Vec<UserIssue>,
}

impl AuditResult {
    /// Returns locked user identifiers in audit order.
    #[must_use]
    pub fn locked_user_ids(&self) -> Vec<&str> {
        self.locked_users
            .iter()
            .map(|record| record.user_id.as_str())
            .collect()
    }
}

/// One step of an audit run, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditEntry {
    /// A member of `group_name` was audited.
    User {
        /// Group the member was reached through.
        group_name: String,
        /// What the audit found.
        outcome: UserAuditOutcome,
    },
    /// A configured group could not be audited.
    Group(GroupError),
}

/// Single-owner accumulator for [`AuditResult`].
///
/// Keeps insertion order and performs no deduplication; callers that audit
/// each user once check [`AuditAggregator::is_audited`] before fetching.
/// A user whose lookup failed is not counted as audited.
#[derive(Debug, Default)]
pub struct AuditAggregator {
    result: AuditResult,
    audited_user_ids: HashSet<String>,
}

impl AuditAggregator {
    /// Creates an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds audit entries into a result, preserving their order.
    #[must_use]
    pub fn fold(entries: impl IntoIterator<Item = AuditEntry>) -> AuditResult {
        let mut aggregator = Self::new();
        for entry in entries {
            aggregator.record(entry);
        }

        aggregator.finish()
    }

    /// Appends one entry.
    pub fn record(&mut self, entry: AuditEntry) {
        match entry {
            AuditEntry::User {
                group_name,
                outcome,
            } => self.record_user(group_name.as_str(), outcome),
            AuditEntry::Group(error) => self.record_group_error(error),
        }
    }

    /// Appends everything one user contributed.
    pub fn record_user(&mut self, group_name: &str, outcome: UserAuditOutcome) {
        let UserAuditOutcome {
            user_id,
            expiration_notice,
            locked,
            issues,
        } = outcome;
        let fetched = !issues.iter().any(UserIssueKind::is_lookup_failure);

        if let Some(notice) = expiration_notice {
            self.result.expiration_notices.push(notice);
        }

        if let Some(record) = locked {
            self.result.locked_users.push(record);
        }

        self.result
            .user_issues
            .extend(issues.into_iter().map(|kind| UserIssue {
                group_name: group_name.to_owned(),
                user_id: user_id.clone(),
                kind,
            }));

        if fetched {
            self.audited_user_ids.insert(user_id);
        }
    }

    /// Appends a group-level error.
    pub fn record_group_error(&mut self, error: GroupError) {
        self.result.group_errors.push(error);
    }

    /// Returns whether the user was fetched and assessed earlier in this run.
    #[must_use]
    pub fn is_audited(&self, user_id: &str) -> bool {
        self.audited_user_ids.contains(user_id)
    }

    /// Returns the accumulated result.
    #[must_use]
    pub fn finish(self) -> AuditResult {
        self.result
    }
}
