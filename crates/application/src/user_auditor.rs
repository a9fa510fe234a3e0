use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ipa_notify_core::{AppError, AppResult};
use ipa_notify_domain::{
    ExpirationNotice, LockedUserRecord, UserAuditOutcome, UserIssueKind, UserRecord,
    evaluate_expiration, parse_generalized_time,
};
use tracing::warn;

use crate::DirectorySession;
use crate::deadline::with_deadline;

/// Audits one member: fetches the user, then runs the expiration and lock checks.
#[derive(Clone)]
pub struct UserAuditor {
    directory: Arc<dyn DirectorySession>,
    call_timeout: Duration,
}

impl UserAuditor {
    /// Creates an auditor bounded by `call_timeout` per lookup.
    #[must_use]
    pub fn new(directory: Arc<dyn DirectorySession>, call_timeout: Duration) -> Self {
        Self {
            directory,
            call_timeout,
        }
    }

    /// Fetches and assesses one user.
    ///
    /// Lookup problems land in the outcome's issues; `Err` is returned only
    /// for an unauthenticated session.
    pub async fn audit(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        limit_days: i64,
    ) -> AppResult<UserAuditOutcome> {
        let lookup = with_deadline(
            self.call_timeout,
            "user lookup",
            self.directory.find_user(user_id),
        )
        .await;

        let outcome = match lookup {
            Ok(Some(user)) => assess_user(&user, now, limit_days),
            Ok(None) | Err(AppError::NotFound(_)) => {
                let mut outcome = UserAuditOutcome::new(user_id);
                outcome.issues.push(UserIssueKind::NotFound);
                outcome
            }
            Err(error) if error.is_fatal() => return Err(error),
            Err(error) => {
                let mut outcome = UserAuditOutcome::new(user_id);
                outcome
                    .issues
                    .push(UserIssueKind::Unavailable(error.to_string()));
                outcome
            }
        };

        for issue in &outcome.issues {
            match issue {
                UserIssueKind::MissingEmail => warn!(
                    user_id = %user_id,
                    "user has no mail address; expiration notice cannot be sent"
                ),
                UserIssueKind::MalformedExpiration(detail)
                | UserIssueKind::Unavailable(detail) => warn!(
                    user_id = %user_id,
                    issue = issue.as_str(),
                    error = %detail,
                    "user audit degraded"
                ),
                UserIssueKind::NotFound | UserIssueKind::MissingExpiration => warn!(
                    user_id = %user_id,
                    issue = issue.as_str(),
                    "user audit degraded"
                ),
            }
        }

        Ok(outcome)
    }
}

/// Runs the expiration and lock checks on an already fetched user.
///
/// The checks are independent. A missing mail address or an unusable
/// expiration value skips only the expiration notice; the lock check
/// always runs.
#[must_use]
pub fn assess_user(user: &UserRecord, now: DateTime<Utc>, limit_days: i64) -> UserAuditOutcome {
    let mut outcome = UserAuditOutcome::new(user.id());
    let email = user.canonical_email();

    if user.is_locked() {
        outcome.locked = Some(LockedUserRecord {
            user_id: user.id().to_owned(),
            email: email.map(str::to_owned),
        });
    }

    if email.is_none() {
        outcome.issues.push(UserIssueKind::MissingEmail);
    }

    let expires_at = match user.password_expires_at().map(parse_generalized_time) {
        Some(Ok(expires_at)) => expires_at,
        Some(Err(error)) => {
            outcome
                .issues
                .push(UserIssueKind::MalformedExpiration(error.to_string()));
            return outcome;
        }
        None => {
            outcome.issues.push(UserIssueKind::MissingExpiration);
            return outcome;
        }
    };

    let assessment = evaluate_expiration(expires_at, now, limit_days);
    if let (true, Some(email)) = (assessment.should_notify, email) {
        outcome.expiration_notice = Some(ExpirationNotice {
            user_id: user.id().to_owned(),
            email: email.to_owned(),
            expires_at,
            days_remaining: assessment.days_remaining,
        });
    }

    outcome
}
