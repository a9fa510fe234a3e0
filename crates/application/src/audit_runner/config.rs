use std::time::Duration;

use ipa_notify_core::{AppError, AppResult, NonEmptyString};
use ipa_notify_domain::EmailAddress;

use crate::DispatchMode;

/// Default bound on a single directory or mail call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw audit settings before validation.
#[derive(Debug, Clone)]
pub struct AuditRunConfigInput {
    /// Groups to audit, in order.
    pub groups: Vec<String>,
    /// Notify when this many whole days or fewer remain.
    pub limit_days: i64,
    /// Recipient of the locked-users digest.
    pub admin_email: String,
    /// Live delivery or dry run.
    pub mode: DispatchMode,
    /// Bound on each directory or mail call.
    pub call_timeout: Duration,
    /// Users fetched concurrently within one group.
    pub user_fetch_concurrency: usize,
    /// Audit each user once even when listed in several groups.
    pub dedupe_users: bool,
}

impl AuditRunConfigInput {
    /// Creates input with defaults for everything but the core settings.
    #[must_use]
    pub fn new(
        groups: Vec<String>,
        limit_days: i64,
        admin_email: impl Into<String>,
        mode: DispatchMode,
    ) -> Self {
        Self {
            groups,
            limit_days,
            admin_email: admin_email.into(),
            mode,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            user_fetch_concurrency: 1,
            dedupe_users: false,
        }
    }
}

/// Validated, immutable audit settings.
#[derive(Debug, Clone)]
pub struct AuditRunConfig {
    groups: Vec<NonEmptyString>,
    limit_days: i64,
    admin_email: EmailAddress,
    mode: DispatchMode,
    call_timeout: Duration,
    user_fetch_concurrency: usize,
    dedupe_users: bool,
}

impl AuditRunConfig {
    /// Validates raw settings.
    pub fn new(input: AuditRunConfigInput) -> AppResult<Self> {
        if input.groups.is_empty() {
            return Err(AppError::Validation(
                "at least one group must be configured".to_owned(),
            ));
        }

        let groups = input
            .groups
            .into_iter()
            .map(|group| {
                NonEmptyString::new(group).map_err(|_| {
                    AppError::Validation("group names must not be blank".to_owned())
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        if input.limit_days < 0 {
            return Err(AppError::Validation(format!(
                "limit must not be negative, got {}",
                input.limit_days
            )));
        }

        let admin_email = EmailAddress::new(input.admin_email)?;

        if input.call_timeout.is_zero() {
            return Err(AppError::Validation(
                "call timeout must be greater than zero".to_owned(),
            ));
        }

        if input.user_fetch_concurrency == 0 {
            return Err(AppError::Validation(
                "user fetch concurrency must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            groups,
            limit_days: input.limit_days,
            admin_email,
            mode: input.mode,
            call_timeout: input.call_timeout,
            user_fetch_concurrency: input.user_fetch_concurrency,
            dedupe_users: input.dedupe_users,
        })
    }

    /// Returns configured groups in audit order.
    #[must_use]
    pub fn groups(&self) -> &[NonEmptyString] {
        self.groups.as_slice()
    }

    /// Returns the notice threshold in whole days.
    #[must_use]
    pub fn limit_days(&self) -> i64 {
        self.limit_days
    }

    /// Returns the digest recipient.
    #[must_use]
    pub fn admin_email(&self) -> &EmailAddress {
        &self.admin_email
    }

    /// Returns the dispatch mode.
    #[must_use]
    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Returns the per-call timeout.
    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Returns the per-group user fetch concurrency.
    #[must_use]
    pub fn user_fetch_concurrency(&self) -> usize {
        self.user_fetch_concurrency
    }

    /// Returns whether users are audited once across groups.
    #[must_use]
    pub fn dedupe_users(&self) -> bool {
        self.dedupe_users
    }
}
