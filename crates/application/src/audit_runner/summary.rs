use ipa_notify_core::AppError;
use ipa_notify_domain::AuditResult;

use crate::{DeliveryStatus, DispatchReport, MessageKind};

/// Lifecycle of one audit run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditRunState {
    /// Configuration frozen, nothing contacted yet.
    Init,
    /// Establishing the directory session.
    Authenticating,
    /// Walking configured groups and their members.
    AuditingGroups,
    /// Sending notices and the locked-users digest.
    Dispatching,
    /// Finished; soft errors are in the summary.
    Done,
    /// Stopped on an unauthenticated session; nothing was dispatched.
    Aborted,
}

impl AuditRunState {
    /// Returns a stable label for logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Authenticating => "authenticating",
            Self::AuditingGroups => "auditing_groups",
            Self::Dispatching => "dispatching",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }
}

/// Counters describing a finished or aborted run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Groups whose members were audited.
    pub groups_audited: usize,
    /// Groups that were missing or unavailable.
    pub group_errors: usize,
    /// Member audits performed, duplicates across groups included.
    pub users_audited: usize,
    /// Soft per-user problems.
    pub user_issues: usize,
    /// Expiration notices owed.
    pub expiration_notices: usize,
    /// Notices handed to the mail transport.
    pub notices_delivered: usize,
    /// Notices the transport rejected.
    pub notices_failed: usize,
    /// Notices only logged because of dry run.
    pub notices_skipped: usize,
    /// Locked accounts found.
    pub locked_users: usize,
    /// Status of the administrator digest, when one was due.
    pub admin_digest: Option<DeliveryStatus>,
}

impl RunSummary {
    pub(super) fn new(
        result: &AuditResult,
        report: &DispatchReport,
        groups_audited: usize,
        users_audited: usize,
    ) -> Self {
        Self {
            groups_audited,
            group_errors: result.group_errors.len(),
            users_audited,
            user_issues: result.user_issues.len(),
            expiration_notices: result.expiration_notices.len(),
            notices_delivered: report.delivered(MessageKind::ExpirationNotice),
            notices_failed: report.failed(MessageKind::ExpirationNotice),
            notices_skipped: report.skipped(MessageKind::ExpirationNotice),
            locked_users: result.locked_users.len(),
            admin_digest: report.admin_digest().map(|digest| digest.status.clone()),
        }
    }
}

/// Final observable outcome of [`crate::AuditRunner::run`].
#[derive(Debug)]
pub struct RunOutcome {
    /// Terminal state, `Done` or `Aborted`.
    pub state: AuditRunState,
    /// Run counters.
    pub summary: RunSummary,
    /// Aggregated audit result; empty when aborted.
    pub result: AuditResult,
    /// Per-message dispatch outcome; empty when aborted.
    pub report: DispatchReport,
    /// Fatal error that aborted the run.
    pub abort_error: Option<AppError>,
}

impl RunOutcome {
    /// Returns true when the run reached `Done`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.state == AuditRunState::Done
    }

    /// Returns the process exit status for this outcome.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        if self.is_success() { 0 } else { 1 }
    }
}
