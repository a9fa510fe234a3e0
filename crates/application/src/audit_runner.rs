use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use ipa_notify_core::{AppError, AppResult};
use ipa_notify_domain::{
    AuditAggregator, AuditResult, GroupError, GroupErrorReason, GroupInfo,
};
use tracing::{debug, error, info, warn};

use crate::deadline::with_deadline;
use crate::{
    DirectorySession, DispatchReport, EmailService, GroupMembershipResolver, GroupResolution,
    NotificationDispatcher, UserAuditor,
};

mod config;
mod summary;

pub use config::{AuditRunConfig, AuditRunConfigInput, DEFAULT_CALL_TIMEOUT};
pub use summary::{AuditRunState, RunOutcome, RunSummary};

struct GroupsAudit {
    result: AuditResult,
    groups_audited: usize,
    users_audited: usize,
}

/// Orchestrates one audit run: authenticate, audit groups, dispatch.
#[derive(Clone)]
pub struct AuditRunner {
    config: AuditRunConfig,
    directory: Arc<dyn DirectorySession>,
    resolver: GroupMembershipResolver,
    auditor: UserAuditor,
    dispatcher: NotificationDispatcher,
}

impl AuditRunner {
    /// Creates a runner over a directory session and an email port.
    #[must_use]
    pub fn new(
        config: AuditRunConfig,
        directory: Arc<dyn DirectorySession>,
        email_service: Arc<dyn EmailService>,
    ) -> Self {
        let call_timeout = config.call_timeout();

        Self {
            resolver: GroupMembershipResolver::new(directory.clone(), call_timeout),
            auditor: UserAuditor::new(directory.clone(), call_timeout),
            dispatcher: NotificationDispatcher::new(email_service, call_timeout),
            directory,
            config,
        }
    }

    /// Returns the frozen run configuration.
    #[must_use]
    pub fn config(&self) -> &AuditRunConfig {
        &self.config
    }

    /// Runs the audit against the current time.
    pub async fn run(&self) -> RunOutcome {
        self.run_at(Utc::now()).await
    }

    /// Runs the audit with `now` as the reference time for expirations.
    ///
    /// Always returns an outcome. Only an unauthenticated session ends in
    /// `Aborted`; every other failure is recorded and the run continues.
    pub async fn run_at(&self, now: DateTime<Utc>) -> RunOutcome {
        let mut state = AuditRunState::Init;

        transition(&mut state, AuditRunState::Authenticating);
        let authentication = with_deadline(
            self.config.call_timeout(),
            "directory authentication",
            self.directory.authenticate(),
        )
        .await;
        if let Err(failure) = authentication {
            error!(error = %failure, "login denied");
            return abort(&mut state, failure);
        }

        transition(&mut state, AuditRunState::AuditingGroups);
        let audit = match self.audit_groups(now).await {
            Ok(audit) => audit,
            Err(failure) => {
                error!(error = %failure, "directory session rejected during audit");
                return abort(&mut state, failure);
            }
        };

        transition(&mut state, AuditRunState::Dispatching);
        let report = self
            .dispatcher
            .dispatch(&audit.result, self.config.mode(), self.config.admin_email())
            .await;

        transition(&mut state, AuditRunState::Done);
        let summary = RunSummary::new(
            &audit.result,
            &report,
            audit.groups_audited,
            audit.users_audited,
        );
        info!(
            mode = self.config.mode().as_str(),
            groups_audited = summary.groups_audited,
            group_errors = summary.group_errors,
            users_audited = summary.users_audited,
            user_issues = summary.user_issues,
            expiration_notices = summary.expiration_notices,
            notices_delivered = summary.notices_delivered,
            notices_failed = summary.notices_failed,
            notices_skipped = summary.notices_skipped,
            locked_users = summary.locked_users,
            admin_digest = ?summary.admin_digest,
            "audit run finished"
        );

        RunOutcome {
            state,
            summary,
            result: audit.result,
            report,
            abort_error: None,
        }
    }

    async fn audit_groups(&self, now: DateTime<Utc>) -> AppResult<GroupsAudit> {
        let mut aggregator = AuditAggregator::new();
        let mut groups_audited = 0_usize;
        let mut users_audited = 0_usize;

        for group_name in self.config.groups() {
            let group = match self.resolver.resolve(group_name.as_str()).await? {
                GroupResolution::Found(group) => group,
                GroupResolution::NotFound => {
                    warn!(group = %group_name, "group not found");
                    aggregator.record_group_error(GroupError {
                        group_name: group_name.to_string(),
                        reason: GroupErrorReason::NotFound,
                    });
                    continue;
                }
                GroupResolution::Unavailable(reason) => {
                    warn!(group = %group_name, error = %reason, "group lookup failed");
                    aggregator.record_group_error(GroupError {
                        group_name: group_name.to_string(),
                        reason: GroupErrorReason::Unavailable(reason),
                    });
                    continue;
                }
            };

            let audited = self.audit_members(&group, now, &mut aggregator).await?;
            info!(group = %group_name, users_audited = audited, "group audited");
            users_audited = users_audited.saturating_add(audited);
            groups_audited = groups_audited.saturating_add(1);
        }

        Ok(GroupsAudit {
            result: aggregator.finish(),
            groups_audited,
            users_audited,
        })
    }

    async fn audit_members(
        &self,
        group: &GroupInfo,
        now: DateTime<Utc>,
        aggregator: &mut AuditAggregator,
    ) -> AppResult<usize> {
        let member_ids: Vec<&str> = group
            .member_user_ids()
            .iter()
            .map(String::as_str)
            .filter(|user_id| {
                let already_audited = self.config.dedupe_users() && aggregator.is_audited(user_id);
                if already_audited {
                    debug!(
                        group = %group.name(),
                        user_id = %user_id,
                        "user already audited through an earlier group"
                    );
                }
                !already_audited
            })
            .collect();

        let limit_days = self.config.limit_days();
        // buffered() yields in input order whatever the completion order.
        let mut outcomes = stream::iter(member_ids)
            .map(|user_id| self.auditor.audit(user_id, now, limit_days))
            .buffered(self.config.user_fetch_concurrency());

        let mut audited = 0_usize;
        while let Some(outcome) = outcomes.next().await {
            aggregator.record_user(group.name(), outcome?);
            audited = audited.saturating_add(1);
        }

        Ok(audited)
    }
}

fn transition(state: &mut AuditRunState, next: AuditRunState) {
    debug!(from = state.as_str(), to = next.as_str(), "audit run state change");
    *state = next;
}

fn abort(state: &mut AuditRunState, failure: AppError) -> RunOutcome {
    transition(state, AuditRunState::Aborted);

    RunOutcome {
        state: *state,
        summary: RunSummary::default(),
        result: AuditResult::default(),
        report: DispatchReport::default(),
        abort_error: Some(failure),
    }
}
