//! Audit and notification services and their ports.

#![forbid(unsafe_code)]

mod audit_runner;
mod deadline;
mod directory_ports;
mod group_resolver;
mod notification_dispatcher;
mod notification_ports;
mod user_auditor;

#[cfg(test)]
mod test_support;

pub use audit_runner::{
    AuditRunConfig, AuditRunConfigInput, AuditRunState, AuditRunner, DEFAULT_CALL_TIMEOUT,
    RunOutcome, RunSummary,
};
pub use directory_ports::DirectorySession;
pub use group_resolver::{GroupMembershipResolver, GroupResolution};
pub use notification_dispatcher::{
    DeliveryStatus, DispatchMode, DispatchReport, DispatchedMessage, MessageKind,
    NotificationDispatcher,
};
pub use notification_ports::EmailService;
pub use user_auditor::{UserAuditor, assess_user};
