//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod audit;
mod expiration;
mod user;

pub use audit::{
    AuditAggregator, AuditEntry, AuditResult, ExpirationNotice, GroupError, GroupErrorReason,
    LockedUserRecord, UserAuditOutcome, UserIssue, UserIssueKind,
};
pub use expiration::{ExpirationAssessment, evaluate_expiration, parse_generalized_time};
pub use user::{EmailAddress, GroupInfo, UserRecord};
