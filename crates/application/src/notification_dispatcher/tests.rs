use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;

use ipa_notify_domain::{AuditResult, EmailAddress, ExpirationNotice, LockedUserRecord};

use super::{DeliveryStatus, DispatchMode, MessageKind, NotificationDispatcher};
use crate::test_support::{FakeEmailService, now};

fn admin() -> EmailAddress {
    EmailAddress::new("admin@domain.com").unwrap_or_else(|_| panic!("valid admin address"))
}

fn notice(user_id: &str, days_remaining: i64) -> ExpirationNotice {
    ExpirationNotice {
        user_id: user_id.to_owned(),
        email: format!("{user_id}@domain.com"),
        expires_at: now() + TimeDelta::days(days_remaining),
        days_remaining,
    }
}

fn locked(user_id: &str) -> LockedUserRecord {
    LockedUserRecord {
        user_id: user_id.to_owned(),
        email: Some(format!("{user_id}@domain.com")),
    }
}

fn dispatcher(email_service: Arc<FakeEmailService>) -> NotificationDispatcher {
    NotificationDispatcher::new(email_service, Duration::from_secs(5))
}

#[tokio::test]
async fn live_mode_sends_one_message_per_notice() {
    let email_service = Arc::new(FakeEmailService::default());
    let result = AuditResult {
        expiration_notices: vec![notice("alice", 3), notice("bob", -1)],
        ..AuditResult::default()
    };

    let report = dispatcher(email_service.clone())
        .dispatch(&result, DispatchMode::Live, &admin())
        .await;

    let attempts = email_service.recorded_attempts().await;
    let recipients: Vec<&str> = attempts.iter().map(|email| email.to.as_str()).collect();
    assert_eq!(recipients, vec!["alice@domain.com", "bob@domain.com"]);
    assert!(attempts[0].body.contains("in 3 days"));
    assert_eq!(report.delivered(MessageKind::ExpirationNotice), 2);
    assert!(report.admin_digest().is_none());
}

#[tokio::test]
async fn locked_users_produce_a_single_admin_digest() {
    let email_service = Arc::new(FakeEmailService::default());
    let result = AuditResult {
        locked_users: vec![locked("bob"), locked("carol")],
        ..AuditResult::default()
    };

    let report = dispatcher(email_service.clone())
        .dispatch(&result, DispatchMode::Live, &admin())
        .await;

    let attempts = email_service.recorded_attempts().await;
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].to, "admin@domain.com");
    assert!(attempts[0].body.contains("bob"));
    assert!(attempts[0].body.contains("carol"));
    assert_eq!(report.delivered(MessageKind::LockedUsersDigest), 1);
    assert_eq!(report.messages_of(MessageKind::ExpirationNotice).count(), 0);
}

#[tokio::test]
async fn no_locked_users_means_no_admin_digest() {
    let email_service = Arc::new(FakeEmailService::default());

    let report = dispatcher(email_service.clone())
        .dispatch(&AuditResult::default(), DispatchMode::Live, &admin())
        .await;

    assert!(email_service.recorded_attempts().await.is_empty());
    assert!(report.messages().is_empty());
}

#[tokio::test]
async fn failed_delivery_does_not_stop_remaining_messages() {
    let email_service = Arc::new(FakeEmailService::failing_for(&["alice@domain.com"]));
    let result = AuditResult {
        expiration_notices: vec![notice("alice", 1), notice("bob", 2)],
        locked_users: vec![locked("carol")],
        ..AuditResult::default()
    };

    let report = dispatcher(email_service.clone())
        .dispatch(&result, DispatchMode::Live, &admin())
        .await;

    assert_eq!(email_service.recorded_attempts().await.len(), 3);
    assert_eq!(report.failed(MessageKind::ExpirationNotice), 1);
    assert_eq!(report.delivered(MessageKind::ExpirationNotice), 1);
    assert!(matches!(
        report.messages()[0].status,
        DeliveryStatus::Failed(_)
    ));
    assert_eq!(
        report.admin_digest().map(|digest| &digest.status),
        Some(&DeliveryStatus::Delivered)
    );
}

#[tokio::test]
async fn dry_run_never_calls_the_email_port() {
    let email_service = Arc::new(FakeEmailService::default());
    let result = AuditResult {
        expiration_notices: vec![notice("alice", 3), notice("bob", 0)],
        locked_users: vec![locked("carol"), locked("dave")],
        ..AuditResult::default()
    };

    let report = dispatcher(email_service.clone())
        .dispatch(&result, DispatchMode::DryRun, &admin())
        .await;

    assert!(email_service.recorded_attempts().await.is_empty());
    assert_eq!(report.skipped(MessageKind::ExpirationNotice), 2);
    assert_eq!(report.skipped(MessageKind::LockedUsersDigest), 1);
    assert_eq!(report.delivered(MessageKind::ExpirationNotice), 0);

    let digest = report
        .admin_digest()
        .unwrap_or_else(|| panic!("expected digest"));
    assert!(digest.body.contains("carol"));
    assert!(digest.body.contains("dave"));
}

#[tokio::test]
async fn dry_run_reports_the_same_messages_live_would_attempt() {
    let result = AuditResult {
        expiration_notices: vec![notice("alice", 3), notice("bob", 5)],
        locked_users: vec![locked("carol")],
        ..AuditResult::default()
    };

    let live = dispatcher(Arc::new(FakeEmailService::default()))
        .dispatch(&result, DispatchMode::Live, &admin())
        .await;
    let dry_run = dispatcher(Arc::new(FakeEmailService::default()))
        .dispatch(&result, DispatchMode::DryRun, &admin())
        .await;

    assert_eq!(live.messages().len(), dry_run.messages().len());
    for (live_message, dry_message) in live.messages().iter().zip(dry_run.messages()) {
        assert_eq!(live_message.recipient, dry_message.recipient);
        assert_eq!(live_message.subject, dry_message.subject);
    }
}

#[tokio::test(start_paused = true)]
async fn hanging_delivery_fails_that_message_only() {
    let email_service = Arc::new(FakeEmailService::hanging_for(&[
        "alice@domain.com",
        "admin@domain.com",
    ]));
    let result = AuditResult {
        expiration_notices: vec![notice("alice", 1), notice("bob", 2), notice("carol", 3)],
        locked_users: vec![locked("dave")],
        ..AuditResult::default()
    };

    let report = NotificationDispatcher::new(email_service.clone(), Duration::from_secs(1))
        .dispatch(&result, DispatchMode::Live, &admin())
        .await;

    let recipients: Vec<String> = email_service
        .recorded_attempts()
        .await
        .into_iter()
        .map(|email| email.to)
        .collect();
    assert_eq!(
        recipients,
        vec![
            "alice@domain.com",
            "bob@domain.com",
            "carol@domain.com",
            "admin@domain.com"
        ]
    );
    assert!(matches!(
        &report.messages()[0].status,
        DeliveryStatus::Failed(reason) if reason.contains("did not complete")
    ));
    assert_eq!(report.failed(MessageKind::ExpirationNotice), 1);
    assert_eq!(report.delivered(MessageKind::ExpirationNotice), 2);
    assert!(matches!(
        report.admin_digest().map(|digest| &digest.status),
        Some(DeliveryStatus::Failed(_))
    ));
}
