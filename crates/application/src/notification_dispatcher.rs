use std::sync::Arc;
use std::time::Duration;

use ipa_notify_domain::{AuditResult, EmailAddress};
use tracing::{info, warn};

use crate::EmailService;
use crate::deadline::with_deadline;

use messages::{OutgoingMessage, expiration_message, locked_users_digest};

mod messages;
mod report;

pub use report::{DeliveryStatus, DispatchReport, DispatchedMessage, MessageKind};

/// Whether notifications are actually sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Deliver through the email port.
    Live,
    /// Render and log every message without sending it.
    DryRun,
}

impl DispatchMode {
    /// Returns a stable label for logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::DryRun => "dry_run",
        }
    }
}

/// Turns an audit result into notification deliveries.
#[derive(Clone)]
pub struct NotificationDispatcher {
    email_service: Arc<dyn EmailService>,
    call_timeout: Duration,
}

impl NotificationDispatcher {
    /// Creates a dispatcher bounded by `call_timeout` per delivery.
    #[must_use]
    pub fn new(email_service: Arc<dyn EmailService>, call_timeout: Duration) -> Self {
        Self {
            email_service,
            call_timeout,
        }
    }

    /// Sends one notice per expiring user and at most one locked-user digest.
    ///
    /// A failed delivery is recorded and the remaining messages are still
    /// attempted. In dry-run mode the email port is never called.
    pub async fn dispatch(
        &self,
        result: &AuditResult,
        mode: DispatchMode,
        admin_email: &EmailAddress,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();

        for notice in &result.expiration_notices {
            let message = expiration_message(notice);
            let status = match mode {
                DispatchMode::Live => self.deliver(&message).await,
                DispatchMode::DryRun => {
                    info!(
                        user_id = %notice.user_id,
                        email = %notice.email,
                        days_remaining = notice.days_remaining,
                        expires_at = %notice.expires_at,
                        "dry run: expiration notice not sent"
                    );
                    DeliveryStatus::Skipped
                }
            };
            report.push(dispatched(MessageKind::ExpirationNotice, message, status));
        }

        if result.locked_users.is_empty() {
            return report;
        }

        let message = locked_users_digest(admin_email.as_str(), &result.locked_users);
        let status = match mode {
            DispatchMode::Live => self.deliver(&message).await,
            DispatchMode::DryRun => {
                info!(
                    admin = %admin_email,
                    locked_users = %result.locked_user_ids().join(","),
                    "dry run: locked users digest not sent"
                );
                DeliveryStatus::Skipped
            }
        };
        report.push(dispatched(MessageKind::LockedUsersDigest, message, status));

        report
    }

    async fn deliver(&self, message: &OutgoingMessage) -> DeliveryStatus {
        let delivery = with_deadline(
            self.call_timeout,
            "mail delivery",
            self.email_service.send_email(
                message.to.as_str(),
                message.subject.as_str(),
                message.body.as_str(),
            ),
        )
        .await;

        match delivery {
            Ok(()) => {
                info!(to = %message.to, subject = %message.subject, "notification delivered");
                DeliveryStatus::Delivered
            }
            Err(error) => {
                warn!(
                    to = %message.to,
                    subject = %message.subject,
                    error = %error,
                    "notification delivery failed"
                );
                DeliveryStatus::Failed(error.to_string())
            }
        }
    }
}

fn dispatched(
    kind: MessageKind,
    message: OutgoingMessage,
    status: DeliveryStatus,
) -> DispatchedMessage {
    DispatchedMessage {
        kind,
        recipient: message.to,
        subject: message.subject,
        body: message.body,
        status,
    }
}

#[cfg(test)]
mod tests;
