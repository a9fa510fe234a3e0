//! Email service that writes messages to the log instead of an SMTP relay.

use async_trait::async_trait;
use ipa_notify_application::EmailService;
use ipa_notify_core::AppResult;
use tracing::info;

/// Logs each message as one event per body line, for hosts without a relay.
#[derive(Clone, Default)]
pub struct ConsoleEmailService;

#[async_trait]
impl EmailService for ConsoleEmailService {
    async fn send_email(&self, to: &str, subject: &str, text_body: &str) -> AppResult<()> {
        info!(to = %to, subject = %subject, "console mail");
        for line in text_body.lines().filter(|line| !line.trim().is_empty()) {
            info!(to = %to, "  {line}");
        }

        Ok(())
    }
}
