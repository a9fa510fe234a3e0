use async_trait::async_trait;
use ipa_notify_core::AppResult;

/// Outbound mail port used for every notification.
#[async_trait]
pub trait EmailService: Send + Sync {
    /// Sends a plain-text email.
    async fn send_email(&self, to: &str, subject: &str, text_body: &str) -> AppResult<()>;
}
