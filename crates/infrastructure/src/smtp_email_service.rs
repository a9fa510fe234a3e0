//! SMTP email service using the `lettre` crate.

use async_trait::async_trait;
use ipa_notify_application::EmailService;
use ipa_notify_core::{AppError, AppResult};
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// Transport security for the SMTP connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// Implicit TLS, usually port 465.
    Tls,
    /// Plain connection upgraded with STARTTLS, usually port 587.
    StartTls,
    /// Unencrypted, for a local relay on port 25.
    None,
}

/// SMTP email service configuration.
#[derive(Clone)]
pub struct SmtpEmailConfig {
    /// SMTP server hostname.
    pub host: String,
    /// SMTP server port.
    pub port: u16,
    /// Connection security.
    pub security: SmtpSecurity,
    /// SMTP username and password, when the relay requires them.
    pub credentials: Option<(String, String)>,
    /// Sender email address.
    pub from_address: String,
}

/// Production email service using SMTP.
#[derive(Clone)]
pub struct SmtpEmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailService {
    /// Creates a new SMTP email service.
    pub fn new(config: SmtpEmailConfig) -> AppResult<Self> {
        let from = config
            .from_address
            .parse()
            .map_err(|error| AppError::Validation(format!("invalid from address: {error}")))?;

        let builder = match config.security {
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host),
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            }
            SmtpSecurity::None => Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(
                &config.host,
            )),
        }
        .map_err(|error| AppError::Internal(format!("failed to create SMTP transport: {error}")))?;

        let builder = builder.port(config.port);
        let mailer = match config.credentials {
            Some((username, password)) => builder
                .credentials(Credentials::new(username, password))
                .build(),
            None => builder.build(),
        };

        Ok(Self { mailer, from })
    }
}

#[async_trait]
impl EmailService for SmtpEmailService {
    async fn send_email(&self, to: &str, subject: &str, text_body: &str) -> AppResult<()> {
        let to_mailbox: Mailbox = to
            .parse()
            .map_err(|error| AppError::Delivery(format!("invalid recipient address: {error}")))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(text_body.to_owned())
            .map_err(|error| AppError::Delivery(format!("failed to build email: {error}")))?;

        self.mailer
            .send(message)
            .await
            .map_err(|error| AppError::Delivery(format!("failed to send email: {error}")))?;

        Ok(())
    }
}
