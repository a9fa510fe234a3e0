use std::time::Duration;

use clap::{Parser, ValueEnum};
use ipa_notify_application::{AuditRunConfig, AuditRunConfigInput, DispatchMode};
use ipa_notify_core::{AppError, AppResult};
use ipa_notify_infrastructure::{FreeIpaConfig, FreeIpaCredentials, SmtpEmailConfig, SmtpSecurity};
use tracing_subscriber::EnvFilter;

/// Notify FreeIPA users about expiring passwords and report locked accounts.
#[derive(Debug, Parser)]
#[command(name = "ipa-notify", version, about, long_about = None)]
pub struct Cli {
    /// IPA server FQDN, or a base URL with an explicit scheme.
    #[arg(long, env = "IPA_NOTIFY_SERVER", default_value = "ipa.domain.com")]
    pub server: String,

    /// Verify the IPA server TLS certificate (default).
    #[arg(long, overrides_with = "no_verify_ssl")]
    pub verify_ssl: bool,

    /// Skip TLS certificate verification.
    #[arg(long, env = "IPA_NOTIFY_NO_VERIFY_SSL", overrides_with = "verify_ssl")]
    pub no_verify_ssl: bool,

    /// Principal used for password login.
    #[arg(long, env = "IPA_NOTIFY_PRINCIPAL", default_value = "admin@DOMAIN.COM")]
    pub principal: String,

    /// Password for the principal.
    #[arg(
        long,
        env = "IPA_NOTIFY_PASSWORD",
        hide_env_values = true,
        conflicts_with = "session_token"
    )]
    pub password: Option<String>,

    /// Pre-issued `ipa_session` cookie, used instead of a password login.
    #[arg(long, env = "IPA_NOTIFY_SESSION_TOKEN", hide_env_values = true)]
    pub session_token: Option<String>,

    /// JSON-RPC API version sent with every command.
    #[arg(long, env = "IPA_NOTIFY_API_VERSION", default_value = "2.215")]
    pub api_version: String,

    /// Groups to audit, in order.
    #[arg(
        long,
        env = "IPA_NOTIFY_GROUPS",
        num_args = 1..,
        value_delimiter = ',',
        default_value = "users"
    )]
    pub groups: Vec<String>,

    /// Notify users whose password expires within this many days.
    #[arg(
        long,
        env = "IPA_NOTIFY_LIMIT",
        default_value_t = 5,
        allow_negative_numbers = true
    )]
    pub limit: i64,

    /// Address receiving the locked users digest.
    #[arg(long, env = "IPA_NOTIFY_ADMIN", default_value = "admin@domain.com")]
    pub admin: String,

    /// Log what would be sent without sending anything.
    #[arg(long, env = "IPA_NOTIFY_NOOP")]
    pub noop: bool,

    /// How notifications leave the process.
    #[arg(
        long,
        env = "IPA_NOTIFY_MAIL_TRANSPORT",
        value_enum,
        default_value_t = MailTransport::Smtp
    )]
    pub mail_transport: MailTransport,

    /// SMTP relay host.
    #[arg(long, env = "IPA_NOTIFY_SMTP_HOST", default_value = "localhost")]
    pub smtp_host: String,

    /// SMTP relay port.
    #[arg(long, env = "IPA_NOTIFY_SMTP_PORT", default_value_t = 587)]
    pub smtp_port: u16,

    /// SMTP connection security.
    #[arg(
        long,
        env = "IPA_NOTIFY_SMTP_SECURITY",
        value_enum,
        default_value_t = SmtpSecurityArg::Starttls
    )]
    pub smtp_security: SmtpSecurityArg,

    /// SMTP login user.
    #[arg(long, env = "IPA_NOTIFY_SMTP_USER")]
    pub smtp_user: Option<String>,

    /// SMTP login password.
    #[arg(long, env = "IPA_NOTIFY_SMTP_PASS", hide_env_values = true)]
    pub smtp_pass: Option<String>,

    /// Sender address for every notification.
    #[arg(long, env = "IPA_NOTIFY_SMTP_FROM", default_value = "noreply@domain.com")]
    pub smtp_from: String,

    /// Deadline in seconds for each directory or mail call.
    #[arg(long, env = "IPA_NOTIFY_TIMEOUT_SECONDS", default_value_t = 30)]
    pub timeout_seconds: u64,

    /// Users fetched concurrently within one group.
    #[arg(long, env = "IPA_NOTIFY_USER_CONCURRENCY", default_value_t = 1)]
    pub user_concurrency: usize,

    /// Audit each user once even when listed in several groups.
    #[arg(long, env = "IPA_NOTIFY_DEDUPE_USERS")]
    pub dedupe_users: bool,

    /// Default log filter when `RUST_LOG` is unset.
    #[arg(long, env = "IPA_NOTIFY_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Outbound mail transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MailTransport {
    /// Deliver through an SMTP relay.
    Smtp,
    /// Write messages to the log.
    Console,
}

/// SMTP connection security as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SmtpSecurityArg {
    /// Implicit TLS.
    Tls,
    /// STARTTLS upgrade.
    Starttls,
    /// Plain connection.
    None,
}

impl From<SmtpSecurityArg> for SmtpSecurity {
    fn from(value: SmtpSecurityArg) -> Self {
        match value {
            SmtpSecurityArg::Tls => Self::Tls,
            SmtpSecurityArg::Starttls => Self::StartTls,
            SmtpSecurityArg::None => Self::None,
        }
    }
}

pub enum EmailProviderConfig {
    Console,
    Smtp(SmtpEmailConfig),
}

pub struct NotifierConfig {
    pub audit: AuditRunConfig,
    pub directory: FreeIpaConfig,
    pub email_provider: EmailProviderConfig,
}

impl NotifierConfig {
    pub fn from_cli(cli: Cli) -> AppResult<Self> {
        let call_timeout = Duration::from_secs(cli.timeout_seconds);
        let mode = if cli.noop {
            DispatchMode::DryRun
        } else {
            DispatchMode::Live
        };

        let mut audit_input = AuditRunConfigInput::new(cli.groups, cli.limit, cli.admin, mode);
        audit_input.call_timeout = call_timeout;
        audit_input.user_fetch_concurrency = cli.user_concurrency;
        audit_input.dedupe_users = cli.dedupe_users;
        let audit = AuditRunConfig::new(audit_input)?;

        let credentials = match (non_blank(cli.password), non_blank(cli.session_token)) {
            (Some(password), None) => FreeIpaCredentials::Password {
                principal: cli.principal,
                password,
            },
            (None, Some(token)) => FreeIpaCredentials::SessionToken(token),
            (Some(_), Some(_)) => {
                return Err(AppError::Validation(
                    "--password and --session-token are mutually exclusive".to_owned(),
                ));
            }
            (None, None) => {
                return Err(AppError::Validation(
                    "either --password or --session-token is required".to_owned(),
                ));
            }
        };

        let directory = FreeIpaConfig {
            server: cli.server,
            verify_tls: cli.verify_ssl || !cli.no_verify_ssl,
            api_version: cli.api_version,
            credentials,
            request_timeout: call_timeout,
        };

        let email_provider = match cli.mail_transport {
            MailTransport::Console => EmailProviderConfig::Console,
            MailTransport::Smtp => {
                let credentials = match (non_blank(cli.smtp_user), non_blank(cli.smtp_pass)) {
                    (Some(user), Some(pass)) => Some((user, pass)),
                    (None, None) => None,
                    _ => {
                        return Err(AppError::Validation(
                            "--smtp-user and --smtp-pass must be given together".to_owned(),
                        ));
                    }
                };

                EmailProviderConfig::Smtp(SmtpEmailConfig {
                    host: cli.smtp_host,
                    port: cli.smtp_port,
                    security: cli.smtp_security.into(),
                    credentials,
                    from_address: cli.smtp_from,
                })
            }
        };

        Ok(Self {
            audit,
            directory,
            email_provider,
        })
    }
}

pub fn init_tracing(default_filter: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}
