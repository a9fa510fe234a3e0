//! Password expiration and lockout notifier for FreeIPA.

#![forbid(unsafe_code)]

mod notifier_config;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use ipa_notify_application::{AuditRunner, EmailService};
use ipa_notify_core::AppResult;
use ipa_notify_infrastructure::{ConsoleEmailService, FreeIpaDirectorySession, SmtpEmailService};
use tracing::{error, info};

use crate::notifier_config::{Cli, EmailProviderConfig, NotifierConfig, init_tracing};

/// Exit status when the configuration is rejected before any directory call.
const CONFIGURATION_EXIT_CODE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_str());

    let runner = match build_runner(cli) {
        Ok(runner) => runner,
        Err(failure) => {
            error!(error = %failure, "invalid configuration");
            return ExitCode::from(CONFIGURATION_EXIT_CODE);
        }
    };

    let outcome = runner.run().await;
    if let Some(failure) = &outcome.abort_error {
        error!(state = outcome.state.as_str(), error = %failure, "audit run aborted");
    }

    ExitCode::from(outcome.exit_code())
}

fn build_runner(cli: Cli) -> AppResult<AuditRunner> {
    let config = NotifierConfig::from_cli(cli)?;

    info!(
        server = %config.directory.server,
        groups = config.audit.groups().len(),
        limit_days = config.audit.limit_days(),
        mode = config.audit.mode().as_str(),
        "ipa-notify started"
    );

    let directory = Arc::new(FreeIpaDirectorySession::new(config.directory)?);
    let email_service = build_email_service(config.email_provider)?;

    Ok(AuditRunner::new(config.audit, directory, email_service))
}

fn build_email_service(provider: EmailProviderConfig) -> AppResult<Arc<dyn EmailService>> {
    match provider {
        EmailProviderConfig::Console => Ok(Arc::new(ConsoleEmailService)),
        EmailProviderConfig::Smtp(smtp) => Ok(Arc::new(SmtpEmailService::new(smtp)?)),
    }
}
