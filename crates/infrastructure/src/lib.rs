//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod console_email_service;
mod freeipa_directory_session;
mod smtp_email_service;

pub use console_email_service::ConsoleEmailService;
pub use freeipa_directory_session::{FreeIpaConfig, FreeIpaCredentials, FreeIpaDirectorySession};
pub use smtp_email_service::{SmtpEmailConfig, SmtpEmailService, SmtpSecurity};
