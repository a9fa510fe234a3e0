//! Directory user and group snapshots.
//!
//! Both types are read-only projections of what the directory returned at
//! fetch time. Nothing here is cached across runs.

use ipa_notify_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Validated email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a validated email address.
    ///
    /// Performs basic structural validation: non-empty, contains exactly one `@`,
    /// local part and domain are non-empty, domain contains at least one `.`.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();

        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "email address must not be empty".to_owned(),
            ));
        }

        let Some((local, domain)) = trimmed.split_once('@') else {
            return Err(AppError::Validation(format!(
                "email address '{trimmed}' must contain exactly one '@'"
            )));
        };

        if domain.contains('@') {
            return Err(AppError::Validation(format!(
                "email address '{trimmed}' must contain exactly one '@'"
            )));
        }

        if local.is_empty() {
            return Err(AppError::Validation(
                "email local part must not be empty".to_owned(),
            ));
        }

        if domain.is_empty() || !domain.contains('.') {
            return Err(AppError::Validation(
                "email domain must contain at least one '.'".to_owned(),
            ));
        }

        if trimmed.len() > 254 {
            return Err(AppError::Validation(
                "email address must not exceed 254 characters".to_owned(),
            ));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the validated email string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Group membership snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    name: String,
    member_user_ids: Vec<String>,
}

impl GroupInfo {
    /// Creates a group snapshot with members in directory order.
    #[must_use]
    pub fn new(name: impl Into<String>, member_user_ids: Vec<String>) -> Self {
        Self {
            name: name.into(),
            member_user_ids,
        }
    }

    /// Returns the group name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns direct member user identifiers in directory order.
    #[must_use]
    pub fn member_user_ids(&self) -> &[String] {
        self.member_user_ids.as_slice()
    }
}

/// User snapshot carrying the attributes the audit needs.
///
/// `password_expires_at` keeps the raw generalized-time value so a malformed
/// timestamp stays a per-user concern instead of failing the fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    id: String,
    mail_addresses: Vec<String>,
    password_expires_at: Option<String>,
    locked: bool,
}

impl UserRecord {
    /// Creates a user snapshot.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        mail_addresses: Vec<String>,
        password_expires_at: Option<String>,
        locked: bool,
    ) -> Self {
        Self {
            id: id.into(),
            mail_addresses,
            password_expires_at,
            locked,
        }
    }

    /// Returns the user identifier (login name).
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns every mail address in directory order.
    #[must_use]
    pub fn mail_addresses(&self) -> &[String] {
        self.mail_addresses.as_slice()
    }

    /// Returns the canonical (first) mail address, if a non-blank one exists.
    #[must_use]
    pub fn canonical_email(&self) -> Option<&str> {
        self.mail_addresses
            .first()
            .map(|address| address.trim())
            .filter(|address| !address.is_empty())
    }

    /// Returns the raw password expiration value.
    #[must_use]
    pub fn password_expires_at(&self) -> Option<&str> {
        self.password_expires_at.as_deref()
    }

    /// Returns whether the account is locked.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }
}
