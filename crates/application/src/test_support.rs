use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use tokio::sync::Mutex;

use ipa_notify_core::{AppError, AppResult};
use ipa_notify_domain::{GroupInfo, UserRecord};

use crate::{DirectorySession, EmailService};

pub(crate) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
        .single()
        .unwrap_or_else(|| panic!("valid timestamp"))
}

pub(crate) fn generalized_time_in_days(days: i64) -> String {
    (now() + TimeDelta::days(days))
        .format("%Y%m%d%H%M%SZ")
        .to_string()
}

pub(crate) fn user_expiring_in(user_id: &str, days: i64, locked: bool) -> UserRecord {
    UserRecord::new(
        user_id,
        vec![format!("{user_id}@domain.com")],
        Some(generalized_time_in_days(days)),
        locked,
    )
}

#[derive(Default)]
pub(crate) struct FakeDirectorySession {
    pub groups: HashMap<String, GroupInfo>,
    pub users: HashMap<String, UserRecord>,
    pub reject_authentication: bool,
    pub failing_groups: HashSet<String>,
    pub unauthorized_groups: HashSet<String>,
    pub failing_users: HashSet<String>,
    pub failing_first_user_lookup: HashSet<String>,
    pub unauthorized_users: HashSet<String>,
    pub hanging_authentication: bool,
    pub hanging_groups: HashSet<String>,
    pub hanging_users: HashSet<String>,
    pub user_delays: HashMap<String, Duration>,
    pub calls: Mutex<Vec<String>>,
    pub completed_user_lookups: Mutex<Vec<String>>,
}

impl FakeDirectorySession {
    pub(crate) fn with_group(mut self, group_name: &str, members: &[&str]) -> Self {
        self.groups.insert(
            group_name.to_owned(),
            GroupInfo::new(
                group_name,
                members.iter().map(|member| (*member).to_owned()).collect(),
            ),
        );
        self
    }

    pub(crate) fn with_user(mut self, user: UserRecord) -> Self {
        self.users.insert(user.id().to_owned(), user);
        self
    }

    pub(crate) async fn recorded_calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    pub(crate) async fn completion_order(&self) -> Vec<String> {
        self.completed_user_lookups.lock().await.clone()
    }
}

#[async_trait]
impl DirectorySession for FakeDirectorySession {
    async fn authenticate(&self) -> AppResult<()> {
        self.calls.lock().await.push("authenticate".to_owned());
        if self.hanging_authentication {
            std::future::pending::<()>().await;
        }
        if self.reject_authentication {
            return Err(AppError::Unauthorized("login denied".to_owned()));
        }

        Ok(())
    }

    async fn find_group(&self, group_name: &str) -> AppResult<Option<GroupInfo>> {
        self.calls.lock().await.push(format!("group:{group_name}"));
        if self.hanging_groups.contains(group_name) {
            std::future::pending::<()>().await;
        }
        if self.unauthorized_groups.contains(group_name) {
            return Err(AppError::Unauthorized("session expired".to_owned()));
        }
        if self.failing_groups.contains(group_name) {
            return Err(AppError::Internal("directory unavailable".to_owned()));
        }

        Ok(self.groups.get(group_name).cloned())
    }

    async fn find_user(&self, user_id: &str) -> AppResult<Option<UserRecord>> {
        let attempt = {
            let mut calls = self.calls.lock().await;
            calls.push(format!("user:{user_id}"));
            calls
                .iter()
                .filter(|call| call.strip_prefix("user:") == Some(user_id))
                .count()
        };
        if self.hanging_users.contains(user_id) {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = self.user_delays.get(user_id) {
            tokio::time::sleep(*delay).await;
        }
        self.completed_user_lookups
            .lock()
            .await
            .push(user_id.to_owned());
        if self.unauthorized_users.contains(user_id) {
            return Err(AppError::Unauthorized("session expired".to_owned()));
        }
        if self.failing_users.contains(user_id)
            || (attempt == 1 && self.failing_first_user_lookup.contains(user_id))
        {
            return Err(AppError::Internal("directory unavailable".to_owned()));
        }

        Ok(self.users.get(user_id).cloned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Default)]
pub(crate) struct FakeEmailService {
    pub failing_recipients: HashSet<String>,
    pub hanging_recipients: HashSet<String>,
    pub attempts: Mutex<Vec<SentEmail>>,
}

impl FakeEmailService {
    pub(crate) fn failing_for(recipients: &[&str]) -> Self {
        Self {
            failing_recipients: recipients
                .iter()
                .map(|recipient| (*recipient).to_owned())
                .collect(),
            ..Self::default()
        }
    }

    pub(crate) fn hanging_for(recipients: &[&str]) -> Self {
        Self {
            hanging_recipients: recipients
                .iter()
                .map(|recipient| (*recipient).to_owned())
                .collect(),
            ..Self::default()
        }
    }

    pub(crate) async fn recorded_attempts(&self) -> Vec<SentEmail> {
        self.attempts.lock().await.clone()
    }
}

#[async_trait]
impl EmailService for FakeEmailService {
    async fn send_email(&self, to: &str, subject: &str, text_body: &str) -> AppResult<()> {
        self.attempts.lock().await.push(SentEmail {
            to: to.to_owned(),
            subject: subject.to_owned(),
            body: text_body.to_owned(),
        });

        if self.hanging_recipients.contains(to) {
            std::future::pending::<()>().await;
        }
        if self.failing_recipients.contains(to) {
            return Err(AppError::Delivery(format!("mailbox {to} unavailable")));
        }

        Ok(())
    }
}
