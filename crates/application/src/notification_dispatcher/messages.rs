use ipa_notify_domain::{ExpirationNotice, LockedUserRecord};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Fully rendered message ready for the email port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct OutgoingMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

fn days(count: i64) -> String {
    if count.abs() == 1 {
        format!("{count} day")
    } else {
        format!("{count} days")
    }
}

pub(super) fn expiration_message(notice: &ExpirationNotice) -> OutgoingMessage {
    let (subject, when) = match notice.days_remaining {
        remaining if remaining > 0 => (
            format!("Your password expires in {}", days(remaining)),
            format!("in {}", days(remaining)),
        ),
        0 => (
            "Your password expires today".to_owned(),
            "today".to_owned(),
        ),
        remaining => (
            "Your password has expired".to_owned(),
            format!("{} ago", days(-remaining)),
        ),
    };

    let body = format!(
        "Hello {user_id},\n\n\
         The password for account '{user_id}' expires on {expires_at} ({when}).\n\
         Please change it to keep access to your account.\n",
        user_id = notice.user_id,
        expires_at = notice.expires_at.format(TIMESTAMP_FORMAT),
    );

    OutgoingMessage {
        to: notice.email.clone(),
        subject,
        body,
    }
}

pub(super) fn locked_users_digest(
    admin_email: &str,
    locked_users: &[LockedUserRecord],
) -> OutgoingMessage {
    let subject = if locked_users.len() == 1 {
        "1 locked user account".to_owned()
    } else {
        format!("{} locked user accounts", locked_users.len())
    };

    let mut body = String::from("The following user accounts are locked:\n\n");
    for record in locked_users {
        match record.email.as_deref() {
            Some(email) => body.push_str(&format!("- {} <{email}>\n", record.user_id)),
            None => body.push_str(&format!("- {}\n", record.user_id)),
        }
    }

    OutgoingMessage {
        to: admin_email.to_owned(),
        subject,
        body,
    }
}
