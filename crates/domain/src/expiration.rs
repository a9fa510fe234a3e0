//! Password expiration evaluation.
//!
//! Remaining days are the floor of the remaining duration divided by one day,
//! so a partial day never rounds up: 2 days 23 hours is 2 days, and one
//! second past expiry is already -1.

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use ipa_notify_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: i64 = 86_400;

const GENERALIZED_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// Outcome of comparing an expiration timestamp against the notice threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpirationAssessment {
    /// Whether the owner must be told about the expiration.
    pub should_notify: bool,
    /// Whole days left before expiry, negative once expired.
    pub days_remaining: i64,
}

/// Decides whether an expiration is within `limit_days` of `now`.
///
/// There is no lower bound: already expired credentials keep notifying.
#[must_use]
pub fn evaluate_expiration(
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
    limit_days: i64,
) -> ExpirationAssessment {
    let days_remaining = whole_days_floor(expires_at - now);

    ExpirationAssessment {
        should_notify: days_remaining <= limit_days,
        days_remaining,
    }
}

fn whole_days_floor(delta: TimeDelta) -> i64 {
    let mut seconds = delta.num_seconds();
    if delta.subsec_nanos() < 0 {
        seconds -= 1;
    }

    seconds.div_euclid(SECONDS_PER_DAY)
}

/// Parses an LDAP generalized-time value in UTC (`YYYYMMDDHHMMSSZ`).
///
/// A fractional-seconds part (`YYYYMMDDHHMMSS.fffZ`) is accepted and
/// dropped. Offsets other than `Z` are rejected.
pub fn parse_generalized_time(value: &str) -> AppResult<DateTime<Utc>> {
    let trimmed = value.trim();
    let Some(without_zone) = trimmed.strip_suffix('Z') else {
        return Err(AppError::Validation(format!(
            "generalized time '{trimmed}' must be in UTC and end with 'Z'"
        )));
    };

    let whole_seconds = match without_zone.split_once(['.', ',']) {
        Some((whole, fraction))
            if !fraction.is_empty() && fraction.bytes().all(|byte| byte.is_ascii_digit()) =>
        {
            whole
        }
        Some(_) => {
            return Err(AppError::Validation(format!(
                "generalized time '{trimmed}' has an invalid fractional part"
            )));
        }
        None => without_zone,
    };

    if whole_seconds.len() != 14 {
        return Err(AppError::Validation(format!(
            "generalized time '{trimmed}' must have 14 date-time digits"
        )));
    }

    NaiveDateTime::parse_from_str(whole_seconds, GENERALIZED_TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|error| {
            AppError::Validation(format!("invalid generalized time '{trimmed}': {error}"))
        })
}
