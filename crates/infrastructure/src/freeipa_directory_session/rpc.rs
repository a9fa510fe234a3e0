//! FreeIPA JSON-RPC envelopes and attribute mapping.

use ipa_notify_core::AppError;
use ipa_notify_domain::{GroupInfo, UserRecord};
use reqwest::header::{HeaderMap, SET_COOKIE};
use serde::Deserialize;
use serde_json::{Map, Value, json};

pub(super) const SESSION_COOKIE_NAME: &str = "ipa_session";

/// `NotFound` in the FreeIPA error table.
const NOT_FOUND_ERROR_CODE: i64 = 4001;

/// Authentication errors occupy the 1000 block of the FreeIPA error table.
const AUTHENTICATION_ERROR_CODES: std::ops::RangeInclusive<i64> = 1000..=1999;

#[derive(Debug, Deserialize)]
pub(super) struct RpcResponse {
    #[serde(default)]
    pub result: Option<RpcResult>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RpcResult {
    #[serde(default)]
    pub result: Value,
}

#[derive(Debug, Deserialize)]
pub(super) struct RpcError {
    pub code: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub message: String,
}

pub(super) fn request_body(method: &str, arguments: &[&str], options: Map<String, Value>) -> Value {
    json!({
        "method": format!("{method}/1"),
        "params": [arguments, Value::Object(options)],
        "id": 0,
    })
}

/// Unwraps a response into the command result, `None` for a missing object.
pub(super) fn into_result(method: &str, response: RpcResponse) -> Result<Option<Value>, AppError> {
    if let Some(error) = response.error {
        let name = error.name.as_deref().unwrap_or("error");
        if error.code == NOT_FOUND_ERROR_CODE {
            return Ok(None);
        }

        if AUTHENTICATION_ERROR_CODES.contains(&error.code) {
            return Err(AppError::Unauthorized(format!(
                "{method} rejected the session ({name} {}): {}",
                error.code, error.message
            )));
        }

        return Err(AppError::Internal(format!(
            "{method} failed ({name} {}): {}",
            error.code, error.message
        )));
    }

    response
        .result
        .map(|result| Some(result.result))
        .ok_or_else(|| AppError::Internal(format!("{method} returned neither result nor error")))
}

pub(super) fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .map(str::trim)
        .find(|pair| {
            pair.strip_prefix(SESSION_COOKIE_NAME)
                .is_some_and(|rest| rest.starts_with('='))
        })
        .map(str::to_owned)
}

/// Normalizes a pre-issued session token to a `Cookie` header pair.
pub(super) fn cookie_pair(token: &str) -> String {
    let token = token.trim();
    if token.starts_with(&format!("{SESSION_COOKIE_NAME}=")) {
        token.to_owned()
    } else {
        format!("{SESSION_COOKIE_NAME}={token}")
    }
}

fn first_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Array(items) => items.first().and_then(first_string),
        Value::Object(object) => object.get("__datetime__").and_then(first_string),
        _ => None,
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(first_string).collect(),
        Some(other) => first_string(other).into_iter().collect(),
        None => Vec::new(),
    }
}

fn flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(text)) => text.eq_ignore_ascii_case("true"),
        Some(Value::Array(items)) => flag(items.first()),
        _ => false,
    }
}

pub(super) fn group_from_result(requested_name: &str, result: &Value) -> GroupInfo {
    let name = result
        .get("cn")
        .and_then(first_string)
        .unwrap_or_else(|| requested_name.to_owned());

    GroupInfo::new(name, string_list(result.get("member_user")))
}

pub(super) fn user_from_result(requested_id: &str, result: &Value) -> UserRecord {
    let id = result
        .get("uid")
        .and_then(first_string)
        .unwrap_or_else(|| requested_id.to_owned());

    UserRecord::new(
        id,
        string_list(result.get("mail")),
        result.get("krbpasswordexpiration").and_then(first_string),
        flag(result.get("nsaccountlock")),
    )
}
