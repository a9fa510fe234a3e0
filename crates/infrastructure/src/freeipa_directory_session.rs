//! FreeIPA directory session over the JSON-RPC API.

use std::time::Duration;

use async_trait::async_trait;
use ipa_notify_application::DirectorySession;
use ipa_notify_core::{AppError, AppResult};
use ipa_notify_domain::{GroupInfo, UserRecord};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE, COOKIE, REFERER};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, info};

mod rpc;

use rpc::RpcResponse;

/// How the session proves its identity to the directory.
#[derive(Clone)]
pub enum FreeIpaCredentials {
    /// Password login for a principal.
    Password {
        /// Kerberos principal or user name.
        principal: String,
        /// Password for the principal.
        password: String,
    },
    /// Pre-issued `ipa_session` cookie value.
    SessionToken(String),
}

impl std::fmt::Debug for FreeIpaCredentials {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Password { principal, .. } => formatter
                .debug_struct("Password")
                .field("principal", principal)
                .field("password", &"<redacted>")
                .finish(),
            Self::SessionToken(_) => formatter
                .debug_tuple("SessionToken")
                .field(&"<redacted>")
                .finish(),
        }
    }
}

/// FreeIPA connection settings.
#[derive(Debug, Clone)]
pub struct FreeIpaConfig {
    /// Server FQDN such as `ipa.domain.com`, or a base URL with an explicit scheme.
    pub server: String,
    /// Verify the server TLS certificate.
    pub verify_tls: bool,
    /// JSON-RPC API version sent with every command.
    pub api_version: String,
    /// Login credentials.
    pub credentials: FreeIpaCredentials,
    /// HTTP request timeout.
    pub request_timeout: Duration,
}

/// Directory session backed by a FreeIPA server.
pub struct FreeIpaDirectorySession {
    http_client: reqwest::Client,
    config: FreeIpaConfig,
    session_cookie: RwLock<Option<String>>,
}

impl FreeIpaDirectorySession {
    /// Creates an unauthenticated session.
    pub fn new(config: FreeIpaConfig) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

        Ok(Self {
            http_client,
            config,
            session_cookie: RwLock::new(None),
        })
    }

    fn base_url(&self) -> String {
        let server = self.config.server.trim().trim_end_matches('/');
        if server.contains("://") {
            format!("{server}/ipa")
        } else {
            format!("https://{server}/ipa")
        }
    }

    async fn login_password(&self, principal: &str, password: &str) -> AppResult<String> {
        let form = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("user", principal)
            .append_pair("password", password)
            .finish();

        let response = self
            .http_client
            .post(format!("{}/session/login_password", self.base_url()))
            .header(REFERER, self.base_url())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(ACCEPT, "text/plain")
            .body(form)
            .send()
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to call login endpoint: {error}"))
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(AppError::Unauthorized(format!(
                "login denied for principal '{principal}'"
            )));
        }

        if !status.is_success() {
            return Err(AppError::Unauthorized(format!(
                "login endpoint returned status {}",
                status.as_u16()
            )));
        }

        rpc::session_cookie(response.headers()).ok_or_else(|| {
            AppError::Unauthorized("login succeeded without an ipa_session cookie".to_owned())
        })
    }

    async fn call(
        &self,
        method: &str,
        arguments: &[&str],
        mut options: Map<String, Value>,
    ) -> AppResult<Option<Value>> {
        let cookie = self
            .session_cookie
            .read()
            .await
            .clone()
            .ok_or_else(|| {
                AppError::Unauthorized("directory session is not authenticated".to_owned())
            })?;

        options.insert(
            "version".to_owned(),
            Value::String(self.config.api_version.clone()),
        );

        let response = self
            .http_client
            .post(format!("{}/session/json", self.base_url()))
            .header(REFERER, self.base_url())
            .header(ACCEPT, "application/json")
            .header(COOKIE, cookie)
            .json(&rpc::request_body(method, arguments, options))
            .send()
            .await
            .map_err(|error| AppError::Internal(format!("failed to call {method}: {error}")))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(AppError::Unauthorized(format!(
                "{method} rejected the session with status 401"
            )));
        }

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_owned());
            return Err(AppError::Internal(format!(
                "{method} returned status {}: {body}",
                status.as_u16()
            )));
        }

        let response_body = response.json::<RpcResponse>().await.map_err(|error| {
            AppError::Internal(format!("failed to parse {method} response body: {error}"))
        })?;

        rpc::into_result(method, response_body)
    }
}

#[async_trait]
impl DirectorySession for FreeIpaDirectorySession {
    async fn authenticate(&self) -> AppResult<()> {
        let cookie = match &self.config.credentials {
            FreeIpaCredentials::Password {
                principal,
                password,
            } => self.login_password(principal, password).await?,
            FreeIpaCredentials::SessionToken(token) => rpc::cookie_pair(token),
        };
        *self.session_cookie.write().await = Some(cookie);

        self.call("ping", &[], Map::new()).await?;
        info!(server = %self.config.server, "directory session established");

        Ok(())
    }

    async fn find_group(&self, group_name: &str) -> AppResult<Option<GroupInfo>> {
        debug!(group = %group_name, "group_show");
        let result = self.call("group_show", &[group_name], Map::new()).await?;

        Ok(result.map(|value| rpc::group_from_result(group_name, &value)))
    }

    async fn find_user(&self, user_id: &str) -> AppResult<Option<UserRecord>> {
        debug!(user_id = %user_id, "user_show");
        let mut options = Map::new();
        options.insert("all".to_owned(), Value::Bool(true));
        let result = self.call("user_show", &[user_id], options).await?;

        Ok(result.map(|value| rpc::user_from_result(user_id, &value)))
    }
}
