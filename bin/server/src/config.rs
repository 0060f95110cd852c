//! Centralized server configuration.
//!
//! Loaded via the `config` crate from environment variables, with `__` as
//! the nesting separator (e.g. `API__BASE_URL`, `LOGIN__EMAIL_VERIFICATION`).

use authflow_session::SESSIONS_COOKIE;
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Path prefix the login application is served under, e.g. `/ui/v2/login`.
    #[serde(default)]
    pub base_path: String,

    /// Externally visible origin of the login application.
    pub public_url: String,

    /// Platform API configuration.
    pub api: ApiConfig,

    /// Login behaviour.
    #[serde(default)]
    pub login: LoginConfig,

    /// Cookie names.
    #[serde(default)]
    pub cookies: CookieConfig,
}

/// Platform API client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the platform, e.g. `https://acme.zitadel.cloud`.
    pub base_url: String,

    /// Token of the service user the login application acts as.
    pub service_token: String,

    /// Per-request timeout, in seconds.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

impl ApiConfig {
    /// Returns the per-request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Login behaviour configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginConfig {
    /// Reject sessions of users who have not verified their email.
    #[serde(default)]
    pub email_verification: bool,
}

/// Cookie configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CookieConfig {
    /// Name of the cookie holding the browser's sessions.
    #[serde(default = "default_sessions_cookie")]
    pub sessions_cookie: String,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            sessions_cookie: default_sessions_cookie(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_request_timeout_seconds() -> u64 {
    10
}

fn default_sessions_cookie() -> String {
    SESSIONS_COOKIE.to_string()
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Returns the base path without a trailing slash.
    #[must_use]
    pub fn base_path(&self) -> &str {
        self.base_path.trim_end_matches('/')
    }

    /// Returns the public URL of the login application, including the base
    /// path.
    #[must_use]
    pub fn public_login_url(&self) -> String {
        format!("{}{}", self.public_url.trim_end_matches('/'), self.base_path())
    }
}
