//! Client configuration.
//!
//! One `ClientConfig` is built at startup and handed to `FlippedClient` and
//! the transport. Route paths live here because they differ between
//! deployments of the server.

use serde::Deserialize;
use thiserror::Error;

use crate::validate::PasswordPolicy;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is not a valid number: {value}")]
    InvalidNumber { name: &'static str, value: String },
}

/// Paths of every route the client calls. `{user_id}` in `profile` is
/// replaced per request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Routes {
    pub register: String,
    pub login: String,
    pub upload: String,
    pub profile: String,
    pub feed: String,
    pub collect: String,
    pub me: String,
    pub save_profile: String,
    pub friends: String,
    pub favorites: String,
}

impl Default for Routes {
    fn default() -> Self {
        Self {
            register: "/register".to_string(),
            login: "/login".to_string(),
            upload: "/upload".to_string(),
            profile: "/profile/{user_id}".to_string(),
            feed: "/feed".to_string(),
            collect: "/collect".to_string(),
            me: "/me".to_string(),
            save_profile: "/profile".to_string(),
            friends: "/friends".to_string(),
            favorites: "/favorites".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    /// Sent with every request before any per-call header.
    pub default_headers: Vec<(String, String)>,
    /// Whole-exchange timeout applied by the transport. `None` keeps the
    /// transport default.
    pub timeout_secs: Option<u64>,
    /// Header carrying the session token on authenticated calls.
    pub token_header: String,
    pub routes: Routes,
    pub password_policy: PasswordPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8081".to_string(),
            default_headers: vec![("accept".to_string(), "application/json".to_string())],
            timeout_secs: None,
            token_header: "token".to_string(),
            routes: Routes::default(),
            password_policy: PasswordPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self::default().with_base_url(base_url)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Defaults overridden by `FLIPPED_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(url) = lookup("FLIPPED_BASE_URL") {
            config = config.with_base_url(&url);
        }
        if let Some(raw) = lookup("FLIPPED_TIMEOUT_SECS") {
            config.timeout_secs = Some(parse_number("FLIPPED_TIMEOUT_SECS", &raw)?);
        }
        if let Some(header) = lookup("FLIPPED_TOKEN_HEADER") {
            config.token_header = header;
        }
        if let Some(raw) = lookup("FLIPPED_PASSWORD_MIN_LENGTH") {
            config.password_policy.min_length = parse_number("FLIPPED_PASSWORD_MIN_LENGTH", &raw)?;
        }
        Ok(config)
    }
}

fn parse_number<N: std::str::FromStr>(name: &'static str, raw: &str) -> Result<N, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        name,
        value: raw.to_string(),
    })
}
