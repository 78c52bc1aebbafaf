//! Credentials and hosts loaded from the process environment.
//!
//! | Variable | Meaning |
//! |---|---|
//! | `RIDESHARE_SERVER_TOKEN` | static server token |
//! | `RIDESHARE_USER_TOKEN` | OAuth user access token |
//! | `RIDESHARE_CLIENT_ID` / `RIDESHARE_CLIENT_SECRET` | OAuth application credentials |
//! | `RIDESHARE_BASE_URL` | API host, defaults to production |
//! | `RIDESHARE_AUTH_URL` | login host, defaults to `https://login.uber.com` |
//!
//! Blank values count as unset.

use std::fmt;

use crate::client::{RideshareClient, PRODUCTION_BASE_URL};
use crate::error::ApiError;
use crate::oauth::{OAuthClient, DEFAULT_AUTH_URL};
use crate::types::AccessTokenKind;

#[derive(Clone, Default)]
pub struct ClientConfig {
    pub server_token: Option<String>,
    pub user_token: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub base_url: Option<String>,
    pub auth_url: Option<String>,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup, e.g. a map in tests.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Self {
            server_token: get("RIDESHARE_SERVER_TOKEN"),
            user_token: get("RIDESHARE_USER_TOKEN"),
            client_id: get("RIDESHARE_CLIENT_ID"),
            client_secret: get("RIDESHARE_CLIENT_SECRET"),
            base_url: get("RIDESHARE_BASE_URL"),
            auth_url: get("RIDESHARE_AUTH_URL"),
        }
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(PRODUCTION_BASE_URL)
    }

    pub fn auth_url(&self) -> &str {
        self.auth_url.as_deref().unwrap_or(DEFAULT_AUTH_URL)
    }

    pub fn server_client(&self) -> Result<RideshareClient, ApiError> {
        let token = self.server_token.as_deref().unwrap_or_default();
        RideshareClient::new(AccessTokenKind::Server, token, self.base_url())
    }

    pub fn user_client(&self) -> Result<RideshareClient, ApiError> {
        let token = self.user_token.as_deref().unwrap_or_default();
        RideshareClient::new(AccessTokenKind::User, token, self.base_url())
    }

    pub fn oauth_client(&self) -> Result<OAuthClient, ApiError> {
        let client = OAuthClient::new(
            self.client_id.as_deref().unwrap_or_default(),
            self.client_secret.as_deref().unwrap_or_default(),
        )?;
        client.with_auth_host(self.auth_url())
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("server_token", &self.server_token.as_ref().map(|_| "<redacted>"))
            .field("user_token", &self.user_token.as_ref().map(|_| "<redacted>"))
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("auth_url", &self.auth_url)
            .finish()
    }
}
