//! OAuth2 authorization-code flow against the rideshare login host.
//!
//! # Design
//! `OAuthClient` holds only the application credentials, the login host and
//! a transport; it shares nothing with `RideshareClient`. Token lifecycle:
//!
//! ```text
//! unauthorized --authorize_url + exchange_code--> exchanged
//! exchanged --refresh_token--> exchanged
//! exchanged --revoke_token--> unauthorized
//! ```
//!
//! Failures are binary from the caller's point of view: a rejected exchange
//! or refresh yields `None`, a rejected revoke yields `false`. Transport
//! failures still propagate as `ApiError`.

use std::fmt;

use serde::Serialize;
use url::form_urlencoded;

use crate::client::{non_blank, require};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};
use crate::types::AccessToken;

pub const DEFAULT_AUTH_URL: &str = "https://login.uber.com";

const AUTHORIZE_PATH: &str = "/oauth/authorize";
const TOKEN_PATH: &str = "/oauth/token";
const REVOKE_PATH: &str = "/oauth/revoke";

#[derive(Serialize)]
struct TokenForm<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    grant_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<&'a str>,
    redirect_uri: &'a str,
}

#[derive(Serialize)]
struct RevokeForm<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    token: &'a str,
}

#[derive(Clone)]
pub struct OAuthClient<T = UreqTransport> {
    client_id: String,
    client_secret: String,
    auth_url: String,
    transport: T,
}

impl OAuthClient<UreqTransport> {
    /// Fails with `ApiError::MissingParameter` when either credential is blank.
    pub fn new(client_id: &str, client_secret: &str) -> Result<Self, ApiError> {
        Self::with_transport(client_id, client_secret, UreqTransport::new())
    }
}

impl<T: Transport> OAuthClient<T> {
    pub fn with_transport(client_id: &str, client_secret: &str, transport: T) -> Result<Self, ApiError> {
        let client_id = require(client_id, "client_id")?;
        let client_secret = require(client_secret, "client_secret")?;
        Ok(Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            transport,
        })
    }

    /// Points the client at another login host (sandbox, local fake).
    ///
    /// Fails with `ApiError::MissingParameter` when `auth_url` is blank.
    pub fn with_auth_host(mut self, auth_url: &str) -> Result<Self, ApiError> {
        let auth_url = require(auth_url, "auth_url")?;
        self.auth_url = auth_url.trim_end_matches('/').to_string();
        Ok(self)
    }

    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }

    /// URL the resource owner visits to grant access.
    ///
    /// Parameters appear in a fixed order: `response_type`, `client_id`,
    /// then `scope`, `state` and `redirect_uri` when present. Scopes are
    /// space-joined; only the redirect URI is percent-encoded.
    pub fn authorize_url(&self, scopes: &[&str], state: Option<&str>, redirect_uri: Option<&str>) -> String {
        let mut url = format!(
            "{}{AUTHORIZE_PATH}?response_type=code&client_id={}",
            self.auth_url, self.client_id
        );

        let scopes: Vec<&str> = scopes.iter().copied().filter(|s| !s.trim().is_empty()).collect();
        if !scopes.is_empty() {
            url.push_str("&scope=");
            url.push_str(&scopes.join(" "));
        }
        if let Some(state) = non_blank(state) {
            url.push_str("&state=");
            url.push_str(state);
        }
        if let Some(redirect_uri) = non_blank(redirect_uri) {
            url.push_str("&redirect_uri=");
            url.extend(form_urlencoded::byte_serialize(redirect_uri.as_bytes()));
        }
        url
    }

    pub fn build_exchange_code(&self, code: &str, redirect_uri: &str) -> Result<HttpRequest, ApiError> {
        self.token_request(&TokenForm {
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            grant_type: "authorization_code",
            code: Some(code),
            refresh_token: None,
            redirect_uri,
        })
    }

    pub fn build_refresh_token(&self, refresh_token: &str, redirect_uri: &str) -> Result<HttpRequest, ApiError> {
        self.token_request(&TokenForm {
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            grant_type: "refresh_token",
            code: None,
            refresh_token: Some(refresh_token),
            redirect_uri,
        })
    }

    pub fn build_revoke_token(&self, token: &str) -> Result<HttpRequest, ApiError> {
        let form = RevokeForm {
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            token,
        };
        self.form_request(REVOKE_PATH, &form)
    }

    /// Exchanges an authorization code for a token; `None` if rejected.
    pub fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<Option<AccessToken>, ApiError> {
        let request = self.build_exchange_code(code, redirect_uri)?;
        self.authorize(&request)
    }

    /// Trades a refresh token for a new access token; `None` if rejected.
    pub fn refresh_token(&self, refresh_token: &str, redirect_uri: &str) -> Result<Option<AccessToken>, ApiError> {
        let request = self.build_refresh_token(refresh_token, redirect_uri)?;
        self.authorize(&request)
    }

    /// Revokes a token. Returns whether the login host accepted it.
    pub fn revoke_token(&self, token: &str) -> Result<bool, ApiError> {
        let request = self.build_revoke_token(token)?;
        let response = self.post(&request)?;
        Ok(response.is_success())
    }

    fn token_request(&self, form: &TokenForm<'_>) -> Result<HttpRequest, ApiError> {
        self.form_request(TOKEN_PATH, form)
    }

    fn form_request<F: Serialize>(&self, path: &str, form: &F) -> Result<HttpRequest, ApiError> {
        let body = serde_urlencoded::to_string(form).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: format!("{}{path}", self.auth_url),
            headers: vec![
                (
                    "content-type".to_string(),
                    "application/x-www-form-urlencoded".to_string(),
                ),
                ("accept".to_string(), "application/json".to_string()),
            ],
            body: Some(body),
        })
    }

    fn authorize(&self, request: &HttpRequest) -> Result<Option<AccessToken>, ApiError> {
        let response = self.post(request)?;
        if !response.is_success() {
            return Ok(None);
        }
        serde_json::from_str(&response.body)
            .map(Some)
            .map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    fn post(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        tracing::debug!(url = %request.url, "sending oauth request");
        let response = self.transport.execute(request)?;
        if !response.is_success() {
            tracing::warn!(status = response.status, url = %request.url, "oauth request rejected");
        }
        Ok(response)
    }
}

impl<T> fmt::Debug for OAuthClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthClient")
            .field("client_id", &self.client_id)
            .field("auth_url", &self.auth_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedTransport(u16, &'static str);

    impl Transport for FixedTransport {
        fn execute(&self, _request: &HttpRequest) -> Result<HttpResponse, ApiError> {
            Ok(HttpResponse {
                status: self.0,
                headers: Vec::new(),
                body: self.1.to_string(),
            })
        }
    }

    fn client() -> OAuthClient {
        OAuthClient::new("my-client", "my-secret").unwrap()
    }

    fn fixed(status: u16, body: &'static str) -> OAuthClient<FixedTransport> {
        OAuthClient::with_transport("my-client", "my-secret", FixedTransport(status, body)).unwrap()
    }

    #[test]
    fn blank_credentials_are_rejected() {
        assert!(matches!(
            OAuthClient::new("", "secret").unwrap_err(),
            ApiError::MissingParameter("client_id")
        ));
        assert!(matches!(
            OAuthClient::new("id", " ").unwrap_err(),
            ApiError::MissingParameter("client_secret")
        ));
    }

    #[test]
    fn authorize_url_minimal() {
        assert_eq!(
            client().authorize_url(&[], None, None),
            "https://login.uber.com/oauth/authorize?response_type=code&client_id=my-client"
        );
    }

    #[test]
    fn authorize_url_full_is_ordered() {
        let url = client().authorize_url(
            &["profile", "history"],
            Some("xyz"),
            Some("https://example.com/callback?x=1"),
        );
        assert_eq!(
            url,
            "https://login.uber.com/oauth/authorize?response_type=code&client_id=my-client\
             &scope=profile history&state=xyz\
             &redirect_uri=https%3A%2F%2Fexample.com%2Fcallback%3Fx%3D1"
        );
    }

    #[test]
    fn authorize_url_skips_blank_parts() {
        let url = client().authorize_url(&[" "], Some(""), Some("   "));
        assert_eq!(
            url,
            "https://login.uber.com/oauth/authorize?response_type=code&client_id=my-client"
        );
        let url = client().authorize_url(&[], None, Some("https://a.b/c"));
        assert!(url.ends_with("&client_id=my-client&redirect_uri=https%3A%2F%2Fa.b%2Fc"));
    }

    #[test]
    fn authorize_url_is_deterministic() {
        let c = client();
        let first = c.authorize_url(&["request"], Some("s"), Some("https://x.y/"));
        let second = c.authorize_url(&["request"], Some("s"), Some("https://x.y/"));
        assert_eq!(first, second);
    }

    #[test]
    fn auth_host_override_strips_trailing_slash() {
        let c = client().with_auth_host("http://127.0.0.1:4000/").unwrap();
        assert_eq!(c.auth_url(), "http://127.0.0.1:4000");
        assert!(c.authorize_url(&[], None, None).starts_with("http://127.0.0.1:4000/oauth/authorize?"));
    }

    #[test]
    fn blank_auth_host_is_rejected() {
        for host in ["", "   "] {
            assert!(matches!(
                client().with_auth_host(host).unwrap_err(),
                ApiError::MissingParameter("auth_url")
            ));
        }
    }

    #[test]
    fn exchange_form_has_expected_fields() {
        let req = client().build_exchange_code("the-code", "https://a.b/cb").unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "https://login.uber.com/oauth/token");
        assert_eq!(req.header("content-type"), Some("application/x-www-form-urlencoded"));
        assert_eq!(
            req.body.as_deref(),
            Some(
                "client_id=my-client&client_secret=my-secret&grant_type=authorization_code\
                 &code=the-code&redirect_uri=https%3A%2F%2Fa.b%2Fcb"
            )
        );
    }

    #[test]
    fn refresh_form_replaces_code() {
        let req = client().build_refresh_token("r-1", "https://a.b/cb").unwrap();
        let body = req.body.unwrap();
        assert!(body.contains("grant_type=refresh_token&refresh_token=r-1"));
        assert!(!body.contains("code="));
    }

    #[test]
    fn revoke_form_posts_token() {
        let req = client().build_revoke_token("tok").unwrap();
        assert_eq!(req.url, "https://login.uber.com/oauth/revoke");
        assert_eq!(
            req.body.as_deref(),
            Some("client_id=my-client&client_secret=my-secret&token=tok")
        );
    }

    #[test]
    fn rejected_exchange_is_none() {
        let c = fixed(401, r#"{"error":"invalid_grant"}"#);
        assert_eq!(c.exchange_code("INVALID", "https://a.b").unwrap(), None);
    }

    #[test]
    fn accepted_exchange_decodes_token() {
        let c = fixed(
            200,
            r#"{"access_token":"t","token_type":"Bearer","expires_in":10,"refresh_token":"r","scope":"profile"}"#,
        );
        let token = c.exchange_code("ok", "https://a.b").unwrap().unwrap();
        assert_eq!(token.value, "t");
        assert_eq!(token.refresh_token, "r");
    }

    #[test]
    fn accepted_exchange_with_bad_body_is_an_error() {
        let c = fixed(200, "nope");
        assert!(matches!(
            c.refresh_token("r", "https://a.b").unwrap_err(),
            ApiError::Deserialization(_)
        ));
    }

    #[test]
    fn revoke_reports_status() {
        assert!(fixed(200, "").revoke_token("t").unwrap());
        assert!(!fixed(401, "").revoke_token("t").unwrap());
    }

    #[test]
    fn debug_output_hides_secret() {
        assert!(!format!("{:?}", client()).contains("my-secret"));
    }
}
