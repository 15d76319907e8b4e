/// Google sign-in (OAuth 2.0 authorization-code flow)
///
/// ```text
/// GET /login/oauth            -> 303 to Google, state stored in a cookie
/// GET /login/google/callback  -> state checked, code exchanged, userinfo read
/// ```
///
/// The provider sits behind [`IdentityProvider`] so router tests can stand
/// in a fake that never leaves the process.

use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use taskmate_shared::account::OAuthIdentity;
use thiserror::Error;

use crate::config::GoogleConfig;

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Cookie holding the anti-forgery state between redirect and callback
pub const STATE_COOKIE: &str = "oauth_state";

const STATE_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("failed to build http client: {0}")]
    Client(String),

    #[error("google token exchange failed: {0}")]
    Exchange(String),

    #[error("google userinfo failed: {0}")]
    UserInfo(String),

    #[error("google account email is not verified")]
    UnverifiedEmail,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL the browser is sent to, carrying `state`
    fn authorization_url(&self, state: &str) -> String;

    /// Exchanges an authorization code for the user's identity
    async fn identify(&self, code: &str) -> Result<OAuthIdentity, OAuthError>;
}

/// Random anti-forgery state value
pub fn generate_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_LEN)
        .map(char::from)
        .collect()
}

/// `Set-Cookie` value storing `state` for the callback
pub fn state_cookie(state: &str) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/login; Max-Age=600",
        STATE_COOKIE, state
    )
}

/// Reads the state cookie out of a `Cookie` header value
pub fn state_from_cookie_header(header: &str) -> Option<&str> {
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == STATE_COOKIE).then_some(value)
    })
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    email: String,
    #[serde(default)]
    email_verified: bool,
    given_name: Option<String>,
    family_name: Option<String>,
}

pub struct GoogleProvider {
    client: reqwest::Client,
    config: GoogleConfig,
}

impl GoogleProvider {
    pub fn new(config: GoogleConfig) -> Result<Self, OAuthError> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| OAuthError::Client(e.to_string()))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn authorization_url(&self, state: &str) -> String {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_url.as_str()),
            ("response_type", "code"),
            ("scope", "openid email profile"),
            ("state", state),
        ];

        match Url::parse_with_params(AUTHORIZE_URL, &params) {
            Ok(url) => url.to_string(),
            Err(_) => AUTHORIZE_URL.to_string(),
        }
    }

    async fn identify(&self, code: &str) -> Result<OAuthIdentity, OAuthError> {
        let token_response = self
            .client
            .post(TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", &self.config.client_id),
                ("client_secret", &self.config.client_secret),
                ("redirect_uri", &self.config.redirect_url),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| OAuthError::Exchange(e.to_string()))?;

        if !token_response.status().is_success() {
            let status = token_response.status();
            let body = token_response.text().await.unwrap_or_default();
            return Err(OAuthError::Exchange(format!("{}: {}", status, body)));
        }

        let token: GoogleTokenResponse = token_response
            .json()
            .await
            .map_err(|e| OAuthError::Exchange(format!("invalid token response: {}", e)))?;

        let info: GoogleUserInfo = self
            .client
            .get(USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| OAuthError::UserInfo(e.to_string()))?
            .json()
            .await
            .map_err(|e| OAuthError::UserInfo(format!("invalid userinfo response: {}", e)))?;

        if !info.email_verified {
            return Err(OAuthError::UnverifiedEmail);
        }

        tracing::debug!("Google identity resolved");

        Ok(OAuthIdentity {
            email: info.email,
            first_name: info.given_name,
            last_name: info.family_name,
        })
    }
}
