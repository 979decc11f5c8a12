//! Client-credentials authentication.
//!
//! The service accepts short-lived bearer tokens obtained through an OAuth2
//! client-credentials exchange. [`TokenSource`] is the seam the session calls when
//! its cached token is missing or about to expire; [`OAuthClient`] is the HTTP
//! implementation.
use std::{fmt, time::Duration};

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use thiserror::Error;
use tokio::time::Instant;

/// Subtracted from every token lifetime before caching.
pub const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("token endpoint returned {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("malformed token response: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("token response carried no access token")]
    MissingToken,
}

/// Client identity for the token exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub instance: String,
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("instance", &self.instance)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_in: Duration,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"***")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Source of fresh bearer tokens.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch_token(&self, credentials: &Credentials) -> Result<AccessToken, AuthError>;
}

/// OAuth2 client-credentials exchange against the instance's token endpoint.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    client: reqwest::Client,
    token_url: String,
}

impl OAuthClient {
    pub fn new(token_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), token_url)
    }

    pub fn with_client(client: reqwest::Client, token_url: impl Into<String>) -> Self {
        Self {
            client,
            token_url: token_url.into(),
        }
    }
}

#[async_trait]
impl TokenSource for OAuthClient {
    async fn fetch_token(&self, credentials: &Credentials) -> Result<AccessToken, AuthError> {
        debug!(
            "requesting token for client '{}' on instance '{}'",
            credentials.client_id, credentials.instance
        );
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        parse_token_response(&body)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<serde_json::Value>,
}

/// Parses a token endpoint body. `expires_in` may be a number or a numeric
/// string; when absent the token is good for the current request only.
pub fn parse_token_response(body: &str) -> Result<AccessToken, AuthError> {
    let parsed: TokenResponse = serde_json::from_str(body)?;
    let token = parsed
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)?;
    let seconds = match parsed.expires_in {
        Some(serde_json::Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    };

    Ok(AccessToken {
        token,
        expires_in: Duration::from_secs(seconds),
    })
}

/// The session's cached bearer token.
#[derive(Debug, Default)]
pub(crate) struct TokenCache {
    token: Option<String>,
    expires_at: Option<Instant>,
}

impl TokenCache {
    /// The cached token, unless it is absent or past its margin-adjusted expiry.
    pub fn valid(&self, now: Instant) -> Option<&str> {
        match (&self.token, self.expires_at) {
            (Some(token), Some(expires_at)) if now < expires_at => Some(token),
            _ => None,
        }
    }

    pub fn store(&mut self, token: AccessToken, obtained_at: Instant) {
        let lifetime = token.expires_in.saturating_sub(EXPIRY_MARGIN);
        self.expires_at = Some(obtained_at + lifetime);
        self.token = Some(token.token);
    }

    pub fn clear(&mut self) {
        self.token = None;
        self.expires_at = None;
    }
}
