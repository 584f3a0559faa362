// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! YouTube Data API and Google OAuth client.
//!
//! Handles:
//! - Consent URL construction
//! - Authorization code exchange
//! - Access token refresh
//! - Subscriber count lookup for the authenticated channel

use async_trait::async_trait;
use serde::Deserialize;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const YOUTUBE_API_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Read-only scope, enough to read channel statistics.
pub const YOUTUBE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/youtube.readonly";

/// Errors from the Google/YouTube APIs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The refresh token or code was rejected (expired, revoked, reused).
    #[error("grant rejected by provider (invalid_grant)")]
    InvalidGrant,

    /// The access token was rejected.
    #[error("access token rejected")]
    Unauthorized,

    #[error("provider rate limit exceeded")]
    RateLimited,

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Malformed(String),
}

/// Tokens as returned by the provider. Either may be missing.
#[derive(Clone, Default, Deserialize)]
pub struct GrantedTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires
    pub expires_in: Option<i64>,
}

impl std::fmt::Debug for GrantedTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrantedTokens")
            .field("has_access_token", &self.access_token.is_some())
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Identity and metric of the channel owned by the token holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMetrics {
    pub channel_id: String,
    pub channel_name: String,
    pub subscriber_count: u64,
}

/// Delegated-access metrics API.
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    /// Consent URL carrying `state` back to the callback.
    fn authorization_url(&self, state: &str) -> String;

    /// Exchange a one-time authorization code (redirect URI is implicit).
    async fn exchange_code(&self, code: &str) -> Result<GrantedTokens, ProviderError>;

    /// Mint a new access token from a refresh token.
    async fn refresh(&self, refresh_token: &str) -> Result<GrantedTokens, ProviderError>;

    /// Channel owned by the authenticated identity, if any.
    async fn fetch_owned_channel(
        &self,
        access_token: &str,
    ) -> Result<Option<ChannelMetrics>, ProviderError>;
}

/// YouTube Data API v3 client with Google OAuth credentials.
#[derive(Clone)]
pub struct YouTubeClient {
    http: reqwest::Client,
    auth_url: String,
    token_url: String,
    api_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl YouTubeClient {
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            api_url: YOUTUBE_API_URL.to_string(),
            client_id,
            client_secret,
            redirect_uri,
        }
    }

    /// Point the token and API endpoints somewhere else (tests).
    pub fn with_endpoints(mut self, token_url: impl Into<String>, api_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self.api_url = api_url.into();
        self
    }

    async fn post_token_form(&self, form: &[(&str, &str)]) -> Result<GrantedTokens, ProviderError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        check_response_json(response).await
    }
}

#[async_trait]
impl MetricsProvider for YouTubeClient {
    fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent&state={}",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(YOUTUBE_READONLY_SCOPE),
            urlencoding::encode(state),
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<GrantedTokens, ProviderError> {
        self.post_token_form(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
        ])
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<GrantedTokens, ProviderError> {
        self.post_token_form(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .await
    }

    async fn fetch_owned_channel(
        &self,
        access_token: &str,
    ) -> Result<Option<ChannelMetrics>, ProviderError> {
        let url = format!("{}/channels", self.api_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[("part", "snippet,statistics"), ("mine", "true")])
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let list: ChannelListResponse = check_response_json(response).await?;

        let Some(channel) = list.items.into_iter().next() else {
            return Ok(None);
        };

        let channel_name = channel
            .snippet
            .and_then(|s| s.title)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| crate::models::account::UNKNOWN_CHANNEL_NAME.to_string());

        // Hidden or unparseable counts are treated as zero.
        let subscriber_count = channel
            .statistics
            .and_then(|s| s.subscriber_count)
            .and_then(|c| c.parse::<u64>().ok())
            .unwrap_or(0);

        Ok(Some(ChannelMetrics {
            channel_id: channel.id,
            channel_name,
            subscriber_count,
        }))
    }
}

/// Check response status and parse the JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(format!("JSON parse error: {}", e)));
    }

    let body = response.text().await.unwrap_or_default();
    Err(classify_failure(status.as_u16(), body))
}

fn classify_failure(status: u16, body: String) -> ProviderError {
    match status {
        400 | 401 if body.contains("invalid_grant") => ProviderError::InvalidGrant,
        401 => ProviderError::Unauthorized,
        429 => {
            tracing::warn!("YouTube rate limit hit (429)");
            ProviderError::RateLimited
        }
        _ => ProviderError::Http { status, body },
    }
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChannelListResponse {
    #[serde(default)]
    items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
struct ChannelItem {
    id: String,
    snippet: Option<ChannelSnippet>,
    statistics: Option<ChannelStatistics>,
}

#[derive(Debug, Deserialize)]
struct ChannelSnippet {
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelStatistics {
    /// The API returns counts as decimal strings.
    subscriber_count: Option<String>,
}
