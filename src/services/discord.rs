// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Discord REST client for leaderboard channels.

use crate::error::AppError;
use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use serde::Deserialize;

const DISCORD_API_URL: &str = "https://discord.com/api/v10";

/// Deletes issued in parallel when clearing a channel.
const MAX_CONCURRENT_DELETES: usize = 5;

/// Discord channel types that accept text messages.
const GUILD_TEXT: u8 = 0;
const GUILD_ANNOUNCEMENT: u8 = 5;

/// A Discord channel, as much of it as we need.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub name: Option<String>,
}

impl Channel {
    pub fn is_text(&self) -> bool {
        matches!(self.kind, GUILD_TEXT | GUILD_ANNOUNCEMENT)
    }
}

/// A message in a channel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub content: String,
}

/// Chat-platform primitives used by the leaderboard publisher.
#[async_trait]
pub trait MessagingPlatform: Send + Sync {
    async fn fetch_channel(&self, channel_id: &str) -> Result<Option<Channel>, AppError>;

    /// Most recent messages, newest first. `limit` is capped at 100.
    async fn fetch_recent_messages(
        &self,
        channel_id: &str,
        limit: u8,
    ) -> Result<Vec<Message>, AppError>;

    async fn delete_messages(&self, messages: &[Message]) -> Result<(), AppError>;

    async fn send_message(&self, channel_id: &str, content: &str) -> Result<Message, AppError>;
}

/// Bot-authenticated Discord REST client.
#[derive(Clone)]
pub struct DiscordClient {
    http: reqwest::Client,
    base_url: String,
    bot_token: String,
}

impl DiscordClient {
    pub fn new(bot_token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DISCORD_API_URL.to_string(),
            bot_token,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn authorization(&self) -> String {
        format!("Bot {}", self.bot_token)
    }

    async fn delete_message(&self, message: &Message) -> Result<(), AppError> {
        let url = format!(
            "{}/channels/{}/messages/{}",
            self.base_url, message.channel_id, message.id
        );

        let response = self
            .http
            .delete(&url)
            .header(reqwest::header::AUTHORIZATION, self.authorization())
            .send()
            .await
            .map_err(|e| AppError::DiscordApi(e.to_string()))?;

        // Already gone is as good as deleted.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(message_id = %message.id, "Message already deleted");
            return Ok(());
        }

        check_response(response).await
    }
}

#[async_trait]
impl MessagingPlatform for DiscordClient {
    async fn fetch_channel(&self, channel_id: &str) -> Result<Option<Channel>, AppError> {
        let url = format!("{}/channels/{}", self.base_url, channel_id);

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, self.authorization())
            .send()
            .await
            .map_err(|e| AppError::DiscordApi(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        check_response_json(response).await.map(Some)
    }

    async fn fetch_recent_messages(
        &self,
        channel_id: &str,
        limit: u8,
    ) -> Result<Vec<Message>, AppError> {
        let url = format!("{}/channels/{}/messages", self.base_url, channel_id);

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, self.authorization())
            .query(&[("limit", limit.clamp(1, 100).to_string())])
            .send()
            .await
            .map_err(|e| AppError::DiscordApi(e.to_string()))?;

        check_response_json(response).await
    }

    async fn delete_messages(&self, messages: &[Message]) -> Result<(), AppError> {
        let results: Vec<Result<(), AppError>> = stream::iter(messages.iter().cloned())
            .map(|message| async move { self.delete_message(&message).await })
            .buffer_unordered(MAX_CONCURRENT_DELETES)
            .collect()
            .await;

        results.into_iter().collect()
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> Result<Message, AppError> {
        let url = format!("{}/channels/{}/messages", self.base_url, channel_id);

        let response = self
            .http
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, self.authorization())
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await
            .map_err(|e| AppError::DiscordApi(e.to_string()))?;

        check_response_json(response).await
    }
}

/// Check response status and return error if not successful.
async fn check_response(response: reqwest::Response) -> Result<(), AppError> {
    if response.status().is_success() {
        return Ok(());
    }
    Err(failure(response).await)
}

/// Check response and parse JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        return Err(failure(response).await);
    }

    response
        .json()
        .await
        .map_err(|e| AppError::DiscordApi(format!("JSON parse error: {}", e)))
}

async fn failure(response: reqwest::Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if status.as_u16() == 429 {
        tracing::warn!("Discord rate limit hit (429)");
        return AppError::DiscordApi(AppError::DISCORD_RATE_LIMIT.to_string());
    }

    AppError::DiscordApi(format!("HTTP {}: {}", status, body))
}
