// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Channel linking: consent URL and authorization callback.

use crate::db::CredentialStore;
use crate::error::AppError;
use crate::models::{LinkedAccount, TierTable};
use crate::services::league::{classify, LeaderboardPublisher};
use crate::services::oauth_state::{sign_state, verify_state, StateError};
use crate::services::tokens::{AuthExchangeError, TokenManager};
use crate::services::youtube::{MetricsProvider, ProviderError};
use std::sync::Arc;

/// Link failures, each with a page the user can read.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("invalid state: {0}")]
    State(#[from] StateError),

    #[error("consent denied: {0}")]
    Denied(String),

    #[error("token exchange failed: {0}")]
    Exchange(#[from] AuthExchangeError),

    #[error("no channel owned by this Google account")]
    ChannelNotFound,

    #[error("channel lookup failed: {0}")]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] AppError),
}

impl LinkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            LinkError::State(_) => "This link has expired or is invalid. Run `/link` again.",
            LinkError::Denied(_) => "Access was not granted. Run `/link` again to retry.",
            LinkError::Exchange(AuthExchangeError::MissingAccessToken)
            | LinkError::Exchange(AuthExchangeError::MissingRefreshToken) => {
                "Error: could not obtain the required tokens. Please try again."
            }
            LinkError::ChannelNotFound => "Could not find a YouTube channel for this account.",
            _ => "Something went wrong while linking your channel. Please try again.",
        }
    }
}

/// Result of a completed link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOutcome {
    pub external_id: String,
    pub channel_name: String,
    pub subscriber_count: u64,
    pub tier: String,
    pub previous_tier: Option<String>,
}

#[derive(Clone)]
pub struct LinkService {
    store: Arc<dyn CredentialStore>,
    tokens: TokenManager,
    provider: Arc<dyn MetricsProvider>,
    publisher: LeaderboardPublisher,
    tiers: Arc<TierTable>,
    state_key: Vec<u8>,
}

impl LinkService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        provider: Arc<dyn MetricsProvider>,
        publisher: LeaderboardPublisher,
        tiers: Arc<TierTable>,
        state_key: Vec<u8>,
    ) -> Self {
        Self {
            store,
            tokens: TokenManager::new(provider.clone()),
            provider,
            publisher,
            tiers,
            state_key,
        }
    }

    /// Consent URL for a Discord user.
    pub fn authorization_url(&self, external_id: &str) -> Result<String, LinkError> {
        let state = sign_state(external_id, &self.state_key, chrono::Utc::now())?;
        Ok(self.tokens.authorization_url(&state))
    }

    /// Handle the OAuth redirect. Single shot: nothing is retried.
    pub async fn complete(
        &self,
        code: &str,
        state: &str,
        error: Option<&str>,
    ) -> Result<LinkOutcome, LinkError> {
        let external_id = verify_state(state, &self.state_key, chrono::Utc::now())?;

        if let Some(error) = error {
            tracing::warn!(external_id = %external_id, error = %error, "OAuth error from Google");
            return Err(LinkError::Denied(error.to_string()));
        }

        let tokens = self.tokens.exchange_authorization_code(code).await?;

        let channel = self
            .provider
            .fetch_owned_channel(&tokens.access_token)
            .await?
            .ok_or(LinkError::ChannelNotFound)?;

        let tier = classify(channel.subscriber_count, &self.tiers).name.clone();
        let previous_tier = self
            .store
            .find_by_external_id(&external_id)
            .await?
            .map(|a| a.tier);

        let account = LinkedAccount {
            external_id: external_id.clone(),
            channel_id: Some(channel.channel_id),
            channel_name: Some(channel.channel_name.clone()),
            subscriber_count: channel.subscriber_count,
            tier: tier.clone(),
            tokens,
        };
        self.store.upsert(&account).await?;

        tracing::info!(
            external_id = %external_id,
            subscriber_count = channel.subscriber_count,
            tier = %tier,
            relink = previous_tier.is_some(),
            "Channel linked"
        );

        self.republish_best_effort(previous_tier.as_deref(), &tier).await;

        Ok(LinkOutcome {
            external_id,
            channel_name: channel.channel_name,
            subscriber_count: channel.subscriber_count,
            tier,
            previous_tier,
        })
    }

    /// Refresh affected leaderboards; the link itself already succeeded.
    async fn republish_best_effort(&self, previous_tier: Option<&str>, tier: &str) {
        let mut targets = vec![tier];
        if let Some(prev) = previous_tier.filter(|p| *p != tier) {
            if self.tiers.get(prev).is_some() {
                targets.push(prev);
            }
        }

        for target in targets {
            if let Err(e) = self.publisher.publish(target).await {
                tracing::warn!(tier = %target, error = %e, "Leaderboard republish after link failed");
            }
        }
    }
}
