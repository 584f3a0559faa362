// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth token lifecycle.
//!
//! Turns provider responses into validated [`TokenPair`]s. Persisting the
//! result is the caller's job; nothing here touches storage.

use crate::models::TokenPair;
use crate::services::youtube::{MetricsProvider, ProviderError};
use std::sync::Arc;

/// Code exchange failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthExchangeError {
    #[error("authorization code is empty")]
    EmptyCode,

    #[error("provider did not return an access token")]
    MissingAccessToken,

    /// Google omits the refresh token on repeat consent without `prompt=consent`.
    #[error("provider did not return a refresh token")]
    MissingRefreshToken,

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Access token refresh failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    /// Nothing to refresh with; no request was made.
    #[error("no refresh token stored")]
    MissingRefreshToken,

    #[error("provider did not return an access token")]
    MissingAccessToken,

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Exchanges codes for token pairs and refreshes access tokens.
#[derive(Clone)]
pub struct TokenManager {
    provider: Arc<dyn MetricsProvider>,
}

impl TokenManager {
    pub fn new(provider: Arc<dyn MetricsProvider>) -> Self {
        Self { provider }
    }

    /// Consent URL for a signed `state`.
    pub fn authorization_url(&self, state: &str) -> String {
        self.provider.authorization_url(state)
    }

    /// Exchange a one-time authorization code. Both tokens must be present.
    pub async fn exchange_authorization_code(
        &self,
        code: &str,
    ) -> Result<TokenPair, AuthExchangeError> {
        if code.trim().is_empty() {
            return Err(AuthExchangeError::EmptyCode);
        }

        let granted = self.provider.exchange_code(code).await?;

        tracing::info!(
            has_access_token = granted.access_token.is_some(),
            has_refresh_token = granted.refresh_token.is_some(),
            expires_in = granted.expires_in,
            "Authorization code exchanged"
        );

        let access_token = non_empty(granted.access_token)
            .ok_or(AuthExchangeError::MissingAccessToken)?;
        let refresh_token = non_empty(granted.refresh_token)
            .ok_or(AuthExchangeError::MissingRefreshToken)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Mint a fresh access token.
    ///
    /// Fails with [`RefreshError::MissingRefreshToken`] before any request when
    /// `current` has no refresh token. If the provider does not rotate the
    /// refresh token, the current one is carried over.
    pub async fn refresh(&self, current: &TokenPair) -> Result<TokenPair, RefreshError> {
        if !current.has_refresh_token() {
            return Err(RefreshError::MissingRefreshToken);
        }

        let granted = self.provider.refresh(&current.refresh_token).await?;

        let access_token =
            non_empty(granted.access_token).ok_or(RefreshError::MissingAccessToken)?;
        let rotated = non_empty(granted.refresh_token);

        tracing::debug!(
            refresh_token_rotated = rotated.is_some(),
            expires_in = granted.expires_in,
            "Access token refreshed"
        );

        Ok(TokenPair {
            access_token,
            refresh_token: rotated.unwrap_or_else(|| current.refresh_token.clone()),
        })
    }
}

fn non_empty(token: Option<String>) -> Option<String> {
    token.filter(|t| !t.is_empty())
}
