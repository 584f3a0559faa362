// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Linked account model for storage and API.

use serde::{Deserialize, Serialize};
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Delegated-access credential pair.
///
/// `Debug` only reports whether each token is present so the pair can be
/// logged without leaking secrets.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    pub fn has_access_token(&self) -> bool {
        !self.access_token.is_empty()
    }

    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.is_empty()
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("has_access_token", &self.has_access_token())
            .field("has_refresh_token", &self.has_refresh_token())
            .finish()
    }
}

/// One chat identity linked to a YouTube channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedAccount {
    /// Discord user ID (unique key)
    pub external_id: String,
    /// YouTube channel ID, absent until the first link completes
    pub channel_id: Option<String>,
    /// YouTube channel title
    pub channel_name: Option<String>,
    /// Last fetched subscriber count
    pub subscriber_count: u64,
    /// League computed from `subscriber_count`
    pub tier: String,
    pub tokens: TokenPair,
}

impl LinkedAccount {
    /// Name shown on leaderboards.
    pub fn display_name(&self) -> &str {
        self.channel_name.as_deref().unwrap_or(UNKNOWN_CHANNEL_NAME)
    }
}

/// Fallback label when a channel has no title.
pub const UNKNOWN_CHANNEL_NAME: &str = "Unknown";

/// Fields written by one refresh cycle.
///
/// `subscriber_count` and `tier` always travel together. When `tokens` is
/// `None` the stored credentials are left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountUpdate {
    pub subscriber_count: u64,
    pub tier: String,
    pub channel_name: Option<String>,
    pub tokens: Option<TokenPair>,
}

impl AccountUpdate {
    /// Apply this update to an account in place.
    ///
    /// An empty refresh token never replaces a stored one.
    pub fn apply_to(&self, account: &mut LinkedAccount) {
        account.subscriber_count = self.subscriber_count;
        account.tier = self.tier.clone();
        if let Some(name) = &self.channel_name {
            account.channel_name = Some(name.clone());
        }
        if let Some(tokens) = &self.tokens {
            if tokens.has_access_token() {
                account.tokens.access_token = tokens.access_token.clone();
            }
            if tokens.has_refresh_token() {
                account.tokens.refresh_token = tokens.refresh_token.clone();
            }
        }
    }
}

/// Ranked membership row (no credentials).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub external_id: String,
    pub channel_name: String,
    pub subscriber_count: u64,
    pub tier: String,
}

impl From<&LinkedAccount> for Standing {
    fn from(account: &LinkedAccount) -> Self {
        Self {
            external_id: account.external_id.clone(),
            channel_name: account.display_name().to_string(),
            subscriber_count: account.subscriber_count,
            tier: account.tier.clone(),
        }
    }
}

/// Result of a refresh request, returned to the command layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RefreshResult {
    pub success: bool,
    pub message: String,
    pub tier_changed: bool,
}

impl RefreshResult {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            tier_changed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> LinkedAccount {
        LinkedAccount {
            external_id: "42".to_string(),
            channel_id: Some("UC42".to_string()),
            channel_name: Some("Old Name".to_string()),
            subscriber_count: 10,
            tier: "Bronze".to_string(),
            tokens: TokenPair::new("access-1", "refresh-1"),
        }
    }

    #[test]
    fn test_token_pair_debug_hides_values() {
        let pair = TokenPair::new("secret-access", "");
        let debug = format!("{:?}", pair);
        assert!(!debug.contains("secret-access"));
        assert!(debug.contains("has_access_token: true"));
        assert!(debug.contains("has_refresh_token: false"));
    }

    #[test]
    fn test_update_without_tokens_keeps_credentials() {
        let mut acc = account();
        AccountUpdate {
            subscriber_count: 1500,
            tier: "Silver".to_string(),
            channel_name: None,
            tokens: None,
        }
        .apply_to(&mut acc);

        assert_eq!(acc.subscriber_count, 1500);
        assert_eq!(acc.tier, "Silver");
        assert_eq!(acc.channel_name.as_deref(), Some("Old Name"));
        assert_eq!(acc.tokens, TokenPair::new("access-1", "refresh-1"));
    }

    #[test]
    fn test_update_never_blanks_refresh_token() {
        let mut acc = account();
        AccountUpdate {
            subscriber_count: 11,
            tier: "Bronze".to_string(),
            channel_name: Some("New Name".to_string()),
            tokens: Some(TokenPair::new("access-2", "")),
        }
        .apply_to(&mut acc);

        assert_eq!(acc.tokens.access_token, "access-2");
        assert_eq!(acc.tokens.refresh_token, "refresh-1");
        assert_eq!(acc.channel_name.as_deref(), Some("New Name"));
    }
}
