// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! League classification and leaderboard publication.

use crate::db::CredentialStore;
use crate::error::AppError;
use crate::models::{Standing, Tier, TierTable};
use crate::services::discord::MessagingPlatform;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Messages cleared before a leaderboard is rewritten.
///
/// Only this many recent messages are removed, so older content in the
/// channel survives a republish.
pub const DEFAULT_CLEAR_WINDOW: u8 = 10;

/// Discord's per-message character limit.
pub const MESSAGE_CHAR_LIMIT: usize = 2000;

/// Tier for a subscriber count: the highest tier whose threshold is met.
pub fn classify(subscriber_count: u64, tiers: &TierTable) -> &Tier {
    tiers
        .tiers()
        .iter()
        .rev()
        .find(|t| t.min_subs <= subscriber_count)
        .unwrap_or_else(|| tiers.lowest())
}

/// Format a count with thousands separators ("1,234,567").
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Render a ranked list as one Discord message.
///
/// Rows that would push the message past [`MESSAGE_CHAR_LIMIT`] are dropped
/// and summarised on a final line.
pub fn render_leaderboard(title: &str, standings: &[Standing]) -> String {
    let mut message = format!("🏆 {} 🏆\n\n", title);

    if standings.is_empty() {
        message.push_str("No linked channels yet.\n");
        return message;
    }

    // Room for the "…and N more" line.
    let budget = MESSAGE_CHAR_LIMIT - 32;

    for (index, standing) in standings.iter().enumerate() {
        let line = format!(
            "{}. {} - {} subscribers\n",
            index + 1,
            standing.channel_name,
            format_count(standing.subscriber_count)
        );
        if message.chars().count() + line.chars().count() > budget {
            message.push_str(&format!("…and {} more\n", standings.len() - index));
            break;
        }
        message.push_str(&line);
    }

    message
}

/// What a publish call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Published {
        channel_id: String,
        members: usize,
        cleared: usize,
    },
    Skipped(SkipReason),
}

/// Why nothing was published. Neither case is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The tier has no leaderboard channel configured.
    NoChannelConfigured,
    /// The configured channel is missing or does not accept text.
    ChannelUnavailable,
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("unknown tier: {0}")]
    UnknownTier(String),

    #[error("failed to load tier members: {0}")]
    Store(#[source] AppError),

    #[error("failed to update leaderboard channel: {0}")]
    Messaging(#[source] AppError),
}

/// Rebuilds tier leaderboards in their Discord channels.
///
/// Publishes to the same channel are serialized by a per-channel lock, so a
/// clear never interleaves with another run's write.
#[derive(Clone)]
pub struct LeaderboardPublisher {
    store: Arc<dyn CredentialStore>,
    messenger: Arc<dyn MessagingPlatform>,
    tiers: Arc<TierTable>,
    channel_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
    clear_window: u8,
}

impl LeaderboardPublisher {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        messenger: Arc<dyn MessagingPlatform>,
        tiers: Arc<TierTable>,
    ) -> Self {
        Self {
            store,
            messenger,
            tiers,
            channel_locks: Arc::new(DashMap::new()),
            clear_window: DEFAULT_CLEAR_WINDOW,
        }
    }

    pub fn with_clear_window(mut self, clear_window: u8) -> Self {
        self.clear_window = clear_window;
        self
    }

    pub fn tiers(&self) -> &TierTable {
        &self.tiers
    }

    /// Top `n` members of a tier (interactive leaderboard).
    pub async fn top_n(&self, tier_name: &str, n: usize) -> Result<Vec<Standing>, AppError> {
        self.store.list_by_tier(tier_name, Some(n)).await
    }

    /// Every member of a tier (republication).
    pub async fn all(&self, tier_name: &str) -> Result<Vec<Standing>, AppError> {
        self.store.list_by_tier(tier_name, None).await
    }

    /// Replace the tier's leaderboard in its channel.
    pub async fn publish(&self, tier_name: &str) -> Result<PublishOutcome, PublishError> {
        let tier = self
            .tiers
            .get(tier_name)
            .ok_or_else(|| PublishError::UnknownTier(tier_name.to_string()))?;

        let Some(channel_id) = tier.channel_id.as_deref() else {
            tracing::debug!(tier = %tier.name, "No leaderboard channel configured, skipping");
            return Ok(PublishOutcome::Skipped(SkipReason::NoChannelConfigured));
        };

        let lock = self
            .channel_locks
            .entry(channel_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let channel = self
            .messenger
            .fetch_channel(channel_id)
            .await
            .map_err(PublishError::Messaging)?;

        match channel {
            Some(c) if c.is_text() => {}
            other => {
                tracing::warn!(
                    tier = %tier.name,
                    channel_id,
                    found = other.is_some(),
                    "Leaderboard channel missing or not a text channel, skipping"
                );
                return Ok(PublishOutcome::Skipped(SkipReason::ChannelUnavailable));
            }
        }

        let members = self.all(&tier.name).await.map_err(PublishError::Store)?;
        let content = render_leaderboard(&format!("{} leaderboard", tier.name), &members);

        let previous = self
            .messenger
            .fetch_recent_messages(channel_id, self.clear_window)
            .await
            .map_err(PublishError::Messaging)?;

        self.messenger
            .delete_messages(&previous)
            .await
            .map_err(PublishError::Messaging)?;

        self.messenger
            .send_message(channel_id, &content)
            .await
            .map_err(PublishError::Messaging)?;

        tracing::info!(
            tier = %tier.name,
            channel_id,
            members = members.len(),
            cleared = previous.len(),
            "Leaderboard republished"
        );

        Ok(PublishOutcome::Published {
            channel_id: channel_id.to_string(),
            members: members.len(),
            cleared: previous.len(),
        })
    }
}
