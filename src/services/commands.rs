// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! The three user commands: link, refresh, leaderboard.

use crate::error::AppError;
use crate::models::RefreshResult;
use crate::services::league::{render_leaderboard, LeaderboardPublisher};
use crate::services::link::LinkService;
use crate::services::refresh::RefreshOrchestrator;
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Default size of the interactive leaderboard.
pub const DEFAULT_LEADERBOARD_SIZE: usize = 10;

/// One row of an interactive leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub channel_name: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub subscriber_count: u64,
}

/// Top-N view of one league.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Leaderboard {
    pub tier: String,
    pub entries: Vec<LeaderboardEntry>,
    /// Pre-rendered chat message
    pub text: String,
}

#[derive(Clone)]
pub struct CommandService {
    links: LinkService,
    orchestrator: RefreshOrchestrator,
    publisher: LeaderboardPublisher,
    leaderboard_size: usize,
}

impl CommandService {
    pub fn new(
        links: LinkService,
        orchestrator: RefreshOrchestrator,
        publisher: LeaderboardPublisher,
        leaderboard_size: usize,
    ) -> Self {
        Self {
            links,
            orchestrator,
            publisher,
            leaderboard_size,
        }
    }

    /// `/link`: consent URL for this user.
    pub fn request_link(&self, external_id: &str) -> Result<String, AppError> {
        if external_id.trim().is_empty() {
            return Err(AppError::BadRequest("external_id is required".to_string()));
        }
        self.links
            .authorization_url(external_id)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to sign OAuth state: {}", e)))
    }

    /// `/refresh`: never fails, the result carries the outcome.
    pub async fn request_refresh(&self, external_id: &str) -> RefreshResult {
        self.orchestrator.refresh(external_id).await
    }

    /// `/leaderboard [league]`: defaults to the lowest league.
    pub async fn request_leaderboard(&self, league: Option<&str>) -> Result<Leaderboard, AppError> {
        let tiers = self.publisher.tiers();
        let tier = match league {
            Some(name) if !name.trim().is_empty() => tiers
                .find(name)
                .ok_or_else(|| AppError::NotFound("This league does not exist".to_string()))?,
            _ => tiers.lowest(),
        };

        let standings = self.publisher.top_n(&tier.name, self.leaderboard_size).await?;
        let text = render_leaderboard(
            &format!("Top {} of the {} league", self.leaderboard_size, tier.name),
            &standings,
        );

        Ok(Leaderboard {
            tier: tier.name.clone(),
            entries: standings
                .into_iter()
                .enumerate()
                .map(|(i, s)| LeaderboardEntry {
                    rank: i + 1,
                    channel_name: s.channel_name,
                    subscriber_count: s.subscriber_count,
                })
                .collect(),
            text,
        })
    }
}
