// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sub-League: subscriber leagues for a Discord community
//!
//! Members link their YouTube channel through Google OAuth. The backend
//! keeps their tokens, tracks subscriber counts, places each channel in a
//! league and keeps one leaderboard message per league up to date.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::CredentialStore;
use models::TierTable;
use services::{CommandService, LeaderboardPublisher, LinkService, RefreshOrchestrator};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub tiers: Arc<TierTable>,
    pub store: Arc<dyn CredentialStore>,
    pub publisher: LeaderboardPublisher,
    pub orchestrator: RefreshOrchestrator,
    pub links: LinkService,
    pub commands: CommandService,
}

impl AppState {
    /// Wire the services together around one store, provider and messenger.
    pub fn new(
        config: Config,
        store: Arc<dyn CredentialStore>,
        provider: Arc<dyn services::MetricsProvider>,
        messenger: Arc<dyn services::MessagingPlatform>,
    ) -> Self {
        let tiers = Arc::new(config.tiers.clone());
        let publisher = LeaderboardPublisher::new(store.clone(), messenger, tiers.clone());
        let orchestrator = RefreshOrchestrator::new(
            store.clone(),
            provider.clone(),
            publisher.clone(),
            tiers.clone(),
        );
        let links = LinkService::new(
            store.clone(),
            provider,
            publisher.clone(),
            tiers.clone(),
            config.oauth_state_key.clone(),
        );
        let commands = CommandService::new(
            links.clone(),
            orchestrator.clone(),
            publisher.clone(),
            config.leaderboard_size,
        );

        Self {
            config,
            tiers,
            store,
            publisher,
            orchestrator,
            links,
            commands,
        }
    }
}
