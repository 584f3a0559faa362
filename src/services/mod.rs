// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod commands;
pub mod discord;
pub mod kms;
pub mod league;
pub mod link;
pub mod oauth_state;
pub mod refresh;
pub mod tokens;
pub mod youtube;

pub use commands::CommandService;
pub use discord::{DiscordClient, MessagingPlatform};
pub use kms::KmsService;
pub use league::{classify, LeaderboardPublisher, PublishOutcome};
pub use link::LinkService;
pub use refresh::{RefreshOrchestrator, RefreshReport};
pub use tokens::TokenManager;
pub use youtube::{MetricsProvider, YouTubeClient};
