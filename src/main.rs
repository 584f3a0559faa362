// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sub-League API Server
//!
//! Links Discord members to their YouTube channels, sorts them into
//! subscriber leagues and keeps the league leaderboards posted.

use std::sync::Arc;
use sub_league::{
    config::{Config, StoreBackend},
    db::{CredentialStore, FirestoreStore, MemoryStore},
    services::{DiscordClient, KmsService, YouTubeClient},
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(
        port = config.port,
        tiers = config.tiers.tiers().len(),
        "Starting Sub-League API"
    );

    let store: Arc<dyn CredentialStore> = match config.store_backend {
        StoreBackend::Firestore => {
            let kms = KmsService::new(
                &config.gcp_project_id,
                &config.gcp_region,
                "token-encryption",
            )
            .await
            .expect("Failed to initialize KMS service");
            tracing::info!("KMS service initialized");

            Arc::new(
                FirestoreStore::new(&config.gcp_project_id, kms)
                    .await
                    .expect("Failed to connect to Firestore"),
            )
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store, linked accounts are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let youtube = Arc::new(YouTubeClient::new(
        config.google_client_id.clone(),
        config.google_client_secret.clone(),
        config.google_redirect_uri.clone(),
    ));
    let discord = Arc::new(DiscordClient::new(config.discord_token.clone()));

    for tier in config.tiers.tiers() {
        if tier.channel_id.is_none() {
            tracing::warn!(tier = %tier.name, "No leaderboard channel configured for tier");
        }
    }

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), store, youtube, discord));

    // Build router
    let app = sub_league::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sub_league=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
