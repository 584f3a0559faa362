//! Application configuration loaded from environment variables.
//!
//! Cloud Run injects secrets as environment variables, so there is a single
//! loading path for local development and production.

use crate::models::{Tier, TierTable, TierTableError};
use crate::services::commands::DEFAULT_LEADERBOARD_SIZE;
use std::env;

/// Where linked accounts are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    /// In-process map, lost on restart (local development)
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Google OAuth client ID (public)
    pub google_client_id: String,
    /// OAuth redirect URI registered with Google (points at /auth/callback)
    pub google_redirect_uri: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// GCP region for KMS
    pub gcp_region: String,
    /// Server port
    pub port: u16,
    pub store_backend: StoreBackend,
    /// Rows in the interactive leaderboard
    pub leaderboard_size: usize,
    /// League thresholds and their leaderboard channels
    pub tiers: TierTable,

    // --- Secrets ---
    /// Google OAuth client secret
    pub google_client_secret: String,
    /// Discord bot token
    pub discord_token: String,
    /// HMAC key for the OAuth state parameter (raw bytes)
    pub oauth_state_key: Vec<u8>,
    /// Bearer token the command relay must present
    pub command_api_token: String,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            google_client_id: "test_client_id".to_string(),
            google_redirect_uri: "http://localhost:3000/auth/callback".to_string(),
            gcp_project_id: "test-project".to_string(),
            gcp_region: "us-west1".to_string(),
            port: 3000,
            store_backend: StoreBackend::Memory,
            leaderboard_size: DEFAULT_LEADERBOARD_SIZE,
            tiers: TierTable::standard(None, None, None, None),
            google_client_secret: "test_secret".to_string(),
            discord_token: "test_discord_token".to_string(),
            oauth_state_key: b"test_state_key_32_bytes_minimum!".to_vec(),
            command_api_token: "test_command_token".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            google_client_id: required("GOOGLE_CLIENT_ID")?,
            google_redirect_uri: required("GOOGLE_REDIRECT_URI")?,
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            gcp_region: env::var("GCP_REGION").unwrap_or_else(|_| "us-west1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
            store_backend: parse_store_backend(env::var("STORE_BACKEND").ok().as_deref())?,
            leaderboard_size: env::var("LEADERBOARD_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_LEADERBOARD_SIZE),
            tiers: load_tiers()?,

            google_client_secret: required("GOOGLE_CLIENT_SECRET")?,
            discord_token: required("DISCORD_TOKEN")?,
            oauth_state_key: required("OAUTH_STATE_KEY")?.into_bytes(),
            command_api_token: required("COMMAND_API_TOKEN")?,
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_store_backend(value: Option<&str>) -> Result<StoreBackend, ConfigError> {
    match value.map(str::trim) {
        None | Some("") | Some("firestore") => Ok(StoreBackend::Firestore),
        Some("memory") => Ok(StoreBackend::Memory),
        Some(other) => Err(ConfigError::Invalid {
            name: "STORE_BACKEND",
            reason: format!("unknown backend {:?}", other),
        }),
    }
}

/// `LEAGUE_TIERS` (JSON) if set, otherwise the standard table with
/// per-tier channel variables.
fn load_tiers() -> Result<TierTable, ConfigError> {
    if let Some(json) = optional("LEAGUE_TIERS") {
        return parse_tiers(&json);
    }

    Ok(TierTable::standard(
        optional("BRONZE_CHANNEL_ID"),
        optional("SILVER_CHANNEL_ID"),
        optional("GOLD_CHANNEL_ID"),
        optional("PLATINUM_CHANNEL_ID"),
    ))
}

fn parse_tiers(json: &str) -> Result<TierTable, ConfigError> {
    let tiers: Vec<Tier> = serde_json::from_str(json).map_err(|e| ConfigError::Invalid {
        name: "LEAGUE_TIERS",
        reason: e.to_string(),
    })?;
    Ok(TierTable::new(tiers)?)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("Invalid tier table: {0}")]
    Tiers(#[from] TierTableError),
}
