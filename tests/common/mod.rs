// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use sub_league::config::Config;
use sub_league::db::{CredentialStore, FirestoreStore, MemoryStore};
use sub_league::error::AppError;
use sub_league::models::{LinkedAccount, TierTable, TokenPair};
use sub_league::routes::create_router;
use sub_league::services::discord::{Channel, Message};
use sub_league::services::youtube::{ChannelMetrics, GrantedTokens, ProviderError};
use sub_league::services::{KmsService, MessagingPlatform, MetricsProvider};
use sub_league::AppState;

pub const BRONZE_CHANNEL: &str = "100";
pub const SILVER_CHANNEL: &str = "200";
pub const GOLD_CHANNEL: &str = "300";
pub const PLATINUM_CHANNEL: &str = "400";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Firestore store against the emulator, tokens sealed with mock KMS.
#[allow(dead_code)]
pub async fn test_firestore() -> FirestoreStore {
    FirestoreStore::new("test-project", KmsService::new_mock())
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Standard tiers with every leaderboard channel configured.
#[allow(dead_code)]
pub fn test_tiers() -> TierTable {
    TierTable::standard(
        Some(BRONZE_CHANNEL.to_string()),
        Some(SILVER_CHANNEL.to_string()),
        Some(GOLD_CHANNEL.to_string()),
        Some(PLATINUM_CHANNEL.to_string()),
    )
}

#[allow(dead_code)]
pub fn account(external_id: &str, name: &str, subs: u64, tier: &str) -> LinkedAccount {
    LinkedAccount {
        external_id: external_id.to_string(),
        channel_id: Some(format!("UC-{}", external_id)),
        channel_name: Some(name.to_string()),
        subscriber_count: subs,
        tier: tier.to_string(),
        tokens: TokenPair::new(format!("access-{}", external_id), format!("refresh-{}", external_id)),
    }
}

// ─── Metrics provider fake ───────────────────────────────────

/// Scripted YouTube provider. Every call is counted.
pub struct FakeProvider {
    pub exchange: Mutex<Result<GrantedTokens, ProviderError>>,
    pub refresh: Mutex<Result<GrantedTokens, ProviderError>>,
    pub channel: Mutex<Result<Option<ChannelMetrics>, ProviderError>>,
    pub exchange_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub channel_calls: AtomicUsize,
    /// Access tokens passed to `fetch_owned_channel`
    pub seen_access_tokens: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl FakeProvider {
    pub fn new() -> Self {
        Self {
            exchange: Mutex::new(Ok(granted(Some("new-access"), Some("new-refresh")))),
            refresh: Mutex::new(Ok(granted(Some("refreshed-access"), None))),
            channel: Mutex::new(Ok(None)),
            exchange_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            channel_calls: AtomicUsize::new(0),
            seen_access_tokens: Mutex::new(Vec::new()),
        }
    }

    pub fn with_channel(self, name: &str, subs: u64) -> Self {
        *self.channel.lock().unwrap() = Ok(Some(ChannelMetrics {
            channel_id: "UC-fake".to_string(),
            channel_name: name.to_string(),
            subscriber_count: subs,
        }));
        self
    }

    pub fn with_channel_result(self, result: Result<Option<ChannelMetrics>, ProviderError>) -> Self {
        *self.channel.lock().unwrap() = result;
        self
    }

    pub fn with_refresh(self, result: Result<GrantedTokens, ProviderError>) -> Self {
        *self.refresh.lock().unwrap() = result;
        self
    }

    pub fn with_exchange(self, result: Result<GrantedTokens, ProviderError>) -> Self {
        *self.exchange.lock().unwrap() = result;
        self
    }

    pub fn calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
            + self.refresh_calls.load(Ordering::SeqCst)
            + self.channel_calls.load(Ordering::SeqCst)
    }
}

#[allow(dead_code)]
pub fn granted(access: Option<&str>, refresh: Option<&str>) -> GrantedTokens {
    GrantedTokens {
        access_token: access.map(str::to_string),
        refresh_token: refresh.map(str::to_string),
        expires_in: Some(3599),
    }
}

#[async_trait]
impl MetricsProvider for FakeProvider {
    fn authorization_url(&self, state: &str) -> String {
        format!("https://accounts.example/consent?state={}", state)
    }

    async fn exchange_code(&self, _code: &str) -> Result<GrantedTokens, ProviderError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        self.exchange.lock().unwrap().clone()
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<GrantedTokens, ProviderError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.refresh.lock().unwrap().clone()
    }

    async fn fetch_owned_channel(
        &self,
        access_token: &str,
    ) -> Result<Option<ChannelMetrics>, ProviderError> {
        self.channel_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_access_tokens
            .lock()
            .unwrap()
            .push(access_token.to_string());
        self.channel.lock().unwrap().clone()
    }
}

// ─── Messaging fake ──────────────────────────────────────────

/// In-memory chat platform. Channels hold their messages oldest first.
#[derive(Default)]
pub struct RecordingMessenger {
    pub channels: Mutex<HashMap<String, Channel>>,
    pub messages: Mutex<HashMap<String, Vec<Message>>>,
    pub deleted: Mutex<Vec<Message>>,
    /// (channel_id, content) in send order
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail_sends: Mutex<bool>,
    next_id: AtomicUsize,
}

#[allow(dead_code)]
impl RecordingMessenger {
    /// Messenger with a text channel for every tier of [`test_tiers`].
    pub fn with_tier_channels() -> Self {
        let messenger = Self::default();
        for id in [BRONZE_CHANNEL, SILVER_CHANNEL, GOLD_CHANNEL, PLATINUM_CHANNEL] {
            messenger.add_channel(id, 0);
        }
        messenger
    }

    pub fn add_channel(&self, id: &str, kind: u8) {
        self.channels.lock().unwrap().insert(
            id.to_string(),
            Channel {
                id: id.to_string(),
                kind,
                name: Some(format!("channel-{}", id)),
            },
        );
    }

    pub fn remove_channel(&self, id: &str) {
        self.channels.lock().unwrap().remove(id);
    }

    /// Messages currently visible in a channel.
    pub fn contents(&self, channel_id: &str) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .get(channel_id)
            .map(|msgs| msgs.iter().map(|m| m.content.clone()).collect())
            .unwrap_or_default()
    }

    /// Channels that received a message, in send order.
    pub fn sent_channels(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(c, _)| c.clone()).collect()
    }

    fn push(&self, channel_id: &str, content: &str) -> Message {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let message = Message {
            id: format!("m{}", id),
            channel_id: channel_id.to_string(),
            content: content.to_string(),
        };
        self.messages
            .lock()
            .unwrap()
            .entry(channel_id.to_string())
            .or_default()
            .push(message.clone());
        message
    }

    /// Put a message in a channel without recording it as sent.
    pub fn seed_message(&self, channel_id: &str, content: &str) {
        self.push(channel_id, content);
    }
}

#[async_trait]
impl MessagingPlatform for RecordingMessenger {
    async fn fetch_channel(&self, channel_id: &str) -> Result<Option<Channel>, AppError> {
        Ok(self.channels.lock().unwrap().get(channel_id).cloned())
    }

    async fn fetch_recent_messages(
        &self,
        channel_id: &str,
        limit: u8,
    ) -> Result<Vec<Message>, AppError> {
        let messages = self.messages.lock().unwrap();
        Ok(messages
            .get(channel_id)
            .map(|msgs| msgs.iter().rev().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_messages(&self, to_delete: &[Message]) -> Result<(), AppError> {
        // Real deletes are network round trips; let other publishes interleave.
        tokio::task::yield_now().await;
        let mut messages = self.messages.lock().unwrap();
        for message in to_delete {
            if let Some(msgs) = messages.get_mut(&message.channel_id) {
                msgs.retain(|m| m.id != message.id);
            }
        }
        self.deleted.lock().unwrap().extend_from_slice(to_delete);
        Ok(())
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> Result<Message, AppError> {
        tokio::task::yield_now().await;
        if *self.fail_sends.lock().unwrap() {
            return Err(AppError::DiscordApi("HTTP 500: boom".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((channel_id.to_string(), content.to_string()));
        Ok(self.push(channel_id, content))
    }
}

// ─── App wiring ──────────────────────────────────────────────

/// Fakes behind a running app.
#[allow(dead_code)]
pub struct TestHarness {
    pub state: Arc<AppState>,
    pub store: MemoryStore,
    pub provider: Arc<FakeProvider>,
    pub messenger: Arc<RecordingMessenger>,
}

/// Build shared state over a memory store and the given fakes.
#[allow(dead_code)]
pub fn test_harness(provider: FakeProvider, messenger: RecordingMessenger) -> TestHarness {
    let config = Config {
        tiers: test_tiers(),
        ..Config::default()
    };
    let store = MemoryStore::new();
    let provider = Arc::new(provider);
    let messenger = Arc::new(messenger);

    let state = Arc::new(AppState::new(
        config,
        Arc::new(store.clone()) as Arc<dyn CredentialStore>,
        provider.clone(),
        messenger.clone(),
    ));

    TestHarness {
        state,
        store,
        provider,
        messenger,
    }
}

/// Create a test app with offline fake dependencies.
/// Returns the router and the harness.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, TestHarness) {
    let harness = test_harness(FakeProvider::new(), RecordingMessenger::with_tier_channels());
    (create_router(harness.state.clone()), harness)
}
