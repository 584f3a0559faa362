// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Subscriber refresh cycle.
//!
//! One run per request:
//!
//! ```text
//! Start -> TokenRefreshed | TokenRefreshFallback -> MetricsFetched
//!       -> Classified -> Persisted [-> Republished] -> Done
//! ```
//!
//! Any step may end the run as failed. The account is written exactly once,
//! with subscriber count and tier together, so a failed run never leaves a
//! mismatched pair behind.

use crate::db::CredentialStore;
use crate::error::AppError;
use crate::models::{AccountUpdate, RefreshResult, TierTable};
use crate::services::league::{classify, format_count, LeaderboardPublisher};
use crate::services::tokens::TokenManager;
use crate::services::youtube::{MetricsProvider, ProviderError};
use std::sync::Arc;

/// States a run passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStage {
    Start,
    TokenRefreshed,
    /// Refresh failed; the stored access token is used as is.
    TokenRefreshFallback,
    MetricsFetched,
    Classified,
    Persisted,
    Republished,
    Done,
}

/// Why a run failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshFailure {
    /// No linked account for this user.
    NotLinked,
    /// Credentials are unusable; the user has to link again.
    AuthRequired,
    /// The token holder owns no YouTube channel.
    MetricsUnavailable,
    Unknown(String),
}

impl RefreshFailure {
    pub fn user_message(&self) -> &'static str {
        match self {
            RefreshFailure::NotLinked => {
                "You haven't linked your YouTube channel yet. Use the `/link` command first."
            }
            RefreshFailure::AuthRequired => {
                "Connection to YouTube failed. Please link your channel again with `/link`."
            }
            RefreshFailure::MetricsUnavailable => {
                "No YouTube channel was found for your Google account. Please link your channel again with `/link`."
            }
            RefreshFailure::Unknown(_) => {
                "Something went wrong while updating your data. Please try again."
            }
        }
    }
}

impl From<AppError> for RefreshFailure {
    fn from(err: AppError) -> Self {
        RefreshFailure::Unknown(err.to_string())
    }
}

/// Everything a run did, for the caller and for tests.
#[derive(Debug, Clone)]
pub struct RefreshReport {
    pub result: RefreshResult,
    pub stages: Vec<RefreshStage>,
    pub failure: Option<RefreshFailure>,
    pub previous_tier: Option<String>,
    pub tier: Option<String>,
    /// Tiers whose leaderboard was republished (or skipped for lack of a channel)
    pub republished: Vec<String>,
}

impl RefreshReport {
    fn start() -> Self {
        Self {
            result: RefreshResult::failed(""),
            stages: vec![RefreshStage::Start],
            failure: None,
            previous_tier: None,
            tier: None,
            republished: Vec::new(),
        }
    }

    /// Whether the run continued on a stale access token.
    pub fn degraded(&self) -> bool {
        self.stages.contains(&RefreshStage::TokenRefreshFallback)
    }
}

/// Drives token refresh, metric fetch, classification, persistence and
/// leaderboard republication for one user.
#[derive(Clone)]
pub struct RefreshOrchestrator {
    store: Arc<dyn CredentialStore>,
    tokens: TokenManager,
    provider: Arc<dyn MetricsProvider>,
    publisher: LeaderboardPublisher,
    tiers: Arc<TierTable>,
}

impl RefreshOrchestrator {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        provider: Arc<dyn MetricsProvider>,
        publisher: LeaderboardPublisher,
        tiers: Arc<TierTable>,
    ) -> Self {
        Self {
            store,
            tokens: TokenManager::new(provider.clone()),
            provider,
            publisher,
            tiers,
        }
    }

    /// Refresh one user and return only the user-facing result.
    pub async fn refresh(&self, external_id: &str) -> RefreshResult {
        self.run(external_id).await.result
    }

    /// Refresh one user. Never fails: errors end up in the report.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self, external_id: &str) -> RefreshReport {
        let mut report = RefreshReport::start();

        match self.drive(external_id, &mut report).await {
            Ok(result) => {
                report.stages.push(RefreshStage::Done);
                report.result = result;
            }
            Err(failure) => {
                match &failure {
                    RefreshFailure::NotLinked => {
                        tracing::info!("Refresh requested by unlinked user")
                    }
                    RefreshFailure::Unknown(reason) => tracing::error!(
                        reason = %reason,
                        stages = ?report.stages,
                        "Refresh failed unexpectedly"
                    ),
                    other => tracing::warn!(failure = ?other, "Refresh failed"),
                }
                report.result = RefreshResult::failed(failure.user_message());
                report.failure = Some(failure);
            }
        }

        report
    }

    async fn drive(
        &self,
        external_id: &str,
        report: &mut RefreshReport,
    ) -> Result<RefreshResult, RefreshFailure> {
        let account = self
            .store
            .find_by_external_id(external_id)
            .await?
            .ok_or(RefreshFailure::NotLinked)?;

        tracing::info!(
            has_access_token = account.tokens.has_access_token(),
            has_refresh_token = account.tokens.has_refresh_token(),
            current_tier = %account.tier,
            "Starting refresh"
        );

        // Previous tier, captured before the write below.
        let previous_tier = account.tier.clone();
        report.previous_tier = Some(previous_tier.clone());

        let (access_token, rotated) = match self.tokens.refresh(&account.tokens).await {
            Ok(pair) => {
                tracing::info!(auth_path = "refreshed", "Access token refreshed");
                report.stages.push(RefreshStage::TokenRefreshed);
                (pair.access_token.clone(), Some(pair))
            }
            Err(err) if account.tokens.has_access_token() => {
                tracing::warn!(
                    auth_path = "fallback",
                    error = %err,
                    "Token refresh failed, continuing with stored access token"
                );
                report.stages.push(RefreshStage::TokenRefreshFallback);
                (account.tokens.access_token.clone(), None)
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    has_access_token = false,
                    "Token refresh failed and no access token is stored"
                );
                return Err(RefreshFailure::AuthRequired);
            }
        };

        let metrics = match self.provider.fetch_owned_channel(&access_token).await {
            Ok(Some(metrics)) => metrics,
            Ok(None) => return Err(RefreshFailure::MetricsUnavailable),
            Err(ProviderError::Unauthorized | ProviderError::InvalidGrant) => {
                return Err(RefreshFailure::AuthRequired)
            }
            Err(err) => return Err(RefreshFailure::Unknown(err.to_string())),
        };
        report.stages.push(RefreshStage::MetricsFetched);

        let subs = metrics.subscriber_count;
        let tier = classify(subs, &self.tiers).name.clone();
        report.tier = Some(tier.clone());
        report.stages.push(RefreshStage::Classified);

        let update = AccountUpdate {
            subscriber_count: subs,
            tier: tier.clone(),
            channel_name: Some(metrics.channel_name),
            tokens: rotated,
        };
        self.store.update(external_id, &update).await?;
        report.stages.push(RefreshStage::Persisted);

        tracing::info!(
            subscriber_count = subs,
            previous_tier = %previous_tier,
            tier = %tier,
            "Account updated"
        );

        if previous_tier == tier {
            self.republish(&tier, report).await?;
            return Ok(RefreshResult {
                success: true,
                message: format!(
                    "You're still in the {} league with {} subscribers.",
                    tier,
                    format_count(subs)
                ),
                tier_changed: false,
            });
        }

        // The old tier lost a member and the new one gained one.
        self.republish(&previous_tier, report).await?;
        self.republish(&tier, report).await?;
        report.stages.push(RefreshStage::Republished);

        Ok(RefreshResult {
            success: true,
            message: self.transition_message(&previous_tier, &tier, subs),
            tier_changed: true,
        })
    }

    async fn republish(
        &self,
        tier_name: &str,
        report: &mut RefreshReport,
    ) -> Result<(), RefreshFailure> {
        // A stored tier may predate a table change.
        if self.tiers.get(tier_name).is_none() {
            tracing::warn!(tier = %tier_name, "Stored tier is not in the tier table, not republishing");
            return Ok(());
        }

        self.publisher
            .publish(tier_name)
            .await
            .map_err(|e| RefreshFailure::Unknown(e.to_string()))?;
        report.republished.push(tier_name.to_string());
        Ok(())
    }

    fn transition_message(&self, from: &str, to: &str, subs: u64) -> String {
        match (self.tiers.rank(from), self.tiers.rank(to)) {
            (Some(old), Some(new)) if new > old => {
                format!("👏 Congratulations! You moved up from {} to {}!", from, to)
            }
            (Some(_), Some(_)) => format!(
                "You moved from {} to {} with {} subscribers.",
                from,
                to,
                format_count(subs)
            ),
            _ => format!(
                "You are now in the {} league with {} subscribers.",
                to,
                format_count(subs)
            ),
        }
    }
}
