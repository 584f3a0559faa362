// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed credential store.
//!
//! One document per linked account in `linked_accounts`, keyed by Discord
//! user ID. OAuth tokens are encrypted with Cloud KMS before they are written.

use super::CredentialStore;
use crate::db::collections;
use crate::error::{AppError, Result};
use crate::models::{AccountUpdate, LinkedAccount, Standing, TokenPair};
use crate::services::KmsService;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Stored form of a [`LinkedAccount`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountDocument {
    pub external_id: String,
    pub channel_id: Option<String>,
    pub channel_name: Option<String>,
    pub subscriber_count: u64,
    pub tier: String,
    /// Encrypted access token (base64), empty if none
    #[serde(default)]
    pub access_token_encrypted: String,
    /// Encrypted refresh token (base64), empty if none
    #[serde(default)]
    pub refresh_token_encrypted: String,
    /// Last write (ISO 8601)
    pub updated_at: String,
}

mod fields {
    pub const CHANNEL_ID: &str = "channel_id";
    pub const CHANNEL_NAME: &str = "channel_name";
    pub const SUBSCRIBER_COUNT: &str = "subscriber_count";
    pub const TIER: &str = "tier";
    pub const ACCESS_TOKEN: &str = "access_token_encrypted";
    pub const REFRESH_TOKEN: &str = "refresh_token_encrypted";
    pub const UPDATED_AT: &str = "updated_at";
}

/// Fields an upsert writes. A blank refresh token leaves the stored one alone.
fn upsert_mask(account: &LinkedAccount) -> Vec<&'static str> {
    let mut mask = vec![
        fields::CHANNEL_ID,
        fields::CHANNEL_NAME,
        fields::SUBSCRIBER_COUNT,
        fields::TIER,
        fields::ACCESS_TOKEN,
        fields::UPDATED_AT,
    ];
    if account.tokens.has_refresh_token() {
        mask.push(fields::REFRESH_TOKEN);
    }
    mask
}

/// Fields a refresh-cycle update writes. Token fields appear only for
/// tokens that are present and non-empty.
fn update_mask(update: &AccountUpdate) -> Vec<&'static str> {
    let mut mask = vec![fields::SUBSCRIBER_COUNT, fields::TIER, fields::UPDATED_AT];
    if update.channel_name.is_some() {
        mask.push(fields::CHANNEL_NAME);
    }
    if let Some(tokens) = &update.tokens {
        if tokens.has_access_token() {
            mask.push(fields::ACCESS_TOKEN);
        }
        if tokens.has_refresh_token() {
            mask.push(fields::REFRESH_TOKEN);
        }
    }
    mask
}

impl AccountDocument {
    fn standing(&self) -> Standing {
        Standing {
            external_id: self.external_id.clone(),
            channel_name: self
                .channel_name
                .clone()
                .unwrap_or_else(|| crate::models::account::UNKNOWN_CHANNEL_NAME.to_string()),
            subscriber_count: self.subscriber_count,
            tier: self.tier.clone(),
        }
    }
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreStore {
    client: Option<firestore::FirestoreDb>,
    kms: KmsService,
}

impl FirestoreStore {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str, kms: KmsService) -> Result<Self> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id, kms).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
            kms,
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str, kms: KmsService) -> Result<Self> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
            kms,
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock(kms: KmsService) -> Self {
        Self { client: None, kms }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    async fn get_document(&self, external_id: &str) -> Result<Option<AccountDocument>> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::LINKED_ACCOUNTS)
            .obj()
            .one(external_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Write only the `mask` fields of `doc`; other stored fields are kept.
    ///
    /// With `must_exist` the write fails with `NotFound` instead of creating
    /// the document.
    async fn write_fields(
        &self,
        doc: &AccountDocument,
        mask: &[&str],
        must_exist: bool,
    ) -> Result<()> {
        let builder = self
            .get_client()?
            .fluent()
            .update()
            .fields(mask.iter().copied())
            .in_col(collections::LINKED_ACCOUNTS);

        let builder = if must_exist {
            builder.precondition(firestore::FirestoreWritePrecondition::Exists(true))
        } else {
            builder
        };

        let result: firestore::FirestoreResult<()> = builder
            .document_id(&doc.external_id)
            .object(doc)
            .execute()
            .await;

        match result {
            Ok(()) => Ok(()),
            Err(firestore::errors::FirestoreError::DataNotFoundError(_)) if must_exist => Err(
                AppError::NotFound(format!("Linked account {}", doc.external_id)),
            ),
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    /// Encrypt a token, leaving empty tokens empty.
    async fn seal(&self, token: &str) -> Result<String> {
        if token.is_empty() {
            return Ok(String::new());
        }
        self.kms.encrypt(token).await
    }

    async fn open(&self, sealed: &str) -> Result<String> {
        if sealed.is_empty() {
            return Ok(String::new());
        }
        self.kms.decrypt(sealed).await
    }
}

#[async_trait]
impl CredentialStore for FirestoreStore {
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<LinkedAccount>> {
        let Some(doc) = self.get_document(external_id).await? else {
            return Ok(None);
        };

        let access_token = self.open(&doc.access_token_encrypted).await?;
        let refresh_token = self.open(&doc.refresh_token_encrypted).await?;

        Ok(Some(LinkedAccount {
            external_id: doc.external_id,
            channel_id: doc.channel_id,
            channel_name: doc.channel_name,
            subscriber_count: doc.subscriber_count,
            tier: doc.tier,
            tokens: TokenPair {
                access_token,
                refresh_token,
            },
        }))
    }

    async fn upsert(&self, account: &LinkedAccount) -> Result<()> {
        if !account.tokens.has_refresh_token() {
            tracing::warn!(
                external_id = %account.external_id,
                "Upsert without refresh token, keeping stored one"
            );
        }

        let doc = AccountDocument {
            external_id: account.external_id.clone(),
            channel_id: account.channel_id.clone(),
            channel_name: account.channel_name.clone(),
            subscriber_count: account.subscriber_count,
            tier: account.tier.clone(),
            access_token_encrypted: self.seal(&account.tokens.access_token).await?,
            refresh_token_encrypted: self.seal(&account.tokens.refresh_token).await?,
            updated_at: chrono::Utc::now().to_rfc3339(),
        };

        self.write_fields(&doc, &upsert_mask(account), false).await
    }

    async fn update(&self, external_id: &str, update: &AccountUpdate) -> Result<()> {
        let mut doc = AccountDocument {
            external_id: external_id.to_string(),
            channel_id: None,
            channel_name: update.channel_name.clone(),
            subscriber_count: update.subscriber_count,
            tier: update.tier.clone(),
            access_token_encrypted: String::new(),
            refresh_token_encrypted: String::new(),
            updated_at: chrono::Utc::now().to_rfc3339(),
        };
        if let Some(tokens) = &update.tokens {
            doc.access_token_encrypted = self.seal(&tokens.access_token).await?;
            doc.refresh_token_encrypted = self.seal(&tokens.refresh_token).await?;
        }

        // One masked write; fields outside the mask (stored tokens included)
        // are not touched.
        self.write_fields(&doc, &update_mask(update), true).await
    }

    async fn list_by_tier(&self, tier: &str, limit: Option<usize>) -> Result<Vec<Standing>> {
        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::LINKED_ACCOUNTS)
            .filter(|q| q.for_all([q.field("tier").eq(tier)]))
            .order_by([(
                "subscriber_count",
                firestore::FirestoreQueryDirection::Descending,
            )]);

        let query = match limit {
            Some(n) => query.limit(u32::try_from(n).unwrap_or(u32::MAX)),
            None => query,
        };

        let docs: Vec<AccountDocument> = query
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(docs.iter().map(AccountDocument::standing).collect())
    }
}
