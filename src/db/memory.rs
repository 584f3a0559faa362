// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process credential store for local development and tests.

use super::CredentialStore;
use crate::error::{AppError, Result};
use crate::models::{AccountUpdate, LinkedAccount, Standing};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// `DashMap`-backed store. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    accounts: Arc<DashMap<String, LinkedAccount>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<LinkedAccount>> {
        Ok(self.accounts.get(external_id).map(|a| a.clone()))
    }

    async fn upsert(&self, account: &LinkedAccount) -> Result<()> {
        let mut account = account.clone();
        // Keep the stored refresh token if the new record would blank it.
        if !account.tokens.has_refresh_token() {
            if let Some(existing) = self.accounts.get(&account.external_id) {
                account.tokens.refresh_token = existing.tokens.refresh_token.clone();
            }
        }
        self.accounts.insert(account.external_id.clone(), account);
        Ok(())
    }

    async fn update(&self, external_id: &str, update: &AccountUpdate) -> Result<()> {
        let mut entry = self
            .accounts
            .get_mut(external_id)
            .ok_or_else(|| AppError::NotFound(format!("Linked account {}", external_id)))?;
        update.apply_to(&mut entry);
        Ok(())
    }

    async fn list_by_tier(&self, tier: &str, limit: Option<usize>) -> Result<Vec<Standing>> {
        let mut members: Vec<Standing> = self
            .accounts
            .iter()
            .filter(|a| a.tier == tier)
            .map(|a| Standing::from(a.value()))
            .collect();

        members.sort_by(|a, b| {
            b.subscriber_count
                .cmp(&a.subscriber_count)
                .then_with(|| a.channel_name.cmp(&b.channel_name))
                .then_with(|| a.external_id.cmp(&b.external_id))
        });

        if let Some(limit) = limit {
            members.truncate(limit);
        }
        Ok(members)
    }
}
