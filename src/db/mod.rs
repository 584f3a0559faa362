//! Database layer.
//!
//! The rest of the crate talks to storage through [`CredentialStore`]; the
//! Firestore and in-memory backends both implement it.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

use crate::error::Result;
use crate::models::{AccountUpdate, LinkedAccount, Standing};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    /// Linked accounts (keyed by Discord user ID)
    pub const LINKED_ACCOUNTS: &str = "linked_accounts";
}

/// Keyed record store for linked accounts.
///
/// Each call is atomic on its own; nothing here spans multiple records.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<LinkedAccount>>;

    /// Create the account or replace every field of an existing one.
    async fn upsert(&self, account: &LinkedAccount) -> Result<()>;

    /// Apply a refresh-cycle update as a single write.
    async fn update(&self, external_id: &str, update: &AccountUpdate) -> Result<()>;

    /// Members of a tier, highest subscriber count first.
    async fn list_by_tier(&self, tier: &str, limit: Option<usize>) -> Result<Vec<Standing>>;
}
