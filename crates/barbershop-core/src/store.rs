// Collaborator seams: the player catalog, the per-user ranking store, and
// the consensus aggregator. Each backend (SQLite, hosted REST) implements all
// three.

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::error::{CatalogError, StoreError};
use crate::model::{CollectiveRankingRow, Player, PlayerId, RankingSlot, UserId};

/// Read-only, searchable player catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Players matching `query` (case-insensitive, across name/team/position),
    /// ordered by name, at most `limit`. An empty query returns the first page.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Player>, CatalogError>;

    /// Full records for the given identifiers. Unknown identifiers are omitted.
    async fn lookup(&self, ids: &[PlayerId]) -> Result<Vec<Player>, CatalogError>;
}

/// Why a full-list replacement failed, and what state it left behind.
#[derive(Debug, Error)]
pub enum ReplaceError {
    /// Nothing changed in the store (delete failed, or the whole replacement
    /// was rolled back).
    #[error("{0}")]
    Unchanged(#[source] StoreError),

    /// The delete went through and the insert did not: the user's persisted
    /// ranking is empty.
    #[error("{0}")]
    Cleared(#[source] StoreError),
}

/// Per-user ordered set of slots. Mutated only through `replace_all`.
#[async_trait]
pub trait RankingStore: Send + Sync {
    async fn read_all(&self, user_id: &UserId) -> Result<Vec<RankingSlot>, StoreError>;

    async fn delete_all(&self, user_id: &UserId) -> Result<(), StoreError>;

    /// Must reject duplicate positions or duplicate players for one user.
    async fn insert_many(&self, slots: &[RankingSlot]) -> Result<(), StoreError>;

    /// Replace the user's whole ranking with `slots`.
    ///
    /// The default issues the delete and then the insert back to back.
    /// Backends with transactions override this with a single atomic step.
    async fn replace_all(&self, user_id: &UserId, slots: &[RankingSlot]) -> Result<(), ReplaceError> {
        self.delete_all(user_id).await.map_err(ReplaceError::Unchanged)?;
        debug!(user_id = %user_id, rows = slots.len(), "Existing rankings deleted, inserting");
        if slots.is_empty() {
            return Ok(());
        }
        self.insert_many(slots).await.map_err(ReplaceError::Cleared)
    }
}

/// Source of the community consensus.
#[async_trait]
pub trait Aggregator: Send + Sync {
    /// Server-side consensus computation, top `limit` rows with display data.
    async fn collective_rankings(&self, limit: usize) -> Result<Vec<CollectiveRankingRow>, StoreError>;

    /// Every user's raw slots in insertion order. Feeds the in-memory fallback.
    async fn all_slots(&self) -> Result<Vec<RankingSlot>, StoreError>;
}
