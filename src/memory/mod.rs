//! Durable memory: the read contract the engine relies on and the write
//! operations the chat layer uses around it.
//!
//! The engine only ever reads ([`MemoryGateway`]). Persisting interactions,
//! notes and preference snapshots happens in the chat layer after the
//! engine has produced its reply.

pub mod in_memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::learning::{ResponseContext, UserId};

pub use in_memory::InMemoryStore;
pub use sqlite::SqliteMemoryStore;

/// Memory kind for notes saved with `/remember`.
pub const USER_NOTE: &str = "user_note";

/// A stored note about a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: i64,
    pub user_id: UserId,
    pub content: String,
    pub kind: String,
    pub importance: f64,
    pub created_at: DateTime<Utc>,
}

/// One message and the reply it received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub id: i64,
    pub user_id: UserId,
    pub message: String,
    pub response: String,
    pub created_at: DateTime<Utc>,
}

/// Read path used while building prompts.
#[async_trait]
pub trait MemoryGateway: Send + Sync {
    /// Memories ranked by importance, then recency.
    async fn recent_memories(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, StoreError>;

    /// Interactions, most recent first.
    async fn recent_interactions(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<InteractionRecord>, StoreError>;
}

/// Full store: the read contract plus writes and retention.
#[async_trait]
pub trait MemoryStore: MemoryGateway {
    /// Memories of one kind, ranked like [`MemoryGateway::recent_memories`].
    async fn memories_of_kind(
        &self,
        user_id: UserId,
        kind: &str,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, StoreError>;

    /// Insert a memory and return its id. Fails with
    /// [`StoreError::UnknownKind`] unless `kind` is one of the configured
    /// memory types.
    async fn store_memory(
        &self,
        user_id: UserId,
        content: &str,
        kind: &str,
        importance: f64,
    ) -> Result<i64, StoreError>;

    /// Delete one of the user's memories. `false` when nothing matched.
    async fn delete_memory(&self, user_id: UserId, memory_id: i64) -> Result<bool, StoreError>;

    async fn store_interaction(
        &self,
        user_id: UserId,
        message: &str,
        response: &str,
    ) -> Result<i64, StoreError>;

    /// Upsert the user's learned-preference snapshot.
    async fn store_preferences(
        &self,
        user_id: UserId,
        snapshot: &ResponseContext,
    ) -> Result<(), StoreError>;

    async fn load_preferences(&self, user_id: UserId)
        -> Result<Option<ResponseContext>, StoreError>;

    /// Remove every memory, interaction and snapshot for the user.
    async fn clear_user(&self, user_id: UserId) -> Result<(), StoreError>;

    /// Drop memories and interactions older than `days`. Returns rows removed.
    async fn prune_older_than(&self, days: u32) -> Result<usize, StoreError>;
}

/// Reject kinds outside the configured memory types.
pub(crate) fn check_kind(allowed: &[String], kind: &str) -> Result<(), StoreError> {
    if allowed.iter().any(|k| k == kind) {
        Ok(())
    } else {
        Err(StoreError::UnknownKind(kind.to_string()))
    }
}

/// Sort memories by importance desc, then creation time desc, then id desc.
pub(crate) fn rank_memories(memories: &mut [MemoryRecord]) {
    memories.sort_by(|a, b| {
        b.importance
            .total_cmp(&a.importance)
            .then(b.created_at.cmp(&a.created_at))
            .then(b.id.cmp(&a.id))
    });
}
