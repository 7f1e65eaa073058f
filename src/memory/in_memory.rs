//! Process-local memory store, for tests and ephemeral deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::Mutex;

use super::{
    check_kind, rank_memories, InteractionRecord, MemoryGateway, MemoryRecord, MemoryStore,
};
use crate::config::MemorySettings;
use crate::error::StoreError;
use crate::learning::{ResponseContext, UserId};

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    memories: Vec<MemoryRecord>,
    interactions: Vec<InteractionRecord>,
    preferences: HashMap<UserId, ResponseContext>,
}

impl Tables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn ranked_for(&self, user_id: UserId, kind: Option<&str>) -> Vec<MemoryRecord> {
        let mut memories: Vec<MemoryRecord> = self
            .memories
            .iter()
            .filter(|m| m.user_id == user_id && kind.map_or(true, |k| m.kind == k))
            .cloned()
            .collect();
        rank_memories(&mut memories);
        memories
    }
}

/// Memory store held entirely in memory. Same ordering and retention as
/// the SQLite store.
#[derive(Debug)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
    max_memories: usize,
    max_interactions: usize,
    memory_types: Vec<String>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(&MemorySettings::default())
    }
}

impl InMemoryStore {
    pub fn new(settings: &MemorySettings) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            max_memories: settings.max_memories,
            max_interactions: settings.max_recent_interactions,
            memory_types: settings.memory_types.clone(),
        }
    }
}

#[async_trait]
impl MemoryGateway for InMemoryStore {
    async fn recent_memories(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, StoreError> {
        let mut memories = self.tables.lock().ranked_for(user_id, None);
        memories.truncate(limit);
        Ok(memories)
    }

    async fn recent_interactions(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<InteractionRecord>, StoreError> {
        let tables = self.tables.lock();
        Ok(tables
            .interactions
            .iter()
            .rev()
            .filter(|i| i.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn memories_of_kind(
        &self,
        user_id: UserId,
        kind: &str,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, StoreError> {
        let mut memories = self.tables.lock().ranked_for(user_id, Some(kind));
        memories.truncate(limit);
        Ok(memories)
    }

    async fn store_memory(
        &self,
        user_id: UserId,
        content: &str,
        kind: &str,
        importance: f64,
    ) -> Result<i64, StoreError> {
        check_kind(&self.memory_types, kind)?;
        let mut tables = self.tables.lock();
        let id = tables.allocate_id();
        tables.memories.push(MemoryRecord {
            id,
            user_id,
            content: content.to_string(),
            kind: kind.to_string(),
            importance,
            created_at: Utc::now(),
        });

        let keep: Vec<i64> = tables
            .ranked_for(user_id, None)
            .into_iter()
            .take(self.max_memories)
            .map(|m| m.id)
            .collect();
        tables
            .memories
            .retain(|m| m.user_id != user_id || keep.contains(&m.id));
        Ok(id)
    }

    async fn delete_memory(&self, user_id: UserId, memory_id: i64) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock();
        let before = tables.memories.len();
        tables
            .memories
            .retain(|m| !(m.id == memory_id && m.user_id == user_id));
        Ok(tables.memories.len() < before)
    }

    async fn store_interaction(
        &self,
        user_id: UserId,
        message: &str,
        response: &str,
    ) -> Result<i64, StoreError> {
        let mut tables = self.tables.lock();
        let id = tables.allocate_id();
        tables.interactions.push(InteractionRecord {
            id,
            user_id,
            message: message.to_string(),
            response: response.to_string(),
            created_at: Utc::now(),
        });

        let total = tables.interactions.iter().filter(|i| i.user_id == user_id).count();
        let mut excess = total.saturating_sub(self.max_interactions);
        tables.interactions.retain(|i| {
            if excess > 0 && i.user_id == user_id {
                excess -= 1;
                false
            } else {
                true
            }
        });
        Ok(id)
    }

    async fn store_preferences(
        &self,
        user_id: UserId,
        snapshot: &ResponseContext,
    ) -> Result<(), StoreError> {
        self.tables.lock().preferences.insert(user_id, snapshot.clone());
        Ok(())
    }

    async fn load_preferences(
        &self,
        user_id: UserId,
    ) -> Result<Option<ResponseContext>, StoreError> {
        Ok(self.tables.lock().preferences.get(&user_id).cloned())
    }

    async fn clear_user(&self, user_id: UserId) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        tables.memories.retain(|m| m.user_id != user_id);
        tables.interactions.retain(|i| i.user_id != user_id);
        tables.preferences.remove(&user_id);
        Ok(())
    }

    async fn prune_older_than(&self, days: u32) -> Result<usize, StoreError> {
        let cutoff = Utc::now() - Duration::days(days as i64);
        let mut tables = self.tables.lock();
        let before = tables.memories.len() + tables.interactions.len();
        tables.memories.retain(|m| m.created_at >= cutoff);
        tables.interactions.retain(|i| i.created_at >= cutoff);
        Ok(before - tables.memories.len() - tables.interactions.len())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ranking_matches_sqlite_store() {
        let store = InMemoryStore::default();
        store.store_memory(1, "low", "fact", 0.2).await.unwrap();
        store.store_memory(1, "high old", "fact", 0.9).await.unwrap();
        store.store_memory(1, "high new", "user_note", 0.9).await.unwrap();

        let contents: Vec<String> = store
            .recent_memories(1, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["high new", "high old", "low"]);
        assert_eq!(store.memories_of_kind(1, "fact", 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_interaction_history_is_bounded() {
        let settings = MemorySettings {
            max_recent_interactions: 3,
            ..MemorySettings::default()
        };
        let store = InMemoryStore::new(&settings);
        for i in 0..5 {
            store.store_interaction(1, &format!("m{i}"), "").await.unwrap();
        }
        store.store_interaction(2, "other", "").await.unwrap();

        let recent = store.recent_interactions(1, 10).await.unwrap();
        let messages: Vec<&str> = recent.iter().map(|i| i.message.as_str()).collect();
        assert_eq!(messages, vec!["m4", "m3", "m2"]);
        assert_eq!(store.recent_interactions(2, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let store = InMemoryStore::default();
        let id = store.store_memory(1, "note", "user_note", 1.0).await.unwrap();
        assert!(!store.delete_memory(2, id).await.unwrap());
        assert!(store.delete_memory(1, id).await.unwrap());

        store.store_interaction(1, "hi", "hello").await.unwrap();
        store
            .store_preferences(1, &ResponseContext::default())
            .await
            .unwrap();
        store.clear_user(1).await.unwrap();
        assert!(store.recent_interactions(1, 10).await.unwrap().is_empty());
        assert!(store.load_preferences(1).await.unwrap().is_none());
    }

    #[test]
    fn test_memory_cap_evicts_lowest_ranked() {
        let settings = MemorySettings {
            max_memories: 2,
            ..MemorySettings::default()
        };
        let store = InMemoryStore::new(&settings);
        tokio_test::block_on(async {
            store.store_memory(1, "keep", "fact", 0.9).await.unwrap();
            store.store_memory(1, "drop", "fact", 0.1).await.unwrap();
            store.store_memory(1, "also keep", "fact", 0.5).await.unwrap();

            let contents: Vec<String> = store
                .recent_memories(1, 10)
                .await
                .unwrap()
                .into_iter()
                .map(|m| m.content)
                .collect();
            assert_eq!(contents, vec!["keep", "also keep"]);
        });
    }

    #[tokio::test]
    async fn test_store_memory_rejects_unconfigured_kind() {
        let store = InMemoryStore::default();
        let err = store.store_memory(1, "x", "gossip", 1.0).await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownKind(ref k) if k == "gossip"));
        assert!(store.recent_memories(1, 10).await.unwrap().is_empty());

        for kind in ["user_note", "conversation", "preference", "fact", "opinion"] {
            assert!(store.store_memory(1, "x", kind, 0.5).await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_prune_keeps_recent() {
        let store = InMemoryStore::default();
        store.store_memory(1, "fresh", "fact", 1.0).await.unwrap();
        assert_eq!(store.prune_older_than(30).await.unwrap(), 0);
        assert_eq!(store.recent_memories(1, 10).await.unwrap().len(), 1);
    }
}
