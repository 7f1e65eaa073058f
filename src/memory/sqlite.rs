//! SQLite-backed memory store.
//!
//! rusqlite is synchronous, so each operation opens a connection inside
//! `spawn_blocking`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{check_kind, InteractionRecord, MemoryGateway, MemoryRecord, MemoryStore};
use crate::config::MemorySettings;
use crate::error::StoreError;
use crate::learning::{ResponseContext, UserId};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS memories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        content TEXT NOT NULL,
        type TEXT NOT NULL,
        importance REAL NOT NULL DEFAULT 1.0,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_memories_user ON memories (user_id);
    CREATE TABLE IF NOT EXISTS interaction_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        message TEXT NOT NULL,
        response TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_interactions_user ON interaction_history (user_id);
    CREATE TABLE IF NOT EXISTS user_preferences (
        user_id INTEGER PRIMARY KEY,
        preferences TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
";

const MEMORY_COLUMNS: &str = "id, user_id, content, type, importance, created_at";
const MEMORY_ORDER: &str = "ORDER BY importance DESC, created_at DESC, id DESC";

/// RFC 3339 with fixed microsecond precision, so text order is time order.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

fn memory_from_row(row: &Row<'_>) -> rusqlite::Result<MemoryRecord> {
    let created: String = row.get(5)?;
    Ok(MemoryRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        content: row.get(2)?,
        kind: row.get(3)?,
        importance: row.get(4)?,
        created_at: parse_timestamp(&created, 5)?,
    })
}

fn interaction_from_row(row: &Row<'_>) -> rusqlite::Result<InteractionRecord> {
    let created: String = row.get(4)?;
    Ok(InteractionRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        message: row.get(2)?,
        response: row.get(3)?,
        created_at: parse_timestamp(&created, 4)?,
    })
}

/// Memory store in a single SQLite file.
#[derive(Debug, Clone)]
pub struct SqliteMemoryStore {
    pub db_path: PathBuf,
    max_memories: usize,
    max_interactions: usize,
    memory_types: Vec<String>,
}

impl SqliteMemoryStore {
    /// Open (creating if needed) the database at `db_path`.
    pub fn open(db_path: impl AsRef<Path>, settings: &MemorySettings) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&db_path).map_err(|e| {
            log::error!("memory store: cannot open {}: {}", db_path.display(), e);
            e
        })?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            db_path,
            max_memories: settings.max_memories,
            max_interactions: settings.max_recent_interactions,
            memory_types: settings.memory_types.clone(),
        })
    }

    /// Open the database named in `settings`.
    pub fn from_settings(settings: &MemorySettings) -> Result<Self, StoreError> {
        Self::open(&settings.database_path, settings)
    }

    async fn run<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = Connection::open(&db_path)?;
            op(&mut conn)
        })
        .await?
    }
}

#[async_trait]
impl MemoryGateway for SqliteMemoryStore {
    async fn recent_memories(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, StoreError> {
        self.run(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM memories WHERE user_id = ?1 {} LIMIT ?2",
                MEMORY_COLUMNS, MEMORY_ORDER
            ))?;
            let rows = stmt.query_map(params![user_id, limit as i64], memory_from_row)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }

    async fn recent_interactions(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<InteractionRecord>, StoreError> {
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, message, response, created_at
                 FROM interaction_history
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![user_id, limit as i64], interaction_from_row)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }
}

#[async_trait]
impl MemoryStore for SqliteMemoryStore {
    async fn memories_of_kind(
        &self,
        user_id: UserId,
        kind: &str,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, StoreError> {
        let kind = kind.to_string();
        self.run(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM memories WHERE user_id = ?1 AND type = ?2 {} LIMIT ?3",
                MEMORY_COLUMNS, MEMORY_ORDER
            ))?;
            let rows = stmt.query_map(params![user_id, kind, limit as i64], memory_from_row)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }

    async fn store_memory(
        &self,
        user_id: UserId,
        content: &str,
        kind: &str,
        importance: f64,
    ) -> Result<i64, StoreError> {
        check_kind(&self.memory_types, kind)?;
        let content = content.to_string();
        let kind = kind.to_string();
        let keep = self.max_memories as i64;
        self.run(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO memories (user_id, content, type, importance, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![user_id, content, kind, importance, timestamp(Utc::now())],
            )?;
            let id = tx.last_insert_rowid();
            let evicted = tx.execute(
                &format!(
                    "DELETE FROM memories WHERE user_id = ?1 AND id NOT IN (
                        SELECT id FROM memories WHERE user_id = ?1 {} LIMIT ?2
                     )",
                    MEMORY_ORDER
                ),
                params![user_id, keep],
            )?;
            tx.commit()?;
            if evicted > 0 {
                log::debug!("evicted {} low-ranked memories for user {}", evicted, user_id);
            }
            Ok(id)
        })
        .await
    }

    async fn delete_memory(&self, user_id: UserId, memory_id: i64) -> Result<bool, StoreError> {
        self.run(move |conn| {
            let removed = conn.execute(
                "DELETE FROM memories WHERE id = ?1 AND user_id = ?2",
                params![memory_id, user_id],
            )?;
            Ok(removed > 0)
        })
        .await
    }

    async fn store_interaction(
        &self,
        user_id: UserId,
        message: &str,
        response: &str,
    ) -> Result<i64, StoreError> {
        let message = message.to_string();
        let response = response.to_string();
        let keep = self.max_interactions as i64;
        self.run(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO interaction_history (user_id, message, response, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![user_id, message, response, timestamp(Utc::now())],
            )?;
            let id = tx.last_insert_rowid();
            tx.execute(
                "DELETE FROM interaction_history WHERE user_id = ?1 AND id NOT IN (
                    SELECT id FROM interaction_history WHERE user_id = ?1
                    ORDER BY created_at DESC, id DESC LIMIT ?2
                 )",
                params![user_id, keep],
            )?;
            tx.commit()?;
            Ok(id)
        })
        .await
    }

    async fn store_preferences(
        &self,
        user_id: UserId,
        snapshot: &ResponseContext,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string(snapshot)?;
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO user_preferences (user_id, preferences, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id) DO UPDATE SET
                    preferences = excluded.preferences,
                    updated_at = excluded.updated_at",
                params![user_id, json, timestamp(Utc::now())],
            )?;
            Ok(())
        })
        .await
    }

    async fn load_preferences(
        &self,
        user_id: UserId,
    ) -> Result<Option<ResponseContext>, StoreError> {
        let raw: Option<String> = self
            .run(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT preferences FROM user_preferences WHERE user_id = ?1",
                        params![user_id],
                        |row| row.get(0),
                    )
                    .optional()?)
            })
            .await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn clear_user(&self, user_id: UserId) -> Result<(), StoreError> {
        self.run(move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM memories WHERE user_id = ?1", params![user_id])?;
            tx.execute("DELETE FROM interaction_history WHERE user_id = ?1", params![user_id])?;
            tx.execute("DELETE FROM user_preferences WHERE user_id = ?1", params![user_id])?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn prune_older_than(&self, days: u32) -> Result<usize, StoreError> {
        let cutoff = timestamp(Utc::now() - Duration::days(days as i64));
        self.run(move |conn| {
            let tx = conn.transaction()?;
            let memories =
                tx.execute("DELETE FROM memories WHERE created_at < ?1", params![cutoff])?;
            let interactions = tx.execute(
                "DELETE FROM interaction_history WHERE created_at < ?1",
                params![cutoff],
            )?;
            tx.commit()?;
            Ok(memories + interactions)
        })
        .await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learning::Preferences;
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> SqliteMemoryStore {
        SqliteMemoryStore::open(dir.path().join("memory.db"), &MemorySettings::default()).unwrap()
    }

    #[tokio::test]
    async fn test_open_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("memory.db");
        let store = SqliteMemoryStore::open(&path, &MemorySettings::default()).unwrap();
        assert!(path.exists());
        assert!(store.recent_memories(1, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memories_ranked_by_importance_then_recency() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.store_memory(1, "low", "fact", 0.2).await.unwrap();
        store.store_memory(1, "high old", "fact", 0.9).await.unwrap();
        store.store_memory(1, "high new", "user_note", 0.9).await.unwrap();
        store.store_memory(2, "other user", "fact", 1.0).await.unwrap();

        let memories = store.recent_memories(1, 10).await.unwrap();
        let contents: Vec<&str> = memories.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["high new", "high old", "low"]);

        let limited = store.recent_memories(1, 2).await.unwrap();
        assert_eq!(limited.len(), 2);

        let notes = store.memories_of_kind(1, "user_note", 10).await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].content, "high new");
    }

    #[tokio::test]
    async fn test_delete_memory_scoped_to_user() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let id = store.store_memory(1, "secret", "user_note", 1.0).await.unwrap();

        assert!(!store.delete_memory(2, id).await.unwrap());
        assert!(store.delete_memory(1, id).await.unwrap());
        assert!(!store.delete_memory(1, id).await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_capacity_evicts_lowest_ranked() {
        let dir = TempDir::new().unwrap();
        let settings = MemorySettings {
            max_memories: 2,
            ..MemorySettings::default()
        };
        let store = SqliteMemoryStore::open(dir.path().join("m.db"), &settings).unwrap();
        store.store_memory(1, "keep", "fact", 1.0).await.unwrap();
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
    }

    #[tokio::test]
    async fn test_unknown_memory_kind_rejected() {
        let dir = TempDir::new().unwrap();
        let settings = MemorySettings {
            memory_types: vec!["user_note".into()],
            ..MemorySettings::default()
        };
        let store = SqliteMemoryStore::open(dir.path().join("memory.db"), &settings).unwrap();

        let err = store.store_memory(1, "x", "fact", 1.0).await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownKind(ref k) if k == "fact"));
        assert!(store.recent_memories(1, 10).await.unwrap().is_empty());
        assert!(store.store_memory(1, "x", "user_note", 1.0).await.is_ok());
    }

    #[tokio::test]
    async fn test_interactions_most_recent_first() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.store_interaction(1, "first", "a").await.unwrap();
        store.store_interaction(1, "second", "b").await.unwrap();
        store.store_interaction(1, "third", "").await.unwrap();

        let recent = store.recent_interactions(1, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "third");
        assert_eq!(recent[0].response, "");
        assert_eq!(recent[1].message, "second");
    }

    #[tokio::test]
    async fn test_preferences_round_trip_and_upsert() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        assert!(store.load_preferences(1).await.unwrap().is_none());

        let mut snapshot = ResponseContext {
            topics: vec!["rust".into()],
            message_count: 3,
            ..ResponseContext::default()
        };
        store.store_preferences(1, &snapshot).await.unwrap();

        snapshot.preferences = Preferences {
            formality: 0.8,
            ..Preferences::default()
        };
        store.store_preferences(1, &snapshot).await.unwrap();

        assert_eq!(store.load_preferences(1).await.unwrap(), Some(snapshot));
    }

    #[tokio::test]
    async fn test_clear_user_removes_everything() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.store_memory(1, "note", "user_note", 1.0).await.unwrap();
        store.store_interaction(1, "hi", "hello").await.unwrap();
        store
            .store_preferences(1, &ResponseContext::default())
            .await
            .unwrap();
        store.store_memory(2, "kept", "user_note", 1.0).await.unwrap();

        store.clear_user(1).await.unwrap();

        assert!(store.recent_memories(1, 10).await.unwrap().is_empty());
        assert!(store.recent_interactions(1, 10).await.unwrap().is_empty());
        assert!(store.load_preferences(1).await.unwrap().is_none());
        assert_eq!(store.recent_memories(2, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_prune_removes_only_old_rows() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.store_memory(1, "fresh", "fact", 1.0).await.unwrap();

        let old = timestamp(Utc::now() - Duration::days(40));
        let path = store.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(path).unwrap();
            conn.execute(
                "INSERT INTO memories (user_id, content, type, importance, created_at)
                 VALUES (1, 'stale', 'fact', 1.0, ?1)",
                params![old],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO interaction_history (user_id, message, response, created_at)
                 VALUES (1, 'old message', '', ?1)",
                params![old],
            )
            .unwrap();
        })
        .await
        .unwrap();

        assert_eq!(store.prune_older_than(30).await.unwrap(), 2);
        let memories = store.recent_memories(1, 10).await.unwrap();
        assert_eq!(memories.len(), 1);
        assert_eq!(memories[0].content, "fresh");
    }
}
