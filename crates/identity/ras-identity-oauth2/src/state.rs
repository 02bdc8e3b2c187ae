//! Session-scoped storage for values that must survive the redirect.

use crate::error::OAuth2Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A value stored for one session under one key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEntry {
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionEntry {
    pub fn new(value: String, ttl_seconds: u64) -> Self {
        let created_at = Utc::now();
        // TTLs past chrono's range never expire.
        let expires_at = i64::try_from(ttl_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| created_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            value,
            created_at,
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// Trait for session key/value storage
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store `value` under `key` for the session, replacing any previous value
    async fn put(&self, session_id: &str, key: &str, value: String) -> OAuth2Result<()>;

    /// Remove and return the value under `key`, if present and not expired
    async fn take(&self, session_id: &str, key: &str) -> OAuth2Result<Option<String>>;

    /// Clean up expired entries
    async fn cleanup_expired(&self) -> OAuth2Result<usize>;
}

type EntryKey = (String, String);

/// In-memory implementation of SessionStore
///
/// Entries of abandoned flows stay in memory until they are taken or swept;
/// hosts must call [`SessionStore::cleanup_expired`] periodically.
pub struct InMemorySessionStore {
    entries: Arc<RwLock<HashMap<EntryKey, SessionEntry>>>,
    ttl_seconds: u64,
}

impl InMemorySessionStore {
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl_seconds,
        }
    }

    #[cfg(test)]
    pub(crate) async fn insert_entry(&self, session_id: &str, key: &str, entry: SessionEntry) {
        let mut entries = self.entries.write().await;
        entries.insert((session_id.to_string(), key.to_string()), entry);
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(600)
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(&self, session_id: &str, key: &str, value: String) -> OAuth2Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            (session_id.to_string(), key.to_string()),
            SessionEntry::new(value, self.ttl_seconds),
        );
        Ok(())
    }

    async fn take(&self, session_id: &str, key: &str) -> OAuth2Result<Option<String>> {
        let mut entries = self.entries.write().await;

        let entry = entries.remove(&(session_id.to_string(), key.to_string()));

        Ok(entry.filter(|e| !e.is_expired()).map(|e| e.value))
    }

    async fn cleanup_expired(&self) -> OAuth2Result<usize> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        Ok(before - entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_session_store() {
        let store = InMemorySessionStore::new(300);

        store
            .put("session-1", "__pkce", "verifier123".to_string())
            .await
            .unwrap();

        // Other sessions and keys are isolated
        assert_eq!(store.take("session-2", "__pkce").await.unwrap(), None);
        assert_eq!(store.take("session-1", "other").await.unwrap(), None);

        let value = store.take("session-1", "__pkce").await.unwrap();
        assert_eq!(value.as_deref(), Some("verifier123"));

        // Take again - should be gone
        assert_eq!(store.take("session-1", "__pkce").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_overwrites_pending_value() {
        let store = InMemorySessionStore::default();
        store.put("s", "k", "first".to_string()).await.unwrap();
        store.put("s", "k", "second".to_string()).await.unwrap();

        assert_eq!(store.take("s", "k").await.unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let entry = SessionEntry::new("v".to_string(), u64::MAX);
        assert_eq!(entry.expires_at, DateTime::<Utc>::MAX_UTC);
        assert!(!entry.is_expired());

        let entry = SessionEntry::new("v".to_string(), 600);
        assert_eq!(entry.expires_at - entry.created_at, Duration::seconds(600));
    }

    #[tokio::test]
    async fn test_expired_entry_cleanup() {
        let store = InMemorySessionStore::new(300);

        let mut entry = SessionEntry::new("stale".to_string(), 300);
        // Manually set to expired
        entry.expires_at = Utc::now() - Duration::minutes(1);
        store.insert_entry("s", "k", entry.clone()).await;

        let cleaned = store.cleanup_expired().await.unwrap();
        assert_eq!(cleaned, 1);

        // Expired values are never handed out
        store.insert_entry("s", "k", entry).await;
        assert_eq!(store.take("s", "k").await.unwrap(), None);
    }
}
