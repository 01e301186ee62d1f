use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use axum::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use thiserror::Error;
use tokio::task::JoinHandle;

/// Payload persisted for one session token.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionRecord {
    values: HashMap<String, serde_json::Value>,
}

impl SessionRecord {
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.values.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.values.remove(key)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),
    #[error("failed to encode session value: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("session cookie could not be encoded")]
    InvalidCookie,
    #[error("session handle not found in request context")]
    MissingHandle,
}

/// Backing storage for session payloads, keyed by token.
///
/// Each call is atomic from the caller's point of view. Implementations own
/// their concurrency control and never retry on behalf of the caller.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, token: &str) -> Result<Option<SessionRecord>, SessionError>;

    async fn save(
        &self,
        token: &str,
        record: &SessionRecord,
        expires_at: DateTime<Utc>,
    ) -> Result<(), SessionError>;

    async fn delete(&self, token: &str) -> Result<(), SessionError>;
}

#[derive(Debug)]
struct StoredSession {
    record: SessionRecord,
    expires_at: DateTime<Utc>,
}

/// Process-local store. Expired records are dropped on lookup and by the
/// periodic sweep started with `spawn_sweeper`.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: DashMap<String, StoredSession>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Removes every record that expired at or before `now`, returning how
    /// many were dropped.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, stored| stored.expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    /// Sweeps expired records every `period` until the store is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let store: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let Some(store) = store.upgrade() else {
                    tracing::debug!("Session store dropped, stopping sweeper");
                    break;
                };
                let removed = store.purge_expired(Utc::now());
                if removed > 0 {
                    tracing::debug!(removed, remaining = store.len(), "Swept expired sessions");
                }
            }
        })
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, token: &str) -> Result<Option<SessionRecord>, SessionError> {
        let now = Utc::now();
        if let Some(entry) = self.entries.get(token)
            && entry.expires_at > now
        {
            return Ok(Some(entry.record.clone()));
        }

        self.entries
            .remove_if(token, |_, stored| stored.expires_at <= now);
        Ok(None)
    }

    async fn save(
        &self,
        token: &str,
        record: &SessionRecord,
        expires_at: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        self.entries.insert(
            token.to_string(),
            StoredSession {
                record: record.clone(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, token: &str) -> Result<(), SessionError> {
        self.entries.remove(token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record_with(key: &str, value: &str) -> SessionRecord {
        let mut record = SessionRecord::default();
        record.insert(key, serde_json::Value::from(value));
        record
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = MemorySessionStore::new();
        let record = record_with("flash", "hello");
        store
            .save("abc", &record, Utc::now() + Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(store.load("abc").await.unwrap(), Some(record));
        assert_eq!(store.load("other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_records_are_not_returned() {
        let store = MemorySessionStore::new();
        store
            .save(
                "old",
                &record_with("flash", "stale"),
                Utc::now() - Duration::seconds(1),
            )
            .await
            .unwrap();

        assert_eq!(store.load("old").await.unwrap(), None);
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_purge_drops_only_expired_records() {
        let store = MemorySessionStore::new();
        let now = Utc::now();
        for n in 0..100 {
            store
                .save(&format!("stale-{n}"), &SessionRecord::default(), now - Duration::seconds(1))
                .await
                .unwrap();
        }
        store
            .save("live", &record_with("flash", "fresh"), now + Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(store.purge_expired(now), 100);
        assert_eq!(store.len(), 1);
        assert!(store.load("live").await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_runs_periodically() {
        let store = Arc::new(MemorySessionStore::new());
        store
            .save("stale", &SessionRecord::default(), Utc::now() - Duration::seconds(1))
            .await
            .unwrap();

        let sweeper = store.spawn_sweeper(std::time::Duration::from_secs(60));
        tokio::time::sleep(std::time::Duration::from_secs(61)).await;

        assert_eq!(store.len(), 0);
        sweeper.abort();
    }

    #[tokio::test]
    async fn test_delete_forgets_token() {
        let store = MemorySessionStore::new();
        store
            .save("abc", &SessionRecord::default(), Utc::now() + Duration::hours(1))
            .await
            .unwrap();
        store.delete("abc").await.unwrap();
        assert_eq!(store.load("abc").await.unwrap(), None);
    }
}
