//! In-memory stand-ins for the stores, used by unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use uuid::Uuid;

use crate::models::user::normalize_email;
use crate::models::{ModelError, ModelResult, Snippet, SnippetStore, UserStore};
use crate::routes::AppState;
use crate::security::password::{hash_password, verify_password};
use crate::session::{SessionError, SessionRecord, SessionStore};

#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Load(String),
    Save(String, SessionRecord),
    Delete(String),
}

/// Session store that records every call in order. A failing store rejects
/// every operation as unavailable.
#[derive(Debug, Default)]
pub struct RecordingSessionStore {
    calls: Mutex<Vec<StoreCall>>,
    records: Mutex<HashMap<String, SessionRecord>>,
    fail: bool,
}

impl RecordingSessionStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record_call(&self, call: StoreCall) -> Result<(), SessionError> {
        self.calls.lock().unwrap().push(call);
        if self.fail {
            return Err(SessionError::Unavailable("store offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for RecordingSessionStore {
    async fn load(&self, token: &str) -> Result<Option<SessionRecord>, SessionError> {
        self.record_call(StoreCall::Load(token.to_string()))?;
        Ok(self.records.lock().unwrap().get(token).cloned())
    }

    async fn save(
        &self,
        token: &str,
        record: &SessionRecord,
        _expires_at: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        self.record_call(StoreCall::Save(token.to_string(), record.clone()))?;
        self.records
            .lock()
            .unwrap()
            .insert(token.to_string(), record.clone());
        Ok(())
    }

    async fn delete(&self, token: &str) -> Result<(), SessionError> {
        self.record_call(StoreCall::Delete(token.to_string()))?;
        self.records.lock().unwrap().remove(token);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemorySnippetStore {
    snippets: Mutex<Vec<Snippet>>,
    fail_inserts: bool,
}

impl MemorySnippetStore {
    /// Store whose inserts fail as if the database were unreachable.
    pub fn failing() -> Self {
        Self {
            fail_inserts: true,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.snippets.lock().unwrap().len()
    }
}

#[async_trait]
impl SnippetStore for MemorySnippetStore {
    async fn insert(&self, title: &str, content: &str, expires_days: i64) -> ModelResult<i64> {
        if self.fail_inserts {
            return Err(ModelError::Pool("connection refused".into()));
        }
        let mut snippets = self.snippets.lock().unwrap();
        let id = snippets.len() as i64 + 1;
        let created = Utc::now();
        snippets.push(Snippet {
            id,
            title: title.to_string(),
            content: content.to_string(),
            created,
            expires: created + ChronoDuration::days(expires_days),
        });
        Ok(id)
    }

    async fn get(&self, id: i64) -> ModelResult<Snippet> {
        let now = Utc::now();
        self.snippets
            .lock()
            .unwrap()
            .iter()
            .find(|snippet| snippet.id == id && snippet.expires > now)
            .cloned()
            .ok_or(ModelError::NoRecord)
    }

    async fn latest(&self) -> ModelResult<Vec<Snippet>> {
        let now = Utc::now();
        let snippets = self.snippets.lock().unwrap();
        Ok(snippets
            .iter()
            .rev()
            .filter(|snippet| snippet.expires > now)
            .take(crate::models::snippet::LATEST_LIMIT as usize)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Clone)]
struct StoredUser {
    id: Uuid,
    email: String,
    hashed_password: String,
}

/// User store with the same credential semantics as the Postgres one.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<StoredUser>>,
}

impl MemoryUserStore {
    pub fn len(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    pub fn remove_all(&self) {
        self.users.lock().unwrap().clear();
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, _name: &str, email: &str, password: &str) -> ModelResult<()> {
        let email = normalize_email(email);
        if self.users.lock().unwrap().iter().any(|user| user.email == email) {
            return Err(ModelError::DuplicateEmail);
        }

        let hashed_password = hash_password(password.to_string()).await?;
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|user| user.email == email) {
            return Err(ModelError::DuplicateEmail);
        }
        users.push(StoredUser {
            id: Uuid::new_v4(),
            email,
            hashed_password,
        });
        Ok(())
    }

    async fn authenticate(&self, email: &str, password: &str) -> ModelResult<Uuid> {
        let email = normalize_email(email);
        let account = self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|user| user.email == email)
            .cloned();

        let (id, stored_hash) = account
            .map(|user| (user.id, user.hashed_password))
            .unzip();
        let verified = verify_password(password.to_string(), stored_hash).await?;

        match id {
            Some(id) if verified => Ok(id),
            _ => Err(ModelError::InvalidCredentials),
        }
    }

    async fn exists(&self, id: Uuid) -> ModelResult<bool> {
        Ok(self.users.lock().unwrap().iter().any(|user| user.id == id))
    }
}

pub struct TestApp {
    pub state: AppState,
    pub snippets: Arc<MemorySnippetStore>,
    pub users: Arc<MemoryUserStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_snippet_store(MemorySnippetStore::default())
    }

    pub fn with_snippet_store(snippets: MemorySnippetStore) -> Self {
        let snippets = Arc::new(snippets);
        let users = Arc::new(MemoryUserStore::default());
        let state = AppState {
            snippets: snippets.clone(),
            users: users.clone(),
        };
        Self {
            state,
            snippets,
            users,
        }
    }
}
