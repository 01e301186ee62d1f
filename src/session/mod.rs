//! Cookie-keyed server-side sessions.
//!
//! `manage_sessions` loads the session before the handler runs and commits it
//! afterwards. Handlers receive an explicit `Session` handle; every clone of a
//! handle observes the same state for the lifetime of one request.

pub mod store;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{
        HeaderMap, HeaderValue, Request,
        header::{CACHE_CONTROL, COOKIE, SET_COOKIE, VARY},
        request::Parts,
    },
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use rand_core::{OsRng, RngCore};
use serde::{Serialize, de::DeserializeOwned};

use crate::errors::AppError;

pub use store::{MemorySessionStore, SessionError, SessionRecord, SessionStore};

pub const SESSION_COOKIE_NAME: &str = "session";
pub const FLASH_KEY: &str = "flash";
pub const AUTHENTICATED_USER_ID_KEY: &str = "authenticatedUserID";

const TOKEN_BYTES: usize = 32;

#[derive(Debug)]
struct SessionState {
    token: Option<String>,
    record: SessionRecord,
    modified: bool,
}

/// Request-scoped handle onto one session.
#[derive(Clone)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
    store: Arc<dyn SessionStore>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("Session")
            .field("has_token", &state.token.is_some())
            .field("modified", &state.modified)
            .finish()
    }
}

impl Session {
    pub fn new(store: Arc<dyn SessionStore>, token: Option<String>, record: SessionRecord) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState {
                token,
                record,
                modified: false,
            })),
            store,
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn token(&self) -> Option<String> {
        self.state().token.clone()
    }

    pub fn put<T: Serialize>(&self, key: &str, value: T) -> Result<(), SessionError> {
        let value = serde_json::to_value(value)?;
        let mut state = self.state();
        state.record.insert(key, value);
        state.modified = true;
        Ok(())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.state().record.get(key).cloned()?;
        serde_json::from_value(value).ok()
    }

    pub fn remove(&self, key: &str) {
        let mut state = self.state();
        if state.record.remove(key).is_some() {
            state.modified = true;
        }
    }

    /// Reads a value and clears it, so it is delivered at most once.
    pub fn pop<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = {
            let mut state = self.state();
            let value = state.record.remove(key)?;
            state.modified = true;
            value
        };
        serde_json::from_value(value).ok()
    }

    /// Invalidates the current token in the store and issues a fresh one.
    /// The payload is carried over to the new token.
    pub async fn renew_token(&self) -> Result<(), SessionError> {
        let previous = self.token();
        if let Some(previous) = previous {
            self.store.delete(&previous).await?;
        }

        let mut state = self.state();
        state.token = Some(generate_token());
        state.modified = true;
        tracing::debug!("Session token renewed");
        Ok(())
    }

    /// Persists a modified session. Returns the token the client must be
    /// given, or `None` when nothing changed.
    pub async fn commit(&self, expires_at: DateTime<Utc>) -> Result<Option<String>, SessionError> {
        let (token, record) = {
            let mut state = self.state();
            if !state.modified {
                return Ok(None);
            }
            let token = state.token.get_or_insert_with(generate_token).clone();
            state.modified = false;
            (token, state.record.clone())
        };

        self.store.save(&token, &record, expires_at).await?;
        Ok(Some(token))
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    lifetime: Duration,
    secure: bool,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, lifetime: Duration, secure: bool) -> Self {
        Self {
            store,
            lifetime,
            secure,
        }
    }

    /// Resolves the session named by the request cookie. Unknown or expired
    /// tokens start an empty session that will receive a new token.
    pub async fn load(&self, headers: &HeaderMap) -> Result<Session, SessionError> {
        if let Some(token) = token_from_headers(headers)
            && let Some(record) = self.store.load(&token).await?
        {
            return Ok(Session::new(self.store.clone(), Some(token), record));
        }

        Ok(Session::new(
            self.store.clone(),
            None,
            SessionRecord::default(),
        ))
    }

    fn expires_at(&self) -> DateTime<Utc> {
        let lifetime = chrono::Duration::from_std(self.lifetime).unwrap_or(chrono::Duration::zero());
        Utc::now() + lifetime
    }

    fn cookie(&self, token: &str) -> Result<HeaderValue, SessionError> {
        let secure = if self.secure { "; Secure" } else { "" };
        let cookie = format!(
            "{SESSION_COOKIE_NAME}={token}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax{secure}",
            self.lifetime.as_secs()
        );
        HeaderValue::from_str(&cookie).map_err(|_| SessionError::InvalidCookie)
    }
}

fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE_NAME)
        .map(|(_, token)| token.to_string())
        .filter(|token| !token.is_empty())
}

pub async fn manage_sessions(
    State(manager): State<SessionManager>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let session = manager.load(request.headers()).await?;
    request.extensions_mut().insert(session.clone());

    let mut response = next.run(request).await;

    if let Some(token) = session.commit(manager.expires_at()).await? {
        let headers = response.headers_mut();
        headers.append(SET_COOKIE, manager.cookie(&token)?);
        headers
            .entry(CACHE_CONTROL)
            .or_insert(HeaderValue::from_static(r#"no-cache="Set-Cookie""#));
    }
    response
        .headers_mut()
        .append(VARY, HeaderValue::from_static("Cookie"));

    Ok(response)
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AppError::Session(SessionError::MissingHandle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingSessionStore, StoreCall};

    fn fresh_session(store: Arc<dyn SessionStore>) -> Session {
        Session::new(store, None, SessionRecord::default())
    }

    #[test]
    fn test_flash_is_delivered_once() {
        let session = fresh_session(Arc::new(MemorySessionStore::new()));
        session.put(FLASH_KEY, "Snippet successfully created!").unwrap();

        assert_eq!(
            session.pop::<String>(FLASH_KEY).as_deref(),
            Some("Snippet successfully created!")
        );
        assert_eq!(session.pop::<String>(FLASH_KEY), None);
    }

    #[tokio::test]
    async fn test_reads_do_not_mark_modified() {
        let store = Arc::new(RecordingSessionStore::default());
        let session = fresh_session(store.clone());
        assert_eq!(session.get::<String>(FLASH_KEY), None);
        assert_eq!(session.pop::<String>(FLASH_KEY), None);
        session.remove(AUTHENTICATED_USER_ID_KEY);

        assert_eq!(session.commit(Utc::now()).await.unwrap(), None);
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_renew_token_keeps_payload_and_drops_old_token() {
        let store = Arc::new(RecordingSessionStore::default());
        let mut record = SessionRecord::default();
        record.insert(FLASH_KEY, serde_json::Value::from("kept"));
        let session = Session::new(store.clone(), Some("old-token".into()), record);

        session.renew_token().await.unwrap();

        let renewed = session.token().unwrap();
        assert_ne!(renewed, "old-token");
        assert_eq!(renewed.len(), TOKEN_BYTES * 2);
        assert_eq!(session.get::<String>(FLASH_KEY).as_deref(), Some("kept"));
        assert_eq!(store.calls(), vec![StoreCall::Delete("old-token".into())]);
    }

    #[tokio::test]
    async fn test_renew_token_failure_leaves_token_untouched() {
        let store = Arc::new(RecordingSessionStore::failing());
        let session = Session::new(store, Some("old-token".into()), SessionRecord::default());

        assert!(session.renew_token().await.is_err());
        assert_eq!(session.token().as_deref(), Some("old-token"));
    }

    #[tokio::test]
    async fn test_commit_skips_unmodified_sessions() {
        let store = Arc::new(RecordingSessionStore::default());
        let session = Session::new(store.clone(), Some("tok".into()), SessionRecord::default());

        assert_eq!(session.commit(Utc::now()).await.unwrap(), None);
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_commit_issues_token_for_new_sessions() {
        let store = Arc::new(RecordingSessionStore::default());
        let session = fresh_session(store.clone());
        session.put(FLASH_KEY, "hi").unwrap();

        let token = session.commit(Utc::now()).await.unwrap().unwrap();
        assert_eq!(session.token(), Some(token.clone()));
        assert!(matches!(&store.calls()[..], [StoreCall::Save(saved, _)] if *saved == token));
    }

    #[tokio::test]
    async fn test_manager_loads_session_from_cookie() {
        let store = Arc::new(MemorySessionStore::new());
        let manager = SessionManager::new(store.clone(), Duration::from_secs(60), false);

        let seeded = fresh_session(store.clone());
        seeded.put(FLASH_KEY, "from store").unwrap();
        let token = seeded.commit(Utc::now() + chrono::Duration::minutes(1)).await.unwrap().unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {SESSION_COOKIE_NAME}={token}")).unwrap(),
        );

        let loaded = manager.load(&headers).await.unwrap();
        assert_eq!(loaded.token(), Some(token));
        assert_eq!(loaded.pop::<String>(FLASH_KEY).as_deref(), Some("from store"));
    }

    #[tokio::test]
    async fn test_manager_ignores_unknown_tokens() {
        let manager = SessionManager::new(
            Arc::new(MemorySessionStore::new()),
            Duration::from_secs(60),
            false,
        );
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("session=attacker-chosen"),
        );

        let loaded = manager.load(&headers).await.unwrap();
        assert_eq!(loaded.token(), None);
    }

    #[test]
    fn test_cookie_attributes() {
        let manager = SessionManager::new(
            Arc::new(MemorySessionStore::new()),
            Duration::from_secs(43_200),
            true,
        );
        let cookie = manager.cookie("abc").unwrap();
        assert_eq!(
            cookie.to_str().unwrap(),
            "session=abc; Path=/; Max-Age=43200; HttpOnly; SameSite=Lax; Secure"
        );
    }
}
