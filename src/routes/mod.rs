use std::sync::Arc;

use axum::{Extension, Router, extract::DefaultBodyLimit, middleware};

use crate::models::{SnippetStore, UserStore};
use crate::security::form::MAX_BODY_SIZE_BYTES;
use crate::security::headers::set_security_headers;
use crate::session::{SessionManager, manage_sessions};

pub mod auth;
pub mod snippets;

/// Stores shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub snippets: Arc<dyn SnippetStore>,
    pub users: Arc<dyn UserStore>,
}

/// Deployment switches that shape the router.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouterOptions {
    pub trust_proxy_headers: bool,
}

pub fn create_router(state: AppState, sessions: SessionManager, options: RouterOptions) -> Router {
    tracing::debug!(?options, "Creating application router");
    Router::new()
        .merge(snippets::router())
        .merge(auth::router(options.trust_proxy_headers))
        .layer(middleware::from_fn_with_state(sessions, manage_sessions))
        .layer(middleware::from_fn(set_security_headers))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE_BYTES))
        .layer(Extension(state))
}
