mod config;
mod db;
mod errors;
mod forms;
mod logging;
mod models;
mod routes;
mod schema;
mod security;
mod session;
#[cfg(test)]
mod testing;
mod views;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{Router, serve};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use config::Config;
use db::establish_pool;
use models::{PgSnippetStore, PgUserStore};
use routes::{AppState, RouterOptions, create_router};
use session::{MemorySessionStore, SessionManager};

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let pool = establish_pool(&config.database_url).await?;

    if !security::password::prepare_dummy_hash().await? {
        tracing::warn!("Placeholder password hash unavailable; unknown-email logins will be faster");
    }

    let state = AppState {
        snippets: Arc::new(PgSnippetStore::new(pool.clone())),
        users: Arc::new(PgUserStore::new(pool)),
    };

    let session_store = Arc::new(MemorySessionStore::new());
    session_store.spawn_sweeper(SESSION_SWEEP_INTERVAL);
    let sessions = SessionManager::new(
        session_store,
        config.session_lifetime,
        config.secure_cookies,
    );

    let router: Router = create_router(
        state,
        sessions,
        RouterOptions {
            trust_proxy_headers: config.trust_proxy_headers,
        },
    );

    let app = router.into_make_service_with_connect_info::<SocketAddr>();

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "Starting server");

    serve(listener, app).await?;

    Ok(())
}
