use axum::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::{ModelError, ModelResult};
use crate::db::PgPool;
use crate::schema::snippets;

/// Number of snippets shown on the home page.
pub const LATEST_LIMIT: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = snippets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Snippet {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = snippets)]
struct NewSnippet<'a> {
    title: &'a str,
    content: &'a str,
    created: DateTime<Utc>,
    expires: DateTime<Utc>,
}

#[async_trait]
pub trait SnippetStore: Send + Sync {
    /// Stores a snippet expiring `expires_days` from now and returns its id.
    async fn insert(&self, title: &str, content: &str, expires_days: i64) -> ModelResult<i64>;

    /// Fetches an unexpired snippet, or `ModelError::NoRecord`.
    async fn get(&self, id: i64) -> ModelResult<Snippet>;

    /// The most recent unexpired snippets, newest first.
    async fn latest(&self) -> ModelResult<Vec<Snippet>>;
}

#[derive(Clone)]
pub struct PgSnippetStore {
    pool: PgPool,
}

impl PgSnippetStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnippetStore for PgSnippetStore {
    #[tracing::instrument(name = "snippet_insert", skip(self, title, content))]
    async fn insert(&self, title: &str, content: &str, expires_days: i64) -> ModelResult<i64> {
        let created = Utc::now();
        let new_snippet = NewSnippet {
            title,
            content,
            created,
            expires: created + ChronoDuration::days(expires_days),
        };

        let mut conn = self.pool.get().await.map_err(ModelError::pool)?;

        diesel::insert_into(snippets::table)
            .values(&new_snippet)
            .returning(snippets::id)
            .get_result(&mut conn)
            .await
            .map_err(ModelError::from_diesel)
    }

    async fn get(&self, id: i64) -> ModelResult<Snippet> {
        let mut conn = self.pool.get().await.map_err(ModelError::pool)?;

        snippets::table
            .filter(snippets::id.eq(id))
            .filter(snippets::expires.gt(Utc::now()))
            .select(Snippet::as_select())
            .first(&mut conn)
            .await
            .map_err(ModelError::from_diesel)
    }

    async fn latest(&self) -> ModelResult<Vec<Snippet>> {
        let mut conn = self.pool.get().await.map_err(ModelError::pool)?;

        snippets::table
            .filter(snippets::expires.gt(Utc::now()))
            .order(snippets::id.desc())
            .limit(LATEST_LIMIT)
            .select(Snippet::as_select())
            .load(&mut conn)
            .await
            .map_err(ModelError::from_diesel)
    }
}
