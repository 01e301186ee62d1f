use axum::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use super::{ModelError, ModelResult};
use crate::db::PgPool;
use crate::logging::{LoggableUuid, SanitizedEmail};
use crate::schema::users;
use crate::security::password::{hash_password, verify_password};

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
struct NewUser<'a> {
    id: Uuid,
    name: &'a str,
    email: &'a str,
    hashed_password: &'a str,
    created: DateTime<Utc>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Creates an account; `ModelError::DuplicateEmail` when the address is taken.
    async fn insert(&self, name: &str, email: &str, password: &str) -> ModelResult<()>;

    /// Returns the account id when the credentials match, otherwise
    /// `ModelError::InvalidCredentials` whichever half was wrong.
    async fn authenticate(&self, email: &str, password: &str) -> ModelResult<Uuid>;

    async fn exists(&self, id: Uuid) -> ModelResult<bool>;
}

/// Emails are stored and compared trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    #[tracing::instrument(name = "user_insert", skip_all)]
    async fn insert(&self, name: &str, email: &str, password: &str) -> ModelResult<()> {
        let email = normalize_email(email);
        let hashed_password = hash_password(password.to_string()).await?;

        let new_user = NewUser {
            id: Uuid::new_v4(),
            name: name.trim(),
            email: &email,
            hashed_password: &hashed_password,
            created: Utc::now(),
        };

        let mut conn = self.pool.get().await.map_err(ModelError::pool)?;

        diesel::insert_into(users::table)
            .values(&new_user)
            .execute(&mut conn)
            .await
            .map_err(ModelError::from_diesel)?;

        tracing::debug!(
            user_id = %LoggableUuid(new_user.id),
            email = %SanitizedEmail::new(&email),
            "User row inserted"
        );
        Ok(())
    }

    #[tracing::instrument(name = "user_authenticate", skip_all)]
    async fn authenticate(&self, email: &str, password: &str) -> ModelResult<Uuid> {
        let email = normalize_email(email);
        let mut conn = self.pool.get().await.map_err(ModelError::pool)?;

        let account: Option<(Uuid, String)> = users::table
            .filter(users::email.eq(&email))
            .select((users::id, users::hashed_password))
            .first(&mut conn)
            .await
            .optional()
            .map_err(ModelError::from_diesel)?;

        let (id, stored_hash) = account.unzip();
        let verified = verify_password(password.to_string(), stored_hash).await?;

        match id {
            Some(id) if verified => Ok(id),
            _ => Err(ModelError::InvalidCredentials),
        }
    }

    async fn exists(&self, id: Uuid) -> ModelResult<bool> {
        let mut conn = self.pool.get().await.map_err(ModelError::pool)?;

        diesel::select(diesel::dsl::exists(users::table.filter(users::id.eq(id))))
            .get_result(&mut conn)
            .await
            .map_err(ModelError::from_diesel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }
}
