pub mod snippet;
pub mod user;

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

use crate::security::password::PasswordError;

pub use snippet::{PgSnippetStore, Snippet, SnippetStore};
pub use user::{PgUserStore, UserStore};

/// Unique constraint guarding `users.email`.
pub const USERS_EMAIL_CONSTRAINT: &str = "users_uc_email";

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("no matching record found")]
    NoRecord,
    #[error("email address is already registered")]
    DuplicateEmail,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("database error")]
    Database(#[source] DieselError),
    #[error("connection pool error: {0}")]
    Pool(String),
    #[error(transparent)]
    Password(#[from] PasswordError),
}

impl ModelError {
    pub fn from_diesel(error: DieselError) -> Self {
        match error {
            DieselError::NotFound => ModelError::NoRecord,
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
                if info.constraint_name() == Some(USERS_EMAIL_CONSTRAINT) =>
            {
                ModelError::DuplicateEmail
            }
            other => ModelError::Database(other),
        }
    }

    pub fn pool(error: impl std::fmt::Display) -> Self {
        ModelError::Pool(error.to_string())
    }
}

pub type ModelResult<T> = Result<T, ModelError>;
