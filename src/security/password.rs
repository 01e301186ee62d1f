use std::sync::LazyLock;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand_core::OsRng;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hashing(String),
    #[error("password worker failed: {0}")]
    Worker(String),
}

/// Hash checked when no account matches, so an unknown email costs the same
/// argon2 work as a wrong password.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_blocking("timing-equalizer-placeholder").ok());

/// Builds the placeholder hash up front so the first unknown-email login
/// costs no more than later ones. Returns whether a placeholder is available.
pub async fn prepare_dummy_hash() -> Result<bool, PasswordError> {
    tokio::task::spawn_blocking(|| LazyLock::force(&DUMMY_HASH).is_some())
        .await
        .map_err(|err| PasswordError::Worker(err.to_string()))
}

fn hash_blocking(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| PasswordError::Hashing(err.to_string()))
}

fn verify_blocking(password: &str, stored_hash: Option<&str>) -> bool {
    let account_known = stored_hash.is_some();
    let Some(candidate) = stored_hash.or(DUMMY_HASH.as_deref()) else {
        return false;
    };

    let matched = PasswordHash::new(candidate)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false);

    account_known && matched
}

pub async fn hash_password(password: String) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash_blocking(&password))
        .await
        .map_err(|err| PasswordError::Worker(err.to_string()))?
}

/// Checks `password` against `stored_hash`. A missing hash is verified
/// against a placeholder and always fails.
pub async fn verify_password(
    password: String,
    stored_hash: Option<String>,
) -> Result<bool, PasswordError> {
    tokio::task::spawn_blocking(move || verify_blocking(&password, stored_hash.as_deref()))
        .await
        .map_err(|err| PasswordError::Worker(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hash = hash_password("correct horse".to_string()).await.unwrap();
        assert!(hash.starts_with("$argon2"));

        assert!(
            verify_password("correct horse".to_string(), Some(hash.clone()))
                .await
                .unwrap()
        );
        assert!(
            !verify_password("wrong horse".to_string(), Some(hash))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_unknown_account_never_verifies() {
        assert!(
            !verify_password("timing-equalizer-placeholder".to_string(), None)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_dummy_hash_is_prepared() {
        assert!(prepare_dummy_hash().await.unwrap());
        assert!(DUMMY_HASH.as_deref().is_some_and(|hash| hash.starts_with("$argon2")));
    }

    #[test]
    fn test_malformed_hash_does_not_verify() {
        assert!(!verify_blocking("anything", Some("not-a-phc-string")));
    }

    #[test]
    fn test_hashes_are_salted() {
        let first = hash_blocking("same password").unwrap();
        let second = hash_blocking("same password").unwrap();
        assert_ne!(first, second);
    }
}
