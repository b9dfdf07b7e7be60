//! Password hashing for registered accounts.
//!
//! bcrypt is CPU-bound, so both operations run on the blocking pool.

use secrecy::{ExposeSecret, SecretString};

use crate::error::AuthError;

fn cost() -> u32 {
    // Use a lower cost factor for development speed
    if cfg!(debug_assertions) {
        4
    } else {
        bcrypt::DEFAULT_COST
    }
}

/// Hash a password using bcrypt.
pub async fn hash_password(password: &SecretString) -> Result<String, AuthError> {
    let plain = password.expose_secret().to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(plain, cost()))
        .await
        .map_err(|e| AuthError::Hash(format!("hashing task failed: {e}")))?
        .map_err(|e| AuthError::Hash(e.to_string()))
}

/// Verify a password against a bcrypt hash.
pub async fn verify_password(password: &SecretString, hash: &str) -> Result<bool, AuthError> {
    let plain = password.expose_secret().to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(plain, &hash))
        .await
        .map_err(|e| AuthError::Hash(format!("verification task failed: {e}")))?
        .map_err(|e| AuthError::Hash(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    #[tokio::test]
    async fn hash_then_verify() {
        let hash = hash_password(&secret("Driver123")).await.unwrap();
        assert_ne!(hash, "Driver123");
        assert!(hash.starts_with("$2"));

        assert!(verify_password(&secret("Driver123"), &hash).await.unwrap());
        assert!(!verify_password(&secret("driver123"), &hash).await.unwrap());
    }

    #[tokio::test]
    async fn same_password_hashes_differently() {
        let a = hash_password(&secret("x")).await.unwrap();
        let b = hash_password(&secret("x")).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn garbage_hash_is_an_error() {
        assert!(verify_password(&secret("x"), "not-a-hash").await.is_err());
    }
}
