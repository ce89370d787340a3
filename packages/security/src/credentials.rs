// ABOUTME: One-way hashing and verification of secrets
// ABOUTME: Argon2id for passwords, SHA-256 for high-entropy bearer tokens

use std::time::Duration;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Random bytes behind every token plaintext (256 bits)
pub const TOKEN_ENTROPY_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("Credential operation exceeded {0:?}")]
    Timeout(Duration),

    #[error("Hashing task failed: {0}")]
    Task(String),
}

/// Hash a password into a salted Argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CredentialError::Hash(e.to_string()))
}

/// Check a password against a stored PHC string.
///
/// A digest that does not parse is a mismatch, never an error. The Argon2
/// output comparison is constant-time.
pub fn verify_password(password: &str, digest: &str) -> bool {
    match PasswordHash::new(digest) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// `hash_password` on the blocking pool, bounded by `timeout`.
pub async fn hash_password_bounded(
    password: String,
    timeout: Duration,
) -> Result<String, CredentialError> {
    let task = tokio::task::spawn_blocking(move || hash_password(&password));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(CredentialError::Task(join_err.to_string())),
        Err(_) => Err(CredentialError::Timeout(timeout)),
    }
}

/// `verify_password` on the blocking pool, bounded by `timeout`.
pub async fn verify_password_bounded(
    password: String,
    digest: String,
    timeout: Duration,
) -> Result<bool, CredentialError> {
    let task = tokio::task::spawn_blocking(move || verify_password(&password, &digest));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(matches)) => Ok(matches),
        Ok(Err(join_err)) => Err(CredentialError::Task(join_err.to_string())),
        Err(_) => Err(CredentialError::Timeout(timeout)),
    }
}

/// Generate a token plaintext from the OS CSPRNG.
/// Returns a URL-safe base64 string (43 characters).
pub fn generate_token() -> String {
    let mut random_bytes = [0u8; TOKEN_ENTROPY_BYTES];
    OsRng.fill_bytes(&mut random_bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Hash a token plaintext using SHA-256.
/// This is what gets stored in the database
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Verify a token against a stored hash using constant-time comparison.
/// A stored hash of the wrong length simply fails.
pub fn verify_token_hash(token: &str, stored_hash: &str) -> bool {
    let computed_hash = hash_token(token);

    computed_hash
        .as_bytes()
        .ct_eq(stored_hash.as_bytes())
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_roundtrip() {
        let digest = hash_password("pa55word-long").unwrap();

        assert!(digest.starts_with("$argon2id$"));
        assert!(verify_password("pa55word-long", &digest));
        assert!(!verify_password("pa55word-wrong", &digest));
    }

    #[test]
    fn test_password_hash_is_salted() {
        let first = hash_password("same password").unwrap();
        let second = hash_password("same password").unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_malformed_digest_fails_closed() {
        assert!(!verify_password("anything", ""));
        assert!(!verify_password("anything", "not-a-phc-string"));
        assert!(!verify_password("anything", "$argon2id$v=19$garbage"));
    }

    #[tokio::test]
    async fn test_bounded_hash_and_verify() {
        let timeout = Duration::from_secs(30);
        let digest = hash_password_bounded("bounded secret".into(), timeout)
            .await
            .unwrap();

        let ok = verify_password_bounded("bounded secret".into(), digest.clone(), timeout)
            .await
            .unwrap();
        let bad = verify_password_bounded("other secret".into(), digest, timeout)
            .await
            .unwrap();

        assert!(ok);
        assert!(!bad);
    }

    #[test]
    fn test_generate_token_produces_unique_values() {
        let token1 = generate_token();
        let token2 = generate_token();

        assert_ne!(token1, token2);
        assert_eq!(token1.len(), 43); // Base64 of 32 bytes without padding
    }

    #[test]
    fn test_hash_token_is_deterministic() {
        let hash1 = hash_token("test-token-123");
        let hash2 = hash_token("test-token-123");

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64); // SHA-256 produces 64 hex chars
        assert_ne!(hash1, hash_token("test-token-456"));
    }

    #[test]
    fn test_verify_token_hash() {
        let hash = hash_token("test-token-123");

        assert!(verify_token_hash("test-token-123", &hash));
        assert!(!verify_token_hash("test-token-456", &hash));
        assert!(!verify_token_hash("test-token-123", &hash[..10]));
        assert!(!verify_token_hash("test-token-123", ""));
    }
}
