//! Password hashing and session token primitives.
//!
//! - Passwords: bcrypt with a configurable cost (validated 10-14)
//! - Session tokens: 32 bytes from the ring CSPRNG, hex-encoded for the client
//! - Only the SHA-256 digest of a session token is ever stored

use crate::config::{MAX_BCRYPT_COST, MIN_BCRYPT_COST};
use crate::errors::ScError;
use common::secret::{ExposeSecret, SecretString};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use tracing::instrument;

/// Length of a session token in random bytes (256 bits).
pub const SESSION_TOKEN_BYTES: usize = 32;

/// Hash a password with bcrypt.
///
/// The cost is re-validated here even though `Config` already checks it.
#[instrument(skip_all)]
pub fn hash_password(password: &SecretString, cost: u32) -> Result<String, ScError> {
    if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
        return Err(ScError::Internal(format!(
            "Invalid bcrypt cost: {} (must be {}-{})",
            cost, MIN_BCRYPT_COST, MAX_BCRYPT_COST
        )));
    }

    bcrypt::hash(password.expose_secret(), cost)
        .map_err(|e| ScError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against a bcrypt hash.
#[instrument(skip_all)]
pub fn verify_password(password: &SecretString, hash: &str) -> Result<bool, ScError> {
    bcrypt::verify(password.expose_secret(), hash)
        .map_err(|e| ScError::Internal(format!("Password verification failed: {}", e)))
}

/// Generate cryptographically secure random bytes.
pub fn generate_random_bytes(len: usize) -> Result<Vec<u8>, ScError> {
    let rng = SystemRandom::new();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes).map_err(|e| {
        tracing::error!(target: "sc.crypto", error = %e, "Failed to generate random bytes");
        ScError::Internal("RNG failure".to_string())
    })?;
    Ok(bytes)
}

/// Generate a new opaque session token (64 hex characters).
pub fn generate_session_token() -> Result<SecretString, ScError> {
    let bytes = generate_random_bytes(SESSION_TOKEN_BYTES)?;
    Ok(SecretString::from(hex::encode(bytes)))
}

/// SHA-256 digest of a session token, hex-encoded.
///
/// This is the value stored in `sessions.token_hash` and used for lookups.
pub fn hash_session_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(digest)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_password() {
        let password = SecretString::from("kata-sandi-123");
        let hash = hash_password(&password, MIN_BCRYPT_COST).unwrap();

        assert!(hash.starts_with("$2b$10$"));
        assert!(verify_password(&password, &hash).unwrap());
        assert!(!verify_password(&SecretString::from("salah"), &hash).unwrap());
    }

    #[test]
    fn test_hash_password_rejects_weak_cost() {
        let password = SecretString::from("kata-sandi-123");
        let result = hash_password(&password, 4);
        assert!(matches!(result, Err(ScError::Internal(msg)) if msg.contains("Invalid bcrypt cost")));
    }

    #[test]
    fn test_verify_against_malformed_hash_errors() {
        let result = verify_password(&SecretString::from("x"), "not-a-bcrypt-hash");
        assert!(result.is_err());
    }

    #[test]
    fn test_session_token_format() {
        let token = generate_session_token().unwrap();
        let value = token.expose_secret();
        assert_eq!(value.len(), SESSION_TOKEN_BYTES * 2);
        assert!(value.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_session_tokens_are_unique() {
        let a = generate_session_token().unwrap();
        let b = generate_session_token().unwrap();
        assert_ne!(a.expose_secret(), b.expose_secret());
    }

    #[test]
    fn test_hash_session_token_is_stable_sha256() {
        // SHA-256("abc")
        assert_eq!(
            hash_session_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(hash_session_token("abc"), hash_session_token("abc"));
        assert_ne!(hash_session_token("abc"), hash_session_token("abd"));
    }
}
