//! Password hashing and bearer-token issuance.
//!
//! Login yields an opaque bearer token (random 32 bytes, base64url). Only
//! a SHA-256 digest of the token is stored, so a leaked table cannot be
//! replayed. Passwords use argon2 with per-password salts.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Minimum password length accepted at registration.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Email or password did not match.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An account with this email already exists.
    #[error("account already exists")]
    AccountExists,

    /// The password does not meet requirements.
    #[error("password must be at least {MIN_PASSWORD_LENGTH} characters")]
    WeakPassword,

    /// The email address is malformed.
    #[error("invalid email address: {0}")]
    InvalidEmail(#[from] aurelia_core::EmailError),

    /// Password hashing failed.
    #[error("password hashing error")]
    Hashing,
}

/// Hash a password for storage.
///
/// # Errors
///
/// Returns [`AuthError::WeakPassword`] for short passwords and
/// [`AuthError::Hashing`] if argon2 fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword);
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::Hashing)
}

/// Verify a password against a stored hash.
///
/// # Errors
///
/// Returns [`AuthError::InvalidCredentials`] on mismatch or a corrupt hash.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<(), AuthError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|_| AuthError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Generate a fresh bearer token and the digest to store for it.
///
/// Returns `(token, digest)`: the token goes to the client once; only the
/// digest is persisted.
#[must_use]
pub fn generate_token() -> (String, String) {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    let token = URL_SAFE_NO_PAD.encode(bytes);
    let digest = token_digest(&token);
    (token, digest)
}

/// SHA-256 digest of a bearer token, hex-encoded, as stored in the
/// `api_token` table.
#[must_use]
pub fn token_digest(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong password", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(matches!(
            hash_password("short"),
            Err(AuthError::WeakPassword)
        ));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("correct horse battery").unwrap();
        let b = hash_password("correct horse battery").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_generate_token_is_unique_and_digestible() {
        let (token_a, digest_a) = generate_token();
        let (token_b, digest_b) = generate_token();
        assert_ne!(token_a, token_b);
        assert_ne!(digest_a, digest_b);
        assert_eq!(token_digest(&token_a), digest_a);
        // 32 bytes base64url without padding
        assert_eq!(token_a.len(), 43);
        // SHA-256 hex
        assert_eq!(digest_a.len(), 64);
    }

    #[test]
    fn test_token_digest_is_deterministic() {
        assert_eq!(token_digest("abc"), token_digest("abc"));
        assert_ne!(token_digest("abc"), token_digest("abd"));
    }
}
