// ABOUTME: Argon2id hashing and verification for bearer tokens
// ABOUTME: Stored hash is a self-describing PHC string; verification is constant-time

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;

use crate::errors::AppError;

/// `t=3, m=64 MiB, p=4`, 32-byte output, per §4.1.
fn params() -> Params {
    #[allow(clippy::unwrap_used)]
    Params::new(64 * 1024, 3, 4, Some(32)).unwrap()
}

fn hasher() -> Argon2<'static> {
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params())
}

/// Hash a bearer token (invite token, session token, or the admin token) as
/// an Argon2id PHC string suitable for storage.
///
/// # Errors
/// Returns `AppError::Internal` if hashing fails, which only happens on
/// allocation failure or an invalid parameter combination.
pub fn hash_token(token: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    hasher()
        .hash_password(token.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(AppError::internal)
}

/// Verify a candidate token against a stored Argon2id PHC string. Parameters
/// are parsed from the stored hash itself, so this also verifies tokens
/// hashed under older parameter sets. Comparison is constant-time: it is
/// performed by the `argon2` crate's `PasswordVerifier`, which compares the
/// computed and stored digests with a fixed-time equality check.
#[must_use]
pub fn verify_token(token: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(token.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let hash = hash_token("s3cr3t-token").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_token("s3cr3t-token", &hash));
        assert!(!verify_token("wrong-token", &hash));
    }

    #[test]
    fn malformed_hash_is_rejected_not_panicked() {
        assert!(!verify_token("anything", "not-a-phc-string"));
    }
}
