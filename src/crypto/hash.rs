// ABOUTME: SHA-256 hex hashing used by the audit chain
// ABOUTME: A thin wrapper so callers never reach for sha2 directly

use sha2::{Digest, Sha256};

/// SHA-256 of `input`, returned as a lowercase hex string.
#[must_use]
pub fn sha256_hex(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(digest)
}

/// Constant-time comparison of two hex digest strings.
///
/// Hash comparisons for the audit chain are not secret-dependent in the same
/// sense bearer tokens are, but tamper verification should not leak timing
/// information about where a chain first diverges either.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    use subtle::ConstantTimeEq;
    a.len() == b.len() && a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        assert_eq!(
            sha256_hex(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b85"
        );
    }

    #[test]
    fn constant_time_eq_matches_normal_eq() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "ab"));
    }
}
