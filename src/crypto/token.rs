// ABOUTME: Cryptographically secure random token generation
// ABOUTME: Invite tokens carry 24 bytes of entropy, session tokens 32

use base64::{engine::general_purpose, Engine};
use rand::RngCore;

/// Generate a random token with `entropy_bytes` of entropy, base64-url
/// encoded without padding.
#[must_use]
pub fn generate_token(entropy_bytes: usize) -> String {
    let mut buf = vec![0u8; entropy_bytes];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

/// Entropy used for one-time invite tokens.
pub const INVITE_TOKEN_BYTES: usize = 24;
/// Entropy used for session bearer tokens.
pub const SESSION_TOKEN_BYTES: usize = 32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_and_unpadded() {
        let a = generate_token(SESSION_TOKEN_BYTES);
        let b = generate_token(SESSION_TOKEN_BYTES);
        assert_ne!(a, b);
        assert!(!a.contains('='));
        assert!(!a.contains('+'));
        assert!(!a.contains('/'));
    }

    #[test]
    fn invite_token_decodes_to_expected_length() {
        let token = generate_token(INVITE_TOKEN_BYTES);
        let decoded = general_purpose::URL_SAFE_NO_PAD.decode(token).unwrap();
        assert_eq!(decoded.len(), INVITE_TOKEN_BYTES);
    }
}
