// ABOUTME: Cryptographic primitives for the credential server
// ABOUTME: Token generation, password hashing, symmetric encryption and chain hashing

//! Cryptographic building blocks (§4.1 of the design).
//!
//! Nothing here touches the store or the SSH certificate authority; those
//! layer on top of the primitives exposed here.

/// Random bearer-token generation.
pub mod token;
/// Argon2id hashing and constant-time verification of bearer tokens.
pub mod password;
/// AES-256-GCM encryption of deploy keys, MFA secrets and the CA private key.
pub mod cipher;
/// SHA-256 hex hashing used by the audit chain.
pub mod hash;

pub use cipher::MasterKey;
pub use password::{hash_token, verify_token};
pub use token::generate_token;
