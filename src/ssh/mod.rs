// ABOUTME: SSH key and certificate handling, built on the `ssh-key` crate
// ABOUTME: Covers Ed25519 key-pair generation and the Certificate Authority (§4.2)

//! SSH Certificate Authority (C2).

/// Ed25519 key-pair generation and OpenSSH encoding.
pub mod keypair;
/// Certificate Authority: signing key lifecycle, minting, renewal.
pub mod ca;

pub use ca::{CertInfo, CertificateAuthority, MintedCertificate};
pub use keypair::GeneratedKeyPair;
