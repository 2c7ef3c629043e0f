// ABOUTME: SSH Certificate Authority: signing key custody, minting, renewal
// ABOUTME: The signing key lives in process memory only after decryption at startup

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Duration, Utc};
use ssh_key::{
    certificate::{Builder, CertType},
    private::PrivateKey,
    public::PublicKey,
};

use crate::crypto::MasterKey;
use crate::errors::AppError;

use super::keypair::{self, GeneratedKeyPair};

/// Clock-skew grace applied to `valid_after`, per §4.2.
const CLOCK_SKEW_GRACE: Duration = Duration::seconds(60);

/// `permit-pty` and `permit-user-rc` are the only extensions every minted
/// certificate carries; no critical options are set.
const CERT_EXTENSIONS: [&str; 2] = ["permit-pty", "permit-user-rc"];

/// A minted user certificate, ready to be returned to the caller.
pub struct MintedCertificate {
    /// Single-line `ssh-ed25519-cert-v01@openssh.com ...` certificate.
    pub certificate_openssh: String,
    /// Serial assigned to this certificate.
    pub serial: u64,
    /// Start of the validity window (now minus the clock-skew grace).
    pub valid_after: DateTime<Utc>,
    /// End of the validity window (now plus `cert_validity`).
    pub valid_before: DateTime<Utc>,
}

/// What a renewal would produce, without actually minting anything.
pub struct CertInfo {
    /// Whether a renewal call would succeed right now.
    pub would_issue: bool,
    /// Principals that would be burned into the certificate.
    pub principals: Vec<String>,
    /// Projected start of the validity window.
    pub valid_after: DateTime<Utc>,
    /// Projected end of the validity window.
    pub valid_before: DateTime<Utc>,
}

/// Owns the CA's signing key and mints user certificates from it.
pub struct CertificateAuthority {
    signing_key: PrivateKey,
    public_key_openssh: String,
    cert_validity: Duration,
    enabled: bool,
    serial_counter: AtomicU64,
}

impl CertificateAuthority {
    /// Generate a brand-new CA signing key for `init`. Returns the CA
    /// instance plus the encrypted private key blob to persist.
    ///
    /// # Errors
    /// Returns `AppError::Internal` if key generation or encryption fails.
    pub fn generate(
        master_key: &MasterKey,
        cert_validity: Duration,
    ) -> Result<(Self, String), AppError> {
        let GeneratedKeyPair {
            private_key_openssh,
            public_key_openssh,
        } = keypair::generate_ed25519()?;
        let encrypted = master_key.encrypt(private_key_openssh.as_bytes())?;
        let signing_key = keypair::parse_private_key(&private_key_openssh)?;
        Ok((
            Self {
                signing_key,
                public_key_openssh,
                cert_validity,
                enabled: true,
                serial_counter: AtomicU64::new(1),
            },
            encrypted,
        ))
    }

    /// Load the CA from its persisted, encrypted form at `start`.
    ///
    /// # Errors
    /// Returns `AppError::Internal` if the master key does not decrypt the
    /// stored private key, or the decrypted PEM is malformed.
    pub fn load(
        master_key: &MasterKey,
        encrypted_private_key: &str,
        public_key_openssh: String,
        cert_validity: Duration,
        enabled: bool,
    ) -> Result<Self, AppError> {
        let pem_bytes = master_key.decrypt(encrypted_private_key)?;
        let pem = String::from_utf8(pem_bytes)
            .map_err(|_| AppError::internal("decrypted CA key is not valid UTF-8"))?;
        let signing_key = keypair::parse_private_key(&pem)?;
        Ok(Self {
            signing_key,
            public_key_openssh,
            cert_validity,
            enabled,
            serial_counter: AtomicU64::new(1),
        })
    }

    /// Whether the CA currently issues certificates.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The CA's public key in OpenSSH format, the trust anchor distributed
    /// out-of-band to `TrustedUserCAKeys`.
    #[must_use]
    pub fn public_key(&self) -> &str {
        &self.public_key_openssh
    }

    /// The configured certificate validity window.
    #[must_use]
    pub const fn cert_validity(&self) -> Duration {
        self.cert_validity
    }

    fn validity_window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let now = Utc::now();
        (now - CLOCK_SKEW_GRACE, now + self.cert_validity)
    }

    /// Report what a renewal would produce, without minting anything.
    #[must_use]
    pub fn info(&self, principals: Vec<String>) -> CertInfo {
        let (valid_after, valid_before) = self.validity_window();
        CertInfo {
            would_issue: self.enabled,
            principals,
            valid_after,
            valid_before,
        }
    }

    /// Mint a user certificate for `user_public_key_openssh`, bound to
    /// `principals` with `key_id` set to the user's name.
    ///
    /// # Errors
    /// Returns `AppError::Conflict` ("CAPermanentlyDisabled") if the CA is
    /// disabled, `AppError::InvalidInput` if the caller's public key is
    /// malformed, or `AppError::Internal` if certificate construction or
    /// signing fails.
    pub fn mint(
        &self,
        user_public_key_openssh: &str,
        key_id: &str,
        principals: &[String],
    ) -> Result<MintedCertificate, AppError> {
        if !self.enabled {
            return Err(AppError::conflict("CAPermanentlyDisabled"));
        }
        let public_key = PublicKey::from_openssh(user_public_key_openssh)
            .map_err(|_| AppError::invalid_input("stored public key is malformed"))?;
        let (valid_after, valid_before) = self.validity_window();
        let serial = self.serial_counter.fetch_add(1, Ordering::SeqCst);

        #[allow(clippy::cast_sign_loss)]
        let valid_after_unix = unix_seconds(valid_after);
        #[allow(clippy::cast_sign_loss)]
        let valid_before_unix = unix_seconds(valid_before);

        let mut builder = Builder::new_with_random_nonce(
            &mut rand::rngs::OsRng,
            public_key,
            valid_after_unix,
            valid_before_unix,
        )
        .map_err(AppError::internal)?;
        builder.serial(serial).map_err(AppError::internal)?;
        builder.key_id(key_id).map_err(AppError::internal)?;
        builder
            .cert_type(CertType::User)
            .map_err(AppError::internal)?;
        for principal in principals {
            builder
                .valid_principal(principal)
                .map_err(AppError::internal)?;
        }
        for extension in CERT_EXTENSIONS {
            builder
                .extension(extension, "")
                .map_err(AppError::internal)?;
        }
        let certificate = builder.sign(&self.signing_key).map_err(AppError::internal)?;
        let certificate_openssh = certificate.to_openssh().map_err(AppError::internal)?;

        Ok(MintedCertificate {
            certificate_openssh,
            serial,
            valid_after,
            valid_before,
        })
    }
}

/// Unix seconds for a `DateTime<Utc>`, saturating at zero for times before the epoch.
fn unix_seconds(ts: DateTime<Utc>) -> u64 {
    let secs = ts.timestamp();
    u64::try_from(secs).unwrap_or(0)
}

/// Current wall-clock time as unix seconds, used only for tests that need a
/// reference point independent of [`unix_seconds`].
#[cfg(test)]
fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_master_key() -> MasterKey {
        MasterKey::from_hex(&"cd".repeat(32)).unwrap()
    }

    #[test]
    fn mints_certificate_with_expected_principals() {
        let (ca, _encrypted) = CertificateAuthority::generate(&test_master_key(), Duration::hours(24)).unwrap();
        let user_key = keypair::generate_ed25519().unwrap();
        let cert = ca
            .mint(
                &user_key.public_key_openssh,
                "dev1",
                &["deploy".to_string(), "dev1".to_string()],
            )
            .unwrap();
        assert!(cert
            .certificate_openssh
            .starts_with("ssh-ed25519-cert-v01@openssh.com "));
        assert_eq!(cert.serial, 1);
        assert!(cert.valid_before > cert.valid_after);
        assert!(now_unix() > 0);
    }

    #[test]
    fn load_round_trips_generated_key() {
        let master_key = test_master_key();
        let (ca, encrypted) = CertificateAuthority::generate(&master_key, Duration::hours(24)).unwrap();
        let loaded = CertificateAuthority::load(
            &master_key,
            &encrypted,
            ca.public_key().to_string(),
            Duration::hours(24),
            true,
        )
        .unwrap();
        assert_eq!(loaded.public_key(), ca.public_key());
    }

    #[test]
    fn disabled_ca_refuses_to_mint() {
        let (mut ca, _) = CertificateAuthority::generate(&test_master_key(), Duration::hours(24)).unwrap();
        ca.enabled = false;
        let user_key = keypair::generate_ed25519().unwrap();
        let err = ca
            .mint(&user_key.public_key_openssh, "dev1", &["dev1".to_string()])
            .unwrap_err();
        assert_eq!(err.code(), crate::errors::ErrorCode::Conflict);
        assert_eq!(err.sanitized_message(), "CAPermanentlyDisabled");
    }
}
