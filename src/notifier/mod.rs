// ABOUTME: Out-of-band side-effect notifications on invite/join/grant events (§4.9)
// ABOUTME: The only polymorphic collaborator in the core; SMTP and no-op implementations

//! Notifier capability interface. Failures here are logged and never
//! propagated to the API caller — see §7's propagation policy.

use async_trait::async_trait;

/// SMTP-backed implementation, used when `KEYFORGE_SMTP_HOST` is configured.
pub mod smtp;
/// Fallback implementation used when SMTP is not configured.
pub mod noop;

pub use noop::NoopNotifier;
pub use smtp::SmtpNotifier;

/// Capability interface for best-effort, out-of-band notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// A user was invited; `token` is the raw (unhashed) invite token.
    async fn notify_invited(&self, user_name: &str, email: &str, token: &str);

    /// A user completed the join flow.
    async fn notify_joined(&self, user_name: &str, email: &str);

    /// A user's access to a project changed.
    async fn notify_access_changed(&self, user_name: &str, email: &str, project: &str, granted: bool);
}
