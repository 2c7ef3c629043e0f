// ABOUTME: SMTP Notifier implementation, the default when mail is configured
// ABOUTME: Plain-text single-line messages; no retry queue, no delivery confirmation

use async_trait::async_trait;
use lettre::{
    message::Mailbox, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};

use crate::errors::AppError;

use super::Notifier;

/// SMTP connection settings, sourced from `KEYFORGE_SMTP_*` environment
/// variables (§10.1).
pub struct SmtpConfig {
    /// SMTP relay host.
    pub host: String,
    /// SMTP relay port.
    pub port: u16,
    /// SMTP auth username.
    pub username: String,
    /// SMTP auth password.
    pub password: String,
    /// Envelope `From` address.
    pub from: String,
}

/// Sends notifications over SMTP with STARTTLS.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    /// Build a notifier from SMTP settings.
    ///
    /// # Errors
    /// Returns `AppError::Internal` if the host or from-address cannot be
    /// parsed, or the transport cannot be constructed.
    pub fn new(config: &SmtpConfig) -> Result<Self, AppError> {
        let credentials = Credentials::new(config.username.clone(), config.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(AppError::internal)?
            .port(config.port)
            .credentials(credentials)
            .build();
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|_| AppError::internal("KEYFORGE_SMTP_FROM is not a valid mailbox"))?;
        Ok(Self { transport, from })
    }

    async fn send(&self, to: &str, subject: &str, body: String) {
        let Ok(to_mailbox) = to.parse::<Mailbox>() else {
            tracing::warn!(to, "cannot parse recipient address, dropping notification");
            return;
        };
        let message = match Message::builder()
            .from(self.from.clone())
            .to(to_mailbox)
            .subject(subject)
            .body(body)
        {
            Ok(message) => message,
            Err(error) => {
                tracing::warn!(%error, "failed to build notification email");
                return;
            }
        };
        if let Err(error) = self.transport.send(message).await {
            tracing::warn!(%error, "failed to send notification email");
        }
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify_invited(&self, user_name: &str, email: &str, token: &str) {
        self.send(
            email,
            "You've been invited",
            format!("Hi {user_name},\n\nUse this one-time invite token to join: {token}\n"),
        )
        .await;
    }

    async fn notify_joined(&self, user_name: &str, email: &str) {
        self.send(
            email,
            "Welcome aboard",
            format!("Hi {user_name},\n\nYour SSH credentials are ready.\n"),
        )
        .await;
    }

    async fn notify_access_changed(&self, user_name: &str, email: &str, project: &str, granted: bool) {
        let verb = if granted { "granted" } else { "revoked" };
        self.send(
            email,
            "Project access changed",
            format!("Hi {user_name},\n\nYour access to project '{project}' has been {verb}.\n"),
        )
        .await;
    }
}
