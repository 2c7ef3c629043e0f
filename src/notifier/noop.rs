// ABOUTME: No-op Notifier used when SMTP is not configured
// ABOUTME: Logs at debug level so silence is still observable in logs

use async_trait::async_trait;

use super::Notifier;

/// A `Notifier` that only logs; used when SMTP is not configured.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify_invited(&self, user_name: &str, _email: &str, _token: &str) {
        tracing::debug!(user = user_name, "notifier disabled: skipping invite email");
    }

    async fn notify_joined(&self, user_name: &str, _email: &str) {
        tracing::debug!(user = user_name, "notifier disabled: skipping welcome email");
    }

    async fn notify_access_changed(&self, user_name: &str, _email: &str, project: &str, granted: bool) {
        tracing::debug!(
            user = user_name,
            project,
            granted,
            "notifier disabled: skipping access-change email"
        );
    }
}
