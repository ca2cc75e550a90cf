// src/utils/notify.rs

use async_trait::async_trait;

/// Outbound notification delivery. Implementations are fire-and-forget:
/// callers spawn them after the surrounding transaction has committed and
/// never wait on the outcome.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Tells a user the decision on one of their payments.
    async fn payment_decision(&self, email: &str, purpose: &str, approved: bool);

    /// Tells a guide the decision on their licensing request.
    async fn license_decision(&self, email: &str, approved: bool);
}

/// Default backend: writes the would-be email to the log. The SMTP
/// integration slots in behind the same trait.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn payment_decision(&self, email: &str, purpose: &str, approved: bool) {
        tracing::info!(
            email,
            purpose,
            approved,
            "notification: payment decision delivered"
        );
    }

    async fn license_decision(&self, email: &str, approved: bool) {
        tracing::info!(email, approved, "notification: license decision delivered");
    }
}
