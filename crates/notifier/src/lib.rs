//! Outbound chat delivery and the report texts sent through it.

use async_trait::async_trait;

pub mod reports;
pub mod telegram;

pub use reports::ReportFormatter;
pub use telegram::TelegramNotifier;

/// Best-effort message delivery. Implementations log their own failures;
/// callers never see them.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str);
}

/// Writes messages to the log. Used when no chat backend is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, text: &str) {
        tracing::info!(message = %text, "notification (no chat backend configured)");
    }
}
