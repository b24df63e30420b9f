pub mod slack;

use anyhow::Result;
use chrono::{DateTime, Utc};

pub use slack::SlackNotifier;

/// A stage that failed on every attempt.
#[derive(Debug, Clone)]
pub struct FailureEvent {
    pub stage: &'static str,
    pub attempts: u32,
    pub error: String,
    pub ts: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, ev: &FailureEvent) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Fallback when no channel is configured: the failure only goes to the log.
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, ev: &FailureEvent) -> Result<()> {
        tracing::error!(
            stage = ev.stage,
            attempts = ev.attempts,
            error = %ev.error,
            "stage failed after all retries"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
