use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

use super::{FailureEvent, Notifier};

pub struct SlackNotifier {
    webhook_url: String,
    client: Client,
    timeout: Duration,
}

impl SlackNotifier {
    pub fn new(url: String) -> Self {
        Self {
            webhook_url: url,
            client: Client::new(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn message(ev: &FailureEvent) -> String {
        format!(
            "*weather-fx-pipeline:* stage `{}` failed after {} attempt(s)\nError: {}\n@ {}",
            ev.stage,
            ev.attempts,
            ev.error,
            ev.ts.to_rfc3339()
        )
    }
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, ev: &FailureEvent) -> Result<()> {
        let body = serde_json::json!({ "text": Self::message(ev) });

        self.client
            .post(&self.webhook_url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .context("slack post")?
            .error_for_status()
            .context("slack non-2xx")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "slack"
    }
}
