//! Alert sinks.
//!
//! All sinks are fire-and-forget: delivery failure is logged and swallowed,
//! never propagated into the state transition the alert accompanies.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{error, info, warn};
use trailguard_core::traits::{AlertSink, Severity};

/// Sink that writes alerts to the process log.
#[derive(Debug, Default)]
pub struct LogAlerts;

#[async_trait]
impl AlertSink for LogAlerts {
    async fn notify(&self, message: &str, severity: Severity, symbol: Option<&str>) {
        let symbol = symbol.unwrap_or("-");
        match severity {
            Severity::Info => info!(symbol, "{message}"),
            Severity::Warning => warn!(symbol, "{message}"),
            Severity::Critical => error!(symbol, "{message}"),
        }
    }
}

/// Sink that posts alerts to a Slack-compatible webhook.
pub struct WebhookAlerts {
    url: String,
    client: reqwest::Client,
}

impl WebhookAlerts {
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self {
            url: url.into(),
            client,
        }
    }
}

#[async_trait]
impl AlertSink for WebhookAlerts {
    async fn notify(&self, message: &str, severity: Severity, symbol: Option<&str>) {
        let text = match symbol {
            Some(symbol) => format!("[{severity}] [{symbol}] {message}"),
            None => format!("[{severity}] {message}"),
        };
        let payload = serde_json::json!({ "text": text });

        let result = self.client.post(&self.url).json(&payload).send().await;
        match result {
            Ok(resp) if !resp.status().is_success() => {
                warn!("Alert webhook returned {}", resp.status());
            }
            Err(err) => warn!("Alert webhook delivery failed: {err}"),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_sink_never_fails() {
        // Signature returns (): the compiler enforces the fire-and-forget
        // contract; this just exercises the formatting paths.
        let sink = LogAlerts;
        sink.notify("test message", Severity::Info, Some("AAPL")).await;
        sink.notify("no symbol", Severity::Critical, None).await;
    }

    #[tokio::test]
    async fn test_webhook_swallow_delivery_failure() {
        let sink = WebhookAlerts::new("http://127.0.0.1:1/unreachable");
        sink.notify("boom", Severity::Warning, Some("BTCUSDT")).await;
    }
}
