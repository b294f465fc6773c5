//! Outbound alert contract.

use async_trait::async_trait;

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Fire-and-forget operator notifications.
///
/// Implementations must never propagate failure: an alert that cannot be
/// delivered is logged and dropped, and the state transition it accompanies
/// proceeds regardless.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn notify(&self, message: &str, severity: Severity, symbol: Option<&str>);
}
