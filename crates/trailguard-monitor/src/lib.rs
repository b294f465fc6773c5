//! Logging and operator notifications.

mod alerts;
mod logging;

pub use alerts::{LogAlerts, WebhookAlerts};
pub use logging::{setup_logging, LogFormat};
