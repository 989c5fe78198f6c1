//! Alerting sink for operational failures.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

/// Fire-and-forget alert delivery. Implementations must not block the caller
/// for long and have no way to report failure.
pub trait AlertSink: Send + Sync {
    fn emit(&self, level: AlertLevel, message: &str, context: &Value);
}

/// Forwards alerts as `tracing` events under the `opsjson::alert` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl AlertSink for TracingSink {
    fn emit(&self, level: AlertLevel, message: &str, context: &Value) {
        match level {
            AlertLevel::Debug => debug!(target: "opsjson::alert", %context, "{message}"),
            AlertLevel::Info => info!(target: "opsjson::alert", %context, "{message}"),
            AlertLevel::Warning => warn!(target: "opsjson::alert", %context, "{message}"),
            AlertLevel::Error | AlertLevel::Critical => {
                let critical = level == AlertLevel::Critical;
                error!(target: "opsjson::alert", critical, %context, "{message}")
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl AlertSink for NullSink {
    fn emit(&self, _level: AlertLevel, _message: &str, _context: &Value) {}
}
