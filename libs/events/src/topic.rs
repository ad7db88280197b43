//! Exchange name, severities, and default topic bindings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the durable topic exchange every service publishes to.
pub const EXCHANGE_NAME: &str = "logs_topic";

/// Bindings used by the broker service's in-process consumer.
pub const BROKER_TOPICS: [&str; 3] = ["log", "auth", "event"];

/// Bindings used by the standalone listener.
pub const SEVERITY_TOPICS: [&str; 3] = ["log.INFO", "log.WARNING", "log.ERROR"];

/// Log severity, encoded in the routing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Error,
}

impl Severity {
    /// The routing key a message of this severity is published with.
    pub fn routing_key(&self) -> &'static str {
        match self {
            Severity::Info => "log.INFO",
            Severity::Warning => "log.WARNING",
            Severity::Error => "log.ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.routing_key())
    }
}
