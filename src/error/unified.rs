//! Error classification shared by the HTTP layer and run-error frames.

use serde::{Deserialize, Serialize};

/// Broad error category, used to pick HTTP status codes and log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Authentication,
    RateLimit,
    Network,
    Server,
    Api,
    Configuration,
    Serialization,
    Protocol,
    ToolExecution,
    Cancelled,
    Unknown,
}

impl ErrorCategory {
    /// Machine-readable code, as logged when a run fails.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::RateLimit => "rate_limit",
            Self::Network => "network",
            Self::Server => "server",
            Self::Api => "api",
            Self::Configuration => "configuration",
            Self::Serialization => "serialization",
            Self::Protocol => "protocol",
            Self::ToolExecution => "tool_execution",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        }
    }
}
