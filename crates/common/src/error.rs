//! Error types for VOXA

use thiserror::Error;

/// Result type alias using [`DispatchError`]
pub type Result<T> = std::result::Result<T, DispatchError>;

/// Reasons a delivery attempt can fail.
///
/// Every variant except [`DispatchError::Configuration`] is absorbed by the
/// strategy that produced it and only moves the dispatcher on to the next
/// strategy. `Configuration` is a local precondition failure and is the only
/// variant a caller of `dispatch` ever sees.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("Unexpected response from {url}: {reason}")]
    UnexpectedResponse { url: String, reason: String },

    #[error("Browser automation unavailable: {0}")]
    AutomationUnavailable(String),

    #[error("No {role} element matched any of [{}]", selectors.join(", "))]
    AutomationElementNotFound { role: String, selectors: Vec<String> },

    #[error("Browser automation failed: {0}")]
    AutomationFailed(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl DispatchError {
    /// Whether this error must be surfaced to the caller instead of being
    /// absorbed by a strategy.
    pub fn is_configuration(&self) -> bool {
        matches!(self, DispatchError::Configuration(_))
    }

    /// Short machine-readable kind, used in logs and attempt reports.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::NetworkUnavailable(_) => "network_unavailable",
            DispatchError::UnexpectedStatus { .. } => "unexpected_status",
            DispatchError::UnexpectedResponse { .. } => "unexpected_response",
            DispatchError::AutomationUnavailable(_) => "automation_unavailable",
            DispatchError::AutomationElementNotFound { .. } => "automation_element_not_found",
            DispatchError::AutomationFailed(_) => "automation_failed",
            DispatchError::Configuration(_) => "configuration",
        }
    }
}
