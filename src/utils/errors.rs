// src/utils/errors.rs
//! Error taxonomy for the fleet engine
//!
//! Four broad classes drive handling policy:
//!
//! - **Transport**: network/HTTP failure — retried or skipped for the
//!   cycle, never fatal to an agent loop
//! - **Auth**: bad credentials — halts that agent's progression to Active
//! - **Config**: malformed fleet entry — fails only that entry
//! - **Process**: spawn/termination failure — reported to the caller,
//!   supervisor state stays consistent

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, FleetError>;

/// Errors produced by the fleet engine
#[derive(Debug, Error)]
pub enum FleetError {
    /// Network-level failure talking to a remote service
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Remote API rejected the request with a non-success status
    #[error("remote API returned {status}: {detail}")]
    Api { status: u16, detail: String },

    /// Authentication failed; the agent cannot become active
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Invalid or incomplete configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Process spawn or termination failure
    #[error("process error: {0}")]
    Process(String),

    /// An agent with this id already has a live process handle
    #[error("agent '{0}' is already running")]
    AlreadyRunning(String),

    /// No live process handle exists for this agent id
    #[error("agent '{0}' is not running")]
    NotRunning(String),

    /// External content generation failed after retries were exhausted
    #[error("content generation failed: {0}")]
    Generation(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FleetError {
    /// Whether the failure is transient and worth a bounded retry.
    ///
    /// Covers connection-level failures and 5xx responses; auth and
    /// client-side rejections are never retried.
    pub fn is_transient(&self) -> bool {
        match self {
            FleetError::Transport(_) => true,
            FleetError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_transience() {
        let server_side = FleetError::Api {
            status: 503,
            detail: "unavailable".into(),
        };
        assert!(server_side.is_transient());

        let client_side = FleetError::Api {
            status: 400,
            detail: "bad request".into(),
        };
        assert!(!client_side.is_transient());
    }

    #[test]
    fn test_auth_not_transient() {
        let err = FleetError::Auth("bad password".into());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_display() {
        let err = FleetError::AlreadyRunning("bot1".into());
        assert_eq!(err.to_string(), "agent 'bot1' is already running");
    }
}
