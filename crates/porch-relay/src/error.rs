//! Relay-specific error types.

use porch_common::PorchError;
use thiserror::Error;

/// Errors that can occur talking to relays or resolving identities.
#[derive(Debug, Error)]
pub enum RelayError {
    // ── Configuration ───────────────────────────────────────────────────────

    #[error("No relays configured")]
    NoRelays,

    #[error("Invalid relay URL '{0}'")]
    InvalidRelayUrl(String),

    // ── Remote communication ─────────────────────────────────────────────────

    #[error("Failed to connect to relay '{relay}': {message}")]
    Connection { relay: String, message: String },

    #[error("Relay '{0}' timed out")]
    Timeout(String),

    #[error("Relay '{relay}' sent an unexpected message: {message}")]
    Protocol { relay: String, message: String },

    #[error("Every relay failed")]
    AllRelaysFailed,

    #[error("HTTP error: {0}")]
    Http(String),

    // ── Events ───────────────────────────────────────────────────────────────

    #[error("Event signing failed: {0}")]
    Signing(String),

    // ── General ─────────────────────────────────────────────────────────────

    #[error("Serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        let host = e.url().and_then(|u| u.host_str()).unwrap_or("?").to_owned();
        RelayError::Http(format!("{host}: {e}"))
    }
}

impl From<RelayError> for PorchError {
    fn from(e: RelayError) -> Self {
        PorchError::Network(e.to_string())
    }
}
