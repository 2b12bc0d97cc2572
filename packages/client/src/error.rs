//! Error types for the genwatch client.

use thiserror::Error;

/// Errors surfaced by the connection manager through its error hook.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// The target could not be turned into a WebSocket URL
    #[error("Invalid connection URL: {0}")]
    InvalidUrl(String),

    /// The socket failed to open or failed while reading
    #[error("Transport error: {0}")]
    Transport(String),

    /// An inbound frame was not a valid status message (non-fatal)
    #[error("Malformed status payload: {reason}")]
    MalformedPayload { reason: String },

    /// Every reconnection attempt failed
    #[error("Maximum reconnection attempts ({attempts}) reached")]
    ReconnectLimitReached { attempts: u32 },
}

impl ConnectionError {
    /// Whether the connection manager stopped for good after this error.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConnectionError::InvalidUrl(_) | ConnectionError::ReconnectLimitReached { .. }
        )
    }
}

/// Errors returned by the REST API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be sent or the body could not be decoded
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status code
    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The server accepted the request but reported failure in the body
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// The base URL could not be joined with an endpoint path
    #[error("Invalid API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Errors reported by the command-line runner.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Progress tracking ended in the error phase
    #[error("Generation tracking failed: {0}")]
    Tracking(String),

    /// Progress tracking ended before a terminal status arrived
    #[error("Progress stream ended before generation finished")]
    Incomplete,
}
