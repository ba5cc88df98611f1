//! Sync error types.

use thiserror::Error;

use crate::models::ModelError;

/// Errors surfaced by asynchronous client operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Request failed, was rejected, or returned a non-success status
    #[error("Transport error: {0}")]
    TransportError(String),

    /// Failed to open the listener socket
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Listener socket failed after connecting
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Server payload could not be decoded
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// Outgoing payload could not be encoded
    #[error("Encode error: {0}")]
    EncodeError(String),

    /// Local model rejected the request
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl SyncError {
    /// True for network and authorization failures.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SyncError::TransportError(_)
                | SyncError::ConnectionError(_)
                | SyncError::WebSocketError(_)
        )
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        SyncError::TransportError(e.to_string())
    }
}
