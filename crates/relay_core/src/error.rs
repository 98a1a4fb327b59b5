//! Error types for the relay gate.
//!
//! Protocol-level failures (bad chunks, bad status payloads, sink failures)
//! have their own error types next to the code that produces them; this
//! module covers the listener and connection lifecycle.

use std::net::SocketAddr;

/// Enumeration of possible gate errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The listener could not be bound; fatal for this server only
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Socket-level failures on an accepted connection
    #[error("Network error: {0}")]
    Network(String),
}
