//! State of an individual backend connection.

use super::ConnectionId;
use std::net::SocketAddr;
use std::time::{Duration, SystemTime};

/// Lifecycle phase of a backend connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// Connected, waiting for a valid `PASS` line
    Unauthenticated,
    /// Authenticated; payloads are forwarded
    Authenticated,
    /// Torn down; nothing more is processed
    Closed,
}

/// Represents one live backend connection.
///
/// Owned by the task serving the connection and dropped with it.
#[derive(Debug)]
pub struct ConnectionState {
    /// Gate-unique identifier of this connection
    pub id: ConnectionId,

    /// The remote network address of the backend
    pub remote_addr: SocketAddr,

    /// When this connection was established
    pub connected_at: SystemTime,

    phase: ConnectionPhase,
}

impl ConnectionState {
    /// Creates a freshly accepted, unauthenticated connection.
    pub fn new(id: ConnectionId, remote_addr: SocketAddr) -> Self {
        Self {
            id,
            remote_addr,
            connected_at: SystemTime::now(),
            phase: ConnectionPhase::Unauthenticated,
        }
    }

    /// Gets the current lifecycle phase.
    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn is_authenticated(&self) -> bool {
        self.phase == ConnectionPhase::Authenticated
    }

    pub fn is_closed(&self) -> bool {
        self.phase == ConnectionPhase::Closed
    }

    /// Marks the connection authenticated.
    ///
    /// Returns `false` when the connection is not in the unauthenticated
    /// phase, in which case nothing changes.
    pub fn authenticate(&mut self) -> bool {
        if self.phase != ConnectionPhase::Unauthenticated {
            return false;
        }
        self.phase = ConnectionPhase::Authenticated;
        true
    }

    /// Closes the connection; authentication is lost for good.
    pub fn close(&mut self) {
        self.phase = ConnectionPhase::Closed;
    }

    /// How long the connection has been open.
    pub fn uptime(&self) -> Duration {
        self.connected_at.elapsed().unwrap_or_default()
    }
}
