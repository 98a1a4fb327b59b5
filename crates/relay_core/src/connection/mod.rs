//! Per-connection state and the authentication protocol.
//!
//! A backend connection moves through
//! `Connected(unauthenticated) → Connected(authenticated) → Closed` and never
//! back; a reconnect always starts from scratch.

pub mod auth;
pub mod state;

pub use auth::{is_auth_line, strip_pass_lines, trim_line_ending, AUTH_ACCEPTED, AUTH_REJECTED};
pub use state::{ConnectionPhase, ConnectionState};

/// Type alias for connection identifiers.
///
/// Identifiers are unique per gate for the lifetime of the process.
pub type ConnectionId = usize;
