//! Listening sockets and backend connection handling.
//!
//! One [`ServerGate`] runs per configured backend server; each accepted
//! connection is served by [`handlers::handle_connection`].

pub mod core;
pub mod handlers;

pub use self::core::ServerGate;
