//! The output side of the relay.
//!
//! An [`OutputSink`] delivers dispatched messages to a destination channel,
//! typically a chat platform. Rendering of status updates is the sink's
//! concern; [`StatusCard`](crate::status::StatusCard) is available as a
//! ready-made presentation.

use crate::status::StatusUpdate;
use async_trait::async_trait;

/// Errors reported by an output sink.
///
/// The dispatcher logs these and moves on; they never reach the backend
/// connection.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The destination channel is not known to the sink
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    /// The platform refused or failed the delivery
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Destination for relayed messages.
#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Delivers a plain text message verbatim.
    async fn send_text(&self, channel: &str, text: &str) -> Result<(), SinkError>;

    /// Renders and delivers a structured status update.
    async fn send_status(&self, channel: &str, status: &StatusUpdate) -> Result<(), SinkError>;
}
