//! Message dispatch from backend payloads to the output sink.
//!
//! Each raw payload is split into candidates which are routed one after the
//! other, so delivery order follows the order the backend sent them in.
//! Failures are contained per candidate: a malformed chunk, an invalid status
//! or a failed delivery is logged and the rest of the batch still goes out.

use super::types::{split_messages, MessageOrigin, GAME_STATUS_PREFIX, SPLIT_MESSAGE_PREFIX};
use crate::reassembly::ChunkReassembler;
use crate::sink::OutputSink;
use crate::status::parse_status;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, error, trace};

/// What happened to a single candidate message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Delivered to the sink as plain text
    Text,
    /// Delivered to the sink as a status update
    Status,
    /// Chunk stored, the message is not complete yet
    Pending,
    /// Rejected by the reassembler or the status parser
    Dropped,
    /// The sink reported a delivery error
    Failed,
}

/// Per-payload tally of route outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub text: usize,
    pub status: usize,
    pub pending: usize,
    pub dropped: usize,
    pub failed: usize,
}

impl DispatchSummary {
    fn record(&mut self, outcome: RouteOutcome) {
        match outcome {
            RouteOutcome::Text => self.text += 1,
            RouteOutcome::Status => self.status += 1,
            RouteOutcome::Pending => self.pending += 1,
            RouteOutcome::Dropped => self.dropped += 1,
            RouteOutcome::Failed => self.failed += 1,
        }
    }

    /// Number of candidates handed to the sink successfully.
    pub fn delivered(&self) -> usize {
        self.text + self.status
    }
}

/// Routes backend payloads through reassembly and classification to a sink.
pub struct MessageDispatcher {
    reassembler: ChunkReassembler,
    sink: Arc<dyn OutputSink>,
}

impl std::fmt::Debug for MessageDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageDispatcher")
            .field("reassembler", &self.reassembler)
            .finish_non_exhaustive()
    }
}

impl MessageDispatcher {
    pub fn new(reassembler: ChunkReassembler, sink: Arc<dyn OutputSink>) -> Self {
        Self { reassembler, sink }
    }

    /// The reassembler shared by every connection using this dispatcher.
    pub fn reassembler(&self) -> &ChunkReassembler {
        &self.reassembler
    }

    /// Splits `raw` into messages and routes each of them.
    pub async fn dispatch(&self, origin: &MessageOrigin, raw: &str) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        for candidate in split_messages(raw) {
            summary.record(self.route(origin, candidate).await);
        }
        trace!(
            server = %origin.server,
            delivered = summary.delivered(),
            ?summary,
            "📨 Dispatched payload"
        );
        summary
    }

    /// Routes one candidate message.
    pub async fn route(&self, origin: &MessageOrigin, candidate: &str) -> RouteOutcome {
        let message: Cow<'_, str> = match candidate.strip_prefix(SPLIT_MESSAGE_PREFIX) {
            Some(wrapped) => match self.reassembler.feed(&origin.channel, wrapped) {
                Ok(Some(message)) => Cow::Owned(message),
                Ok(None) => return RouteOutcome::Pending,
                Err(e) => {
                    error!(
                        server = %origin.server,
                        channel = %origin.channel,
                        "❌ Failed to process split message: {}",
                        e
                    );
                    return RouteOutcome::Dropped;
                }
            },
            None => Cow::Borrowed(candidate),
        };

        if let Some(payload) = message.strip_prefix(GAME_STATUS_PREFIX) {
            let status = match parse_status(payload) {
                Ok(status) => status,
                Err(e) => {
                    error!(
                        server = %origin.server,
                        channel = %origin.channel,
                        "❌ Rejected game status: {}",
                        e
                    );
                    return RouteOutcome::Dropped;
                }
            };
            debug!(
                server = %origin.server,
                "🎮 Game status for {} ({} on {})",
                status.server_name, status.game_mode, status.map
            );
            return match self.sink.send_status(&origin.channel, &status).await {
                Ok(()) => RouteOutcome::Status,
                Err(e) => {
                    error!(channel = %origin.channel, "Failed to deliver game status: {}", e);
                    RouteOutcome::Failed
                }
            };
        }

        match self.sink.send_text(&origin.channel, &message).await {
            Ok(()) => RouteOutcome::Text,
            Err(e) => {
                error!(channel = %origin.channel, "Failed to deliver message: {}", e);
                RouteOutcome::Failed
            }
        }
    }
}
