//! Splitting, classification and routing of backend payloads.
//!
//! Authenticated payloads from the connection gate land here. Each payload
//! is split on blank lines; `SPLIT_MSG:` fragments go through the
//! [`ChunkReassembler`](crate::reassembly::ChunkReassembler), `GAME_STATUS:`
//! messages through the status parser, and everything else is delivered
//! verbatim.

pub mod router;
pub mod types;

pub use router::{DispatchSummary, MessageDispatcher, RouteOutcome};
pub use types::{split_messages, MessageOrigin, GAME_STATUS_PREFIX, SPLIT_MESSAGE_PREFIX};
