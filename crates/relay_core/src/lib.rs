//! # Relay Core - Backend Protocol and Reassembly Engine
//!
//! Game servers report to chat through a single persistent TCP connection
//! each. This crate implements everything between the socket and the chat
//! client: authentication, message splitting, reassembly of chunked
//! messages, and validation of structured status updates.
//!
//! ## Message Flow
//!
//! 1. A [`ServerGate`] accepts the backend connection and requires
//!    `PASS <secret>` before anything is forwarded (`200` / `401` replies)
//! 2. Each authenticated read is handed to the [`MessageDispatcher`]
//! 3. The dispatcher splits the payload on blank lines
//! 4. `SPLIT_MSG:` fragments are buffered per channel by the
//!    [`ChunkReassembler`] until the message is complete
//! 5. `GAME_STATUS:` messages are parsed into a [`StatusUpdate`]
//! 6. Results are delivered through an [`OutputSink`]
//!
//! ## Wire Protocol
//!
//! ```text
//! → PASS secret
//! ← 200
//! → Hello world
//! →
//! → SPLIT_MSG:{"chunk":1,"total":2,"data":"GAME_STATUS:{\"serverName\":\"Arena\","}
//! → SPLIT_MSG:{"chunk":2,"total":2,"data":"\"gameMode\":\"DM\",\"map\":\"DM-Deck\"}"}
//! ```
//!
//! ## Error Handling
//!
//! Failures are contained where they happen: a bad chunk or status payload
//! drops that message, a sink failure is logged, a socket error closes the
//! connection, and a bind failure stops only the affected gate.
//!
//! ## Thread Safety
//!
//! Gates run independently. The reassembly buffers are the only state shared
//! between connections; they live in a concurrent map keyed by channel so
//! different channels never contend.

pub use config::ServerConnectionConfig;
pub use error::ServerError;
pub use messaging::{DispatchSummary, MessageDispatcher, MessageOrigin, RouteOutcome};
pub use reassembly::{ChunkEnvelope, ChunkReassembler, ReassemblyError, DEFAULT_REASSEMBLY_TIMEOUT};
pub use server::ServerGate;
pub use sink::{OutputSink, SinkError};
pub use status::{parse_status, StatusCard, StatusError, StatusUpdate};

pub mod config;
pub mod connection;
pub mod error;
pub mod messaging;
pub mod reassembly;
pub mod server;
pub mod sink;
pub mod status;
