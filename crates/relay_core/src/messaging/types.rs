//! Wire markers and message framing for backend payloads.
//!
//! A single read from a backend may carry several logical messages separated
//! by blank lines:
//!
//! ```text
//! SPLIT_MSG:{"chunk":1,"total":2,"data":"GAME_STATUS:{\"serverName\":\"Arena\","}
//!
//! Player joined the game
//! ```

/// Prefix of a chunk envelope.
pub const SPLIT_MESSAGE_PREFIX: &str = "SPLIT_MSG:";

/// Prefix of a structured status payload.
pub const GAME_STATUS_PREFIX: &str = "GAME_STATUS:";

/// Identifies where a payload came from and where it should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageOrigin {
    /// Configured name of the backend server
    pub server: String,
    /// Destination output channel
    pub channel: String,
}

impl MessageOrigin {
    pub fn new(server: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            channel: channel.into(),
        }
    }
}

/// Splits a raw payload into candidate messages.
///
/// Messages are separated by one or more blank lines (`\n` or `\r\n` line
/// endings, whitespace-only lines count as blank). Candidates are trimmed and
/// blank ones are dropped.
pub fn split_messages(raw: &str) -> Vec<&str> {
    let mut messages = Vec::new();
    let mut start: Option<usize> = None;
    let mut offset = 0;

    for line in raw.split_inclusive('\n') {
        let is_blank = line.trim().is_empty();
        if is_blank {
            if let Some(begin) = start.take() {
                messages.push(&raw[begin..offset]);
            }
        } else if start.is_none() {
            start = Some(offset);
        }
        offset += line.len();
    }
    if let Some(begin) = start {
        messages.push(&raw[begin..]);
    }

    messages
        .into_iter()
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .collect()
}
