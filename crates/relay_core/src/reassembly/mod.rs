//! Reassembly of messages the backend split into size-limited chunks.
//!
//! Buffers are keyed by output channel, not by connection: a buffer outlives
//! a backend that disconnects mid-transfer and is only discarded on
//! completion, on error, or when its expiry timer fires.
//!
//! Completion is decided by entry count. A buffer is complete as soon as it
//! holds as many entries as the most recently declared `total`; the indexes
//! `1..=total` are only checked while draining, so a sender that repeats or
//! changes totals can reach the count without covering every index, which
//! surfaces as [`ReassemblyError::MissingChunk`].

pub mod envelope;

pub use envelope::ChunkEnvelope;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// How long an incomplete message may wait for its remaining chunks.
pub const DEFAULT_REASSEMBLY_TIMEOUT: Duration = Duration::from_secs(30);

/// Reasons a chunk is rejected or a message cannot be reassembled.
#[derive(Debug, thiserror::Error)]
pub enum ReassemblyError {
    #[error("Malformed chunk envelope: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Chunk envelope is not a JSON object")]
    NotAnObject,

    #[error("Chunk envelope is missing `{0}`")]
    MissingField(&'static str),

    #[error("Chunk envelope field `{field}` must be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },

    #[error("Chunk {chunk} exceeds declared total {total}")]
    ChunkOutOfRange { chunk: u32, total: u32 },

    #[error("Chunk {index} of {total} is missing")]
    MissingChunk { index: u32, total: u32 },
}

/// In-flight message for one channel.
#[derive(Debug)]
struct ReassemblyBuffer {
    chunks: HashMap<u32, String>,
    total: u32,
    generation: u64,
    expiry: Option<JoinHandle<()>>,
}

impl ReassemblyBuffer {
    fn new(generation: u64) -> Self {
        Self {
            chunks: HashMap::new(),
            total: 0,
            generation,
            expiry: None,
        }
    }

    /// Stores a chunk and reports whether the buffer is now complete.
    fn store(&mut self, envelope: ChunkEnvelope) -> bool {
        self.total = envelope.total;
        self.chunks.insert(envelope.chunk, envelope.data);
        self.chunks.len() == self.total as usize
    }

    fn assemble(mut self) -> Result<String, ReassemblyError> {
        let total = self.total;
        let mut message = String::new();
        for index in 1..=total {
            let part = self
                .chunks
                .remove(&index)
                .ok_or(ReassemblyError::MissingChunk { index, total })?;
            message.push_str(&part);
        }
        Ok(message)
    }
}

impl Drop for ReassemblyBuffer {
    fn drop(&mut self) {
        if let Some(expiry) = self.expiry.take() {
            expiry.abort();
        }
    }
}

/// Per-channel chunk reassembly service.
///
/// Cloning yields another handle onto the same buffer set. Mutations of one
/// channel's buffer are serialized by the map's entry lock while different
/// channels proceed independently.
///
/// Feeding chunks spawns expiry timers and therefore must happen inside a
/// Tokio runtime.
#[derive(Debug, Clone)]
pub struct ChunkReassembler {
    buffers: Arc<DashMap<String, ReassemblyBuffer>>,
    timeout: Duration,
    next_generation: Arc<AtomicU64>,
}

impl Default for ChunkReassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkReassembler {
    /// Creates a reassembler using [`DEFAULT_REASSEMBLY_TIMEOUT`].
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_REASSEMBLY_TIMEOUT)
    }

    /// Creates a reassembler whose buffers expire after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            buffers: Arc::new(DashMap::new()),
            timeout,
            next_generation: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Expiry applied to newly created buffers.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of channels with a message in flight.
    pub fn pending_count(&self) -> usize {
        self.buffers.len()
    }

    /// Whether `channel` has a message in flight.
    #[cfg(test)]
    pub(crate) fn is_pending(&self, channel: &str) -> bool {
        self.buffers.contains_key(channel)
    }

    /// Parses the text after `SPLIT_MSG:` and feeds it to `channel`'s buffer.
    ///
    /// Returns `Ok(Some(message))` when this chunk completed the message,
    /// `Ok(None)` while chunks are still outstanding. A malformed envelope is
    /// rejected without touching the channel's buffer.
    pub fn feed(&self, channel: &str, raw: &str) -> Result<Option<String>, ReassemblyError> {
        let envelope = ChunkEnvelope::parse(raw)?;
        self.accept(channel, envelope)
    }

    /// Feeds an already parsed envelope to `channel`'s buffer.
    ///
    /// When the count says the message is complete but an index is missing,
    /// the buffer is discarded and [`ReassemblyError::MissingChunk`] returned.
    pub fn accept(
        &self,
        channel: &str,
        envelope: ChunkEnvelope,
    ) -> Result<Option<String>, ReassemblyError> {
        let (chunk, total) = (envelope.chunk, envelope.total);

        match self.buffers.entry(channel.to_string()) {
            Entry::Occupied(mut occupied) => {
                if !occupied.get_mut().store(envelope) {
                    debug!(channel, chunk, total, "🧩 Stored chunk, awaiting more");
                    return Ok(None);
                }
                let (_, buffer) = occupied.remove_entry();
                buffer.assemble().map(Some)
            }
            Entry::Vacant(vacant) => {
                let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                let mut buffer = ReassemblyBuffer::new(generation);
                if buffer.store(envelope) {
                    return buffer.assemble().map(Some);
                }
                buffer.expiry = Some(self.arm_expiry(channel.to_string(), generation));
                vacant.insert(buffer);
                debug!(channel, chunk, total, "🧩 Started reassembly");
                Ok(None)
            }
        }
    }

    /// Discards every in-flight buffer.
    pub fn clear(&self) {
        self.buffers.clear();
    }

    fn arm_expiry(&self, channel: String, generation: u64) -> JoinHandle<()> {
        let buffers: Weak<DashMap<String, ReassemblyBuffer>> = Arc::downgrade(&self.buffers);
        let timeout = self.timeout;

        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let Some(buffers) = buffers.upgrade() else {
                return;
            };
            // A newer buffer for the same channel has its own timer
            let expired = buffers.remove_if(&channel, |_, buffer| buffer.generation == generation);
            if let Some((_, mut buffer)) = expired {
                // Detach the handle so dropping the buffer skips the abort
                buffer.expiry = None;
                warn!(
                    channel = %channel,
                    received = buffer.chunks.len(),
                    total = buffer.total,
                    "⏰ Reassembly timed out after {:?}, partial message discarded",
                    timeout
                );
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(chunk: u32, total: u32, data: &str) -> String {
        serde_json::json!({ "chunk": chunk, "total": total, "data": data }).to_string()
    }

    #[tokio::test]
    async fn test_single_chunk_completes_immediately() {
        let reassembler = ChunkReassembler::new();
        let message = reassembler.feed("chan", &chunk(1, 1, "hello")).unwrap();
        assert_eq!(message.as_deref(), Some("hello"));
        assert_eq!(reassembler.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_in_order_reassembly() {
        let reassembler = ChunkReassembler::new();
        assert_eq!(reassembler.feed("chan", &chunk(1, 3, "a")).unwrap(), None);
        assert!(reassembler.is_pending("chan"));
        assert_eq!(reassembler.feed("chan", &chunk(2, 3, "b")).unwrap(), None);
        let message = reassembler.feed("chan", &chunk(3, 3, "c")).unwrap();
        assert_eq!(message.as_deref(), Some("abc"));
        assert!(!reassembler.is_pending("chan"));
    }

    #[tokio::test]
    async fn test_out_of_order_matches_in_order() {
        let reassembler = ChunkReassembler::new();
        assert_eq!(reassembler.feed("chan", &chunk(3, 3, "c")).unwrap(), None);
        assert_eq!(reassembler.feed("chan", &chunk(2, 3, "b")).unwrap(), None);
        let message = reassembler.feed("chan", &chunk(1, 3, "a")).unwrap();
        assert_eq!(message.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_duplicate_index_overwrites() {
        let reassembler = ChunkReassembler::new();
        reassembler.feed("chan", &chunk(1, 2, "old")).unwrap();
        reassembler.feed("chan", &chunk(1, 2, "new")).unwrap();
        let message = reassembler.feed("chan", &chunk(2, 2, "!")).unwrap();
        assert_eq!(message.as_deref(), Some("new!"));
    }

    #[tokio::test]
    async fn test_count_reached_without_coverage_fails() {
        let reassembler = ChunkReassembler::new();
        // Index 3 lands while total is 3, then a chunk redeclares total 2
        reassembler.feed("chan", &chunk(3, 3, "c")).unwrap();
        let err = reassembler.feed("chan", &chunk(1, 2, "a")).unwrap_err();
        assert!(matches!(err, ReassemblyError::MissingChunk { index: 2, total: 2 }));
        assert!(!reassembler.is_pending("chan"));
    }

    #[tokio::test]
    async fn test_malformed_chunk_keeps_existing_buffer() {
        let reassembler = ChunkReassembler::new();
        reassembler.feed("chan", &chunk(1, 2, "a")).unwrap();
        assert!(reassembler.feed("chan", "{not json").is_err());
        assert!(reassembler.is_pending("chan"));
        let message = reassembler.feed("chan", &chunk(2, 2, "b")).unwrap();
        assert_eq!(message.as_deref(), Some("ab"));
    }

    #[tokio::test]
    async fn test_channels_are_independent() {
        let reassembler = ChunkReassembler::new();
        reassembler.feed("red", &chunk(1, 2, "r1")).unwrap();
        reassembler.feed("blue", &chunk(1, 2, "b1")).unwrap();
        assert_eq!(reassembler.pending_count(), 2);

        let blue = reassembler.feed("blue", &chunk(2, 2, "b2")).unwrap();
        assert_eq!(blue.as_deref(), Some("b1b2"));
        assert!(reassembler.is_pending("red"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_buffer_expires() {
        let reassembler = ChunkReassembler::new();
        reassembler.feed("chan", &chunk(1, 2, "a")).unwrap();

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(reassembler.is_pending("chan"));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!reassembler.is_pending("chan"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_chunk_starts_fresh_buffer() {
        let reassembler = ChunkReassembler::with_timeout(Duration::from_secs(5));
        reassembler.feed("chan", &chunk(1, 2, "a")).unwrap();
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(!reassembler.is_pending("chan"));

        // Chunk 2 no longer completes anything; it opens a new buffer
        assert_eq!(reassembler.feed("chan", &chunk(2, 2, "b")).unwrap(), None);
        assert!(reassembler.is_pending("chan"));

        let message = reassembler.feed("chan", &chunk(1, 2, "A")).unwrap();
        assert_eq!(message.as_deref(), Some("Ab"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_buffer_cancels_its_timer() {
        let reassembler = ChunkReassembler::with_timeout(Duration::from_secs(10));
        reassembler.feed("chan", &chunk(1, 1, "done")).unwrap();
        reassembler.feed("chan", &chunk(1, 2, "a")).unwrap();

        tokio::time::sleep(Duration::from_secs(4)).await;
        // Complete, then start another message for the same channel
        reassembler.feed("chan", &chunk(2, 2, "b")).unwrap();
        reassembler.feed("chan", &chunk(1, 2, "c")).unwrap();

        // The first buffer's deadline passes without touching the second one
        tokio::time::sleep(Duration::from_secs(7)).await;
        assert!(reassembler.is_pending("chan"));

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(!reassembler.is_pending("chan"));
    }
}
