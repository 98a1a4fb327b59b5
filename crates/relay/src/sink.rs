//! Log-backed output sink.
//!
//! Chat platform integration is pluggable through [`OutputSink`]; the
//! binary ships with a sink that writes every delivery to the log, which is
//! enough to run the relay headless and watch what it would post.

use async_trait::async_trait;
use relay_core::{OutputSink, SinkError, StatusCard, StatusUpdate};
use std::collections::HashSet;
use tracing::{debug, info};

/// Sink that logs deliveries for the configured channels.
#[derive(Debug, Clone, Default)]
pub struct LogSink {
    channels: HashSet<String>,
}

impl LogSink {
    pub fn new<I, S>(channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            channels: channels.into_iter().map(Into::into).collect(),
        }
    }

    fn check_channel(&self, channel: &str) -> Result<(), SinkError> {
        if self.channels.contains(channel) {
            Ok(())
        } else {
            Err(SinkError::UnknownChannel(channel.to_string()))
        }
    }
}

#[async_trait]
impl OutputSink for LogSink {
    async fn send_text(&self, channel: &str, text: &str) -> Result<(), SinkError> {
        self.check_channel(channel)?;
        info!(channel, "💬 {}", text);
        Ok(())
    }

    async fn send_status(&self, channel: &str, status: &StatusUpdate) -> Result<(), SinkError> {
        self.check_channel(channel)?;
        let card = StatusCard::from(status);
        info!(channel, "🎮 {}", card.to_text());
        match serde_json::to_string(&card) {
            Ok(json) => debug!(channel, card = %json, "Rendered status card"),
            Err(e) => debug!(channel, "Failed to serialize status card: {}", e),
        }
        Ok(())
    }
}
