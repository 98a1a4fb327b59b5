//! Connection handling logic for backend servers.
//!
//! This module contains the per-connection read loop: the `PASS` handshake,
//! the post-authentication guard and the hand-off of payloads to the
//! [`MessageDispatcher`].

use crate::{
    config::ServerConnectionConfig,
    connection::{
        is_auth_line, strip_pass_lines, trim_line_ending, ConnectionState, AUTH_ACCEPTED,
        AUTH_REJECTED,
    },
    error::ServerError,
    messaging::{MessageDispatcher, MessageOrigin},
};
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

/// Size of a single read once the connection is authenticated.
const READ_BUFFER_SIZE: usize = 16 * 1024;

/// Longest line accepted before authentication, line ending included.
pub const MAX_AUTH_LINE: usize = 512;

/// How a connection ended, for logging.
enum Termination {
    EndOfStream,
    TimedOut,
    Cancelled,
}

async fn read_with_timeout<F>(read: F, idle_timeout: Option<Duration>) -> io::Result<usize>
where
    F: Future<Output = io::Result<usize>>,
{
    match idle_timeout {
        Some(limit) => tokio::time::timeout(limit, read)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "idle timeout elapsed"))?,
        None => read.await,
    }
}

/// Decodes the valid UTF-8 prefix of `pending` and drains it.
///
/// An incomplete multi-byte sequence at the end stays in `pending` for the
/// next read; anything else that is invalid is replaced.
fn drain_utf8(pending: &mut Vec<u8>) -> String {
    let valid_up_to = match std::str::from_utf8(pending) {
        Ok(_) => pending.len(),
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        Err(_) => pending.len(),
    };
    let text = String::from_utf8_lossy(&pending[..valid_up_to]).into_owned();
    pending.drain(..valid_up_to);
    text
}

/// Handles a single backend connection from accept to teardown.
///
/// # Connection Flow
///
/// 1. Read lines until one equals `PASS <secret>`, answering `401` to each
///    mismatch and `200` to the match
/// 2. Read chunks of bytes, strip trailing line endings and any `PASS` lines
/// 3. Hand each chunk to the dispatcher tagged with server and channel
/// 4. On end-of-stream, idle timeout, socket error or a signal on `cancel`,
///    close the socket
///
/// End-of-stream, idle timeouts and cancellation are normal terminations;
/// socket errors and oversized authentication lines are returned as
/// [`ServerError::Network`] after cleanup.
pub async fn handle_connection(
    stream: TcpStream,
    mut state: ConnectionState,
    config: Arc<ServerConnectionConfig>,
    dispatcher: Arc<MessageDispatcher>,
    cancel: oneshot::Receiver<()>,
) -> Result<(), ServerError> {
    let client_name = config.client_name();
    let (read_half, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    // A dropped sender cancels as well
    let outcome = tokio::select! {
        outcome = run_protocol(&mut reader, &mut writer, &mut state, &config, &dispatcher) => outcome,
        _ = cancel => Ok(Termination::Cancelled),
    };
    let result = match outcome {
        Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(Termination::TimedOut),
        other => other,
    };

    match &result {
        Ok(Termination::EndOfStream) => info!("👋 {} disconnected.", client_name),
        Ok(Termination::TimedOut) => info!("⏰ {} timed out.", client_name),
        Ok(Termination::Cancelled) => info!("✂️ {} closed by the relay.", client_name),
        Err(e) => error!("{} errored: {}", client_name, e),
    }

    info!("🧹 Cleaning up client ({}).", client_name);
    let reached = state.phase();
    state.close();
    let _ = writer.shutdown().await;

    debug!(
        connection_id = state.id,
        phase = ?reached,
        uptime_secs = state.uptime().as_secs(),
        "Connection closed"
    );

    result
        .map(|_| ())
        .map_err(|e| ServerError::Network(format!("{client_name}: {e}")))
}

async fn run_protocol(
    reader: &mut BufReader<OwnedReadHalf>,
    writer: &mut OwnedWriteHalf,
    state: &mut ConnectionState,
    config: &ServerConnectionConfig,
    dispatcher: &MessageDispatcher,
) -> io::Result<Termination> {
    let client_name = config.client_name();
    let idle_timeout = config.idle_timeout();
    let origin = MessageOrigin::new(config.name.clone(), config.channel.clone());

    // Authentication phase: one line per attempt
    let mut line = Vec::new();
    while !state.is_authenticated() {
        line.clear();
        let mut limited = (&mut *reader).take(MAX_AUTH_LINE as u64 + 1);
        if read_with_timeout(limited.read_until(b'\n', &mut line), idle_timeout).await? == 0 {
            return Ok(Termination::EndOfStream);
        }
        if line.len() > MAX_AUTH_LINE {
            writer.write_all(AUTH_REJECTED).await?;
            warn!("🚫 {} sent an oversized line before authenticating.", client_name);
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("authentication line exceeds {MAX_AUTH_LINE} bytes"),
            ));
        }
        let text = String::from_utf8_lossy(&line);
        let text = trim_line_ending(&text);
        if config.debug {
            info!("{}: {}", client_name, text);
        }

        if is_auth_line(text, &config.password) {
            writer.write_all(AUTH_ACCEPTED).await?;
            state.authenticate();
            info!("🔐 {} logged in to {}.", client_name, config.name);
        } else {
            writer.write_all(AUTH_REJECTED).await?;
            warn!("🚫 {} failed to authenticate on {}.", client_name, config.name);
        }
    }

    // Forwarding phase: every read is a payload
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    let mut pending = Vec::new();
    loop {
        let read = read_with_timeout(reader.read(&mut buffer), idle_timeout).await?;
        if read == 0 {
            return Ok(Termination::EndOfStream);
        }
        pending.extend_from_slice(&buffer[..read]);
        let text = drain_utf8(&mut pending);
        let message = trim_line_ending(&text);
        if message.is_empty() {
            continue;
        }
        if config.debug {
            info!("{}: {}", client_name, message);
        }

        let (guarded, removed) = strip_pass_lines(message);
        if removed > 0 {
            warn!("🔒 Password was sent when already authed on {}...", config.name);
        }
        if guarded.trim().is_empty() {
            continue;
        }

        dispatcher.dispatch(&origin, &guarded).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_utf8_keeps_incomplete_tail() {
        // "é" is 0xC3 0xA9; split it across two reads
        let mut pending = b"caf\xC3".to_vec();
        assert_eq!(drain_utf8(&mut pending), "caf");
        assert_eq!(pending, vec![0xC3]);

        pending.push(0xA9);
        assert_eq!(drain_utf8(&mut pending), "é");
        assert!(pending.is_empty());
    }

    #[test]
    fn test_drain_utf8_replaces_invalid_bytes() {
        let mut pending = b"bad\xFFbyte".to_vec();
        assert_eq!(drain_utf8(&mut pending), "bad\u{FFFD}byte");
        assert!(pending.is_empty());
    }
}
