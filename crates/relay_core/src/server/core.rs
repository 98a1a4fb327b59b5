//! The per-server connection gate.
//!
//! A `ServerGate` owns the listening socket for one configured backend and
//! serves at most one live connection at a time. When a new connection is
//! accepted while another is still open, the older connection is cancelled
//! and runs its normal teardown, so only the newest connection feeds the
//! dispatcher.

use crate::{
    config::ServerConnectionConfig,
    connection::{ConnectionId, ConnectionState},
    error::ServerError,
    messaging::MessageDispatcher,
    server::handlers::handle_connection,
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// The connection currently wired to the dispatcher.
struct ActiveConnection {
    id: ConnectionId,
    remote_addr: SocketAddr,
    cancel: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Listener and connection owner for one configured backend server.
///
/// # Lifecycle
///
/// `Listening → Connected(unauthenticated) → Connected(authenticated) → Closed`,
/// then back to accepting. Authentication never carries over between
/// connections.
pub struct ServerGate {
    /// Configuration for this backend
    config: Arc<ServerConnectionConfig>,

    /// Dispatcher shared with the other gates
    dispatcher: Arc<MessageDispatcher>,

    /// Channel for coordinating gate shutdown
    shutdown_sender: broadcast::Sender<()>,

    /// Counter for connection identifiers
    next_connection_id: AtomicUsize,
}

impl ServerGate {
    /// Creates a gate for `config` that forwards into `dispatcher`.
    pub fn new(config: ServerConnectionConfig, dispatcher: Arc<MessageDispatcher>) -> Self {
        let (shutdown_sender, _) = broadcast::channel(1);
        Self {
            config: Arc::new(config),
            dispatcher,
            shutdown_sender,
            next_connection_id: AtomicUsize::new(1),
        }
    }

    /// Configured name of the backend server.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &ServerConnectionConfig {
        &self.config
    }

    /// Binds the configured listening address.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let address = self.config.bind_address();
        info!("🚀 Starting TCP server {} on port {}...", self.config.name, self.config.port);
        TcpListener::bind(address)
            .await
            .map_err(|source| ServerError::Bind { address, source })
    }

    /// Binds the listener and serves connections until shutdown.
    ///
    /// A bind failure is returned immediately and affects this gate only.
    pub async fn start(&self) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Requests the accept loop to stop and the live connection to close.
    pub fn shutdown(&self) {
        // No receivers simply means the gate is not serving
        let _ = self.shutdown_sender.send(());
    }

    /// Serves connections from an already bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        let mut shutdown_receiver = self.shutdown_sender.subscribe();
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::Network(format!("Failed to read local address: {e}")))?;
        info!("🎧 Server {} listening on {}", self.config.name, local_addr);

        let mut active: Option<ActiveConnection> = None;

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        if let Some(previous) = active.take() {
                            self.retire(previous);
                        }
                        active = Some(self.spawn_connection(stream, addr));
                    }
                    Err(e) => {
                        error!("Failed to accept connection on {}: {}", self.config.name, e);
                    }
                },
                _ = shutdown_receiver.recv() => {
                    info!("🛑 Server {} stopping", self.config.name);
                    break;
                }
            }
        }

        if let Some(previous) = active.take() {
            // A finished connection has dropped its receiver
            let _ = previous.cancel.send(());
            let _ = previous.task.await;
        }
        Ok(())
    }

    fn retire(&self, previous: ActiveConnection) {
        if previous.task.is_finished() {
            return;
        }
        warn!(
            "🔁 New connection for {} replaces connection {} from {}",
            self.config.name, previous.id, previous.remote_addr
        );
        let _ = previous.cancel.send(());
    }

    fn spawn_connection(&self, stream: tokio::net::TcpStream, addr: SocketAddr) -> ActiveConnection {
        let id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
        info!("🔗 {} connected from {}!", self.config.client_name(), addr);

        let state = ConnectionState::new(id, addr);
        let config = self.config.clone();
        let dispatcher = self.dispatcher.clone();
        let (cancel, cancelled) = oneshot::channel();
        let task = tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, state, config, dispatcher, cancelled).await {
                error!("Connection error: {}", e);
            }
        });

        ActiveConnection {
            id,
            remote_addr: addr,
            cancel,
            task,
        }
    }
}
