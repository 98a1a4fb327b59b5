//! Main application logic and lifecycle management.
//!
//! This module contains the `Application` struct that builds the shared
//! dispatcher, starts one gate per configured backend server and shuts them
//! down on a termination signal.

use crate::{
    cli::CliArgs,
    config::AppConfig,
    logging::display_banner,
    signals::{setup_signal_handlers, setup_signal_handlers_silent},
    sink::LogSink,
};
use futures::stream::{FuturesUnordered, StreamExt};
use relay_core::{ChunkReassembler, MessageDispatcher, OutputSink, ServerGate};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// How long gates get to wind down after shutdown is requested.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Main application struct.
///
/// Owns the loaded configuration and one [`ServerGate`] per configured
/// server. All gates share a single [`MessageDispatcher`], and with it the
/// reassembly buffers.
pub struct Application {
    /// Loaded application configuration
    config: AppConfig,
    /// Dispatcher shared by all gates
    dispatcher: Arc<MessageDispatcher>,
    /// One gate per configured server
    gates: Vec<Arc<ServerGate>>,
}

impl Application {
    /// Creates a new application instance.
    ///
    /// # Process
    ///
    /// 1. Load configuration from file (creating a default TOML if missing)
    /// 2. Apply command-line argument overrides
    /// 3. Validate merged configuration
    /// 4. Build the sink, reassembler, dispatcher and gates
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }
        if args.json_logs {
            config.logging.json_format = true;
        }
        if args.debug {
            config.debug = true;
        }

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration loaded and validated successfully");

        display_banner();

        let sink = LogSink::new(config.servers.iter().map(|server| server.channel.clone()));
        Ok(Self::with_sink(config, Arc::new(sink)))
    }

    /// Builds the application around an already validated configuration
    /// and a caller-supplied sink.
    pub fn with_sink(config: AppConfig, sink: Arc<dyn OutputSink>) -> Self {
        let reassembler = ChunkReassembler::with_timeout(config.reassembly.timeout());
        let dispatcher = Arc::new(MessageDispatcher::new(reassembler, sink));
        let gates = config
            .to_server_configs()
            .into_iter()
            .map(|server| Arc::new(ServerGate::new(server, dispatcher.clone())))
            .collect();

        Self {
            config,
            dispatcher,
            gates,
        }
    }

    /// Runs the relay until a termination signal arrives.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("🌟 Starting relay");
        self.log_configuration_summary();

        let supervisor = self.spawn_gates();

        info!("✅ Relay is now running!");
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        setup_signal_handlers().await?;

        // merciless shutdown
        tokio::spawn(async move {
            if let Err(e) = setup_signal_handlers_silent().await {
                error!("Failed to set up merciless shutdown signal handler: {e}");
                return;
            }

            warn!("Shutdown handler received again! I'll make this quick.");
            std::process::exit(1);
        });

        self.shutdown(supervisor).await;
        Ok(())
    }

    /// Starts every gate and returns a task that supervises them.
    ///
    /// A gate that fails to bind is logged and the remaining gates keep
    /// running.
    fn spawn_gates(&self) -> JoinHandle<()> {
        let mut running: FuturesUnordered<_> = self
            .gates
            .iter()
            .cloned()
            .map(|gate| async move {
                let result = gate.start().await;
                (gate, result)
            })
            .collect();

        tokio::spawn(async move {
            while let Some((gate, result)) = running.next().await {
                match result {
                    Ok(()) => info!("✅ Server {} stopped", gate.name()),
                    Err(e) => error!("❌ Server {} failed: {}", gate.name(), e),
                }
            }
        })
    }

    /// Stops all gates and logs final statistics.
    async fn shutdown(&self, supervisor: JoinHandle<()>) {
        info!("🛑 Shutdown signal received, beginning graceful shutdown...");
        for gate in &self.gates {
            gate.shutdown();
        }

        match tokio::time::timeout(SHUTDOWN_GRACE, supervisor).await {
            Ok(Ok(())) => info!("✅ All servers stopped"),
            Ok(Err(e)) => error!("❌ Server supervisor failed: {}", e),
            Err(_) => warn!("⏰ Servers did not stop within {:?}, proceeding", SHUTDOWN_GRACE),
        }

        self.log_final_statistics();
        info!("✅ Relay shutdown complete");
    }

    /// Logs the configuration summary at startup.
    fn log_configuration_summary(&self) {
        info!("📋 Configuration Summary:");
        info!("  🧩 Reassembly timeout: {}s", self.config.reassembly.timeout_secs);
        for gate in &self.gates {
            let server = gate.config();
            info!(
                "  🎮 {} on {} → channel {}{}",
                server.name,
                server.bind_address(),
                server.channel,
                if server.debug { " (debug)" } else { "" }
            );
        }
    }

    fn log_final_statistics(&self) {
        let pending = self.dispatcher.reassembler().pending_count();
        info!("📊 Final Statistics:");
        info!("  - Servers: {}", self.gates.len());
        info!("  - Incomplete split messages discarded: {}", pending);
        self.dispatcher.reassembler().clear();
    }
}
