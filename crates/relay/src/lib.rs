//! # Game Status Relay - Main Entry Point
//!
//! Bridges backend game servers to chat channels. Each configured server
//! gets its own authenticated TCP listener; messages and live status updates
//! are reassembled, validated and handed to an output sink.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration
//! relay
//!
//! # Use an existing bot configuration
//! relay --config config.json
//!
//! # Log every chunk received, as JSON
//! relay --debug --json-logs --log-level debug
//! ```
//!
//! ## Configuration
//!
//! The relay loads configuration from a TOML file (default: `config.toml`),
//! or from JSON when the path ends in `.json`. If the file doesn't exist, a
//! default TOML configuration is created.
//!
//! ## Signal Handling
//!
//! The relay shuts down gracefully on SIGINT (Ctrl+C) and SIGTERM (Unix).
//! A second signal exits immediately.

use tracing::error;

mod app;
mod cli;
mod config;
mod logging;
mod signals;
mod sink;

use app::Application;
use cli::CliArgs;

/// Runs the relay from CLI arguments to shutdown.
///
/// # Exit Codes
///
/// * **0**: Successful execution and shutdown
/// * **1**: Error during startup, configuration, or runtime
///
/// Called from the binary's async `main`.
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Load configuration to get logging settings
    let mut logging_settings = AppConfig::load_from_file(&args.config_path)
        .await
        .map(|config| config.logging)
        .unwrap_or_default();
    if let Some(level) = &args.log_level {
        logging_settings.level = level.clone();
    }

    if let Err(e) = logging::setup_logging(&logging_settings, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e}");
            std::process::exit(1);
        }
    }

    Ok(())
}

// Re-export main types for library usage
pub use config::{AppConfig, ConfigError, LoggingSettings, ReassemblySettings};
pub use sink::LogSink;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_default_config_round_trips_through_application() {
        let dir = TempDir::new().unwrap();
        let args = CliArgs {
            config_path: dir.path().join("config.toml"),
            log_level: Some("debug".to_string()),
            json_logs: false,
            debug: true,
        };

        let app = Application::new(args.clone()).await;
        assert!(app.is_ok());
        assert!(args.config_path.exists());
    }

    #[tokio::test]
    async fn test_invalid_override_fails_startup() {
        let dir = TempDir::new().unwrap();
        let args = CliArgs {
            config_path: dir.path().join("config.toml"),
            log_level: Some("loud".to_string()),
            json_logs: false,
            debug: false,
        };

        let err = Application::new(args).await.err().unwrap();
        assert!(err.to_string().contains("Invalid log level"));
    }
}
