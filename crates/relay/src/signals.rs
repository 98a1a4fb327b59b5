//! Signal handling for graceful shutdown.
//!
//! The first termination signal starts a graceful shutdown; a second one
//! received while shutting down exits immediately.

use tokio::signal;
use tracing::info;

/// Waits for a termination signal and logs it.
///
/// Listens for SIGINT and SIGTERM on Unix and Ctrl+C on Windows.
pub async fn setup_signal_handlers() -> Result<(), Box<dyn std::error::Error>> {
    setup_signal_handlers_silent().await?;
    info!("📡 Received shutdown signal - initiating graceful shutdown");
    Ok(())
}

/// Waits for a termination signal without logging.
pub async fn setup_signal_handlers_silent() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => (),
            _ = sigterm.recv() => ()
        }
    }

    #[cfg(windows)]
    signal::ctrl_c().await?;

    Ok(())
}
