//! OS signal handling.
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Only Ctrl-C is handled; the watcher already covers reloads

use crate::lifecycle::shutdown::Shutdown;

/// Wait for Ctrl-C, then trigger `shutdown`.
pub async fn shutdown_on_ctrl_c(shutdown: Shutdown) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Interrupt received, stopping"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C, stopping"),
    }
    shutdown.trigger();
}
