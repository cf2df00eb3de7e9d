//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for SIGINT (Ctrl+C) and SIGTERM on a dedicated thread
//! - Run the exit check (and so the shutdown actions) when one arrives
//!
//! # Design Decisions
//! - Uses Tokio's signal handling on a private current-thread runtime, so
//!   hosts without an async runtime can still listen
//! - Races safely with an explicit `terminate()`: the exactly-once guard
//!   decides which caller runs the shutdown actions, and the listener waits
//!   for them to finish before exiting

use std::io;
use std::sync::{Arc, Weak};
use std::thread;

use crate::lifecycle::Kernel;

/// Spawn the signal listener for `kernel`.
pub fn spawn_listener(kernel: &Arc<Kernel>) -> io::Result<thread::JoinHandle<()>> {
    let kernel: Weak<Kernel> = Arc::downgrade(kernel);
    thread::Builder::new()
        .name("kernel-signals".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to start signal listener runtime");
                    return;
                }
            };
            if !runtime.block_on(wait_for_shutdown_signal()) {
                return;
            }

            let Some(kernel) = kernel.upgrade() else {
                return;
            };
            kernel.interceptor().handle_exit();
            // An explicit terminate() may still be running its actions.
            kernel.wait_for_termination();
            std::process::exit(0);
        })
}

/// Returns `false` when no handler could be installed.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> bool {
    use tokio::signal::unix::{signal, SignalKind};

    let ctrl_c = tokio::signal::ctrl_c();
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = ctrl_c => tracing::info!("received SIGINT"),
                _ = sigterm.recv() => tracing::info!("received SIGTERM"),
            }
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install SIGTERM handler, listening for SIGINT only");
            let received = ctrl_c.await.is_ok();
            if received {
                tracing::info!("received SIGINT");
            }
            received
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> bool {
    let received = tokio::signal::ctrl_c().await.is_ok();
    if received {
        tracing::info!("received Ctrl+C");
    }
    received
}
