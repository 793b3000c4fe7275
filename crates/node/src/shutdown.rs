//! Termination signal handling.
//!
//! SIGINT, SIGTERM and SIGQUIT all cancel the same token. Cancelling is
//! idempotent, so repeated or concurrent signals lead to a single shutdown.

use std::io;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Installs the signal handlers and spawns a task that cancels `token` on the
/// first termination signal. The task ends once the token is cancelled.
#[cfg(unix)]
pub fn spawn_signal_listener(token: CancellationToken) -> io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;

    Ok(tokio::spawn(async move {
        let received = tokio::select! {
            _ = interrupt.recv() => "SIGINT",
            _ = terminate.recv() => "SIGTERM",
            _ = quit.recv() => "SIGQUIT",
            _ = token.cancelled() => return,
        };
        info!(target: "app", signal = received, "termination signal received");
        token.cancel();
    }))
}

#[cfg(not(unix))]
pub fn spawn_signal_listener(token: CancellationToken) -> io::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if result.is_ok() {
                    info!(target: "app", signal = "ctrl-c", "termination signal received");
                }
            }
            _ = token.cancelled() => return,
        }
        token.cancel();
    }))
}
