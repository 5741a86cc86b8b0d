//! Stop signal handling.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Cancel `cancel` on the first SIGINT, SIGTERM or SIGHUP.
///
/// Handlers are installed before this returns, so a signal arriving right
/// after startup is not lost.
///
/// # Errors
///
/// Returns an error if a signal handler cannot be installed.
#[cfg(unix)]
pub fn spawn_signal_listener(cancel: CancellationToken) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut hangup = signal(SignalKind::hangup())?;

    Ok(tokio::spawn(async move {
        let name = tokio::select! {
            _ = interrupt.recv() => "SIGINT",
            _ = terminate.recv() => "SIGTERM",
            _ = hangup.recv() => "SIGHUP",
            () = cancel.cancelled() => return,
        };
        tracing::info!(signal = name, "Stop signal received");
        cancel.cancel();
    }))
}

/// Cancel `cancel` on Ctrl-C.
///
/// # Errors
///
/// Never fails on this platform; the signature matches the Unix variant.
#[cfg(not(unix))]
pub fn spawn_signal_listener(cancel: CancellationToken) -> std::io::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "Cannot listen for Ctrl-C");
                    return;
                }
            }
            () = cancel.cancelled() => return,
        }
        tracing::info!("Stop signal received");
        cancel.cancel();
    }))
}
