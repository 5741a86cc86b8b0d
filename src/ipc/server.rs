//! IPC server for the supervisor.
//!
//! This module provides the server side of the report channel: it accepts
//! connections from the supervised child and forwards every recognized
//! message to the supervisor loop.

use std::path::{Path, PathBuf};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, watch};

use crate::ipc::{ChildMessage, IpcError};

/// Report server of one generation.
///
/// The server listens on a Unix domain socket and spawns a reader for each
/// incoming connection. A child may keep one connection open for its whole
/// lifetime or connect once per report.
#[derive(Debug)]
pub struct ReportServer {
    socket_path: PathBuf,
}

impl ReportServer {
    /// Creates a new report server for the given socket path.
    #[must_use]
    pub fn new<P: AsRef<Path>>(socket_path: P) -> Self {
        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
        }
    }

    /// Returns the socket path.
    #[must_use]
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Binds the socket and starts accepting connections.
    ///
    /// Messages from all connections arrive on the returned receiver in the
    /// order each connection sent them.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the socket.
    pub fn start(
        &self,
    ) -> Result<(ServerHandle, mpsc::UnboundedReceiver<ChildMessage>), IpcError> {
        // Remove a stale socket file left by a crashed supervisor
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        let listener = UnixListener::bind(&self.socket_path)?;

        tracing::debug!(path = %self.socket_path.display(), "Report server started");

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let (message_tx, message_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;

                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::debug!("Report server shutting down");
                            break;
                        }
                    }

                    accept_result = listener.accept() => {
                        match accept_result {
                            Ok((stream, _addr)) => {
                                let message_tx = message_tx.clone();
                                let shutdown_rx = shutdown_rx.clone();
                                tokio::spawn(async move {
                                    if let Err(e) = handle_connection(stream, message_tx, shutdown_rx).await {
                                        tracing::warn!(error = %e, "Report connection error");
                                    }
                                });
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "Failed to accept report connection");
                            }
                        }
                    }
                }
            }
        });

        Ok((
            ServerHandle {
                socket_path: self.socket_path.clone(),
                shutdown_tx,
            },
            message_rx,
        ))
    }
}

/// Handle for a running report server.
///
/// When dropped, the server stops and the socket file is cleaned up.
#[derive(Debug)]
pub struct ServerHandle {
    socket_path: PathBuf,
    shutdown_tx: watch::Sender<bool>,
}

impl ServerHandle {
    /// Signals the server and its connection readers to shut down.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Returns the socket path.
    #[must_use]
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);

        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                tracing::warn!(
                    path = %self.socket_path.display(),
                    error = %e,
                    "Failed to remove socket file"
                );
            }
        }
    }
}

/// Reads protocol lines from one child connection until EOF or shutdown.
async fn handle_connection(
    stream: UnixStream,
    message_tx: mpsc::UnboundedSender<ChildMessage>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<(), IpcError> {
    let mut lines = BufReader::new(stream).lines();

    loop {
        tokio::select! {
            biased;

            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    return Ok(());
                }
            }

            line = lines.next_line() => {
                let Some(line) = line? else {
                    return Ok(());
                };
                if let Some(message) = ChildMessage::parse_line(&line) {
                    if message_tx.send(message).is_err() {
                        // Supervisor moved on to the next generation
                        return Ok(());
                    }
                }
            }
        }
    }
}
