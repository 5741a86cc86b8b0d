//! IPC message types.
//!
//! This module defines the messages a supervised child sends to the
//! supervisor, one JSON object per line.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Message from the child to the supervisor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ChildMessage {
    /// Files the child has loaded.
    AddPaths {
        paths: Vec<PathBuf>,
        /// Set on the first bulk report of everything loaded so far.
        #[serde(default)]
        initial: bool,
    },
}

impl ChildMessage {
    /// Parse one protocol line. Anything that is not a known message yields
    /// `None` and is ignored by the supervisor.
    #[must_use]
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match serde_json::from_str(line) {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring unrecognized child message");
                None
            }
        }
    }

    /// Serialize to a single protocol line, newline included.
    ///
    /// # Errors
    ///
    /// Returns an error if a path cannot be represented as a JSON string.
    pub fn to_line(&self) -> Result<String, IpcError> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Errors that can occur during IPC.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// Socket I/O failed.
    #[error("IPC socket error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize or deserialize a message.
    #[error("Failed to serialize message: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// No supervisor socket was advertised to this process.
    #[error("Supervisor not running (no report socket)")]
    SupervisorNotRunning,
}
