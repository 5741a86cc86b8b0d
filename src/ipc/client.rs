//! Reporter client for supervised programs.
//!
//! A program running under the supervisor uses [`Reporter`] to announce the
//! files it loads. Paths are sent over the report socket as they are
//! discovered, and all of them are written to the crash-safe report file when
//! the program exits.
//!
//! Outside the supervisor the environment variables are absent and every
//! operation is a no-op, so programs can report unconditionally.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;

use crate::ipc::{
    write_report_file, ChildMessage, IpcError, ReportFileError, REPORT_FILE_ENV, SOCKET_ENV,
};

/// Default timeout for connecting and sending a report.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Child-side reporter of loaded paths.
#[derive(Debug)]
pub struct Reporter {
    socket_path: Option<PathBuf>,
    report_file: Option<PathBuf>,
    stream: Option<UnixStream>,
    reported: BTreeSet<PathBuf>,
    sent_initial: bool,
    timeout: Duration,
}

impl Reporter {
    /// Creates a reporter from the variables the supervisor sets at spawn.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(
            std::env::var_os(SOCKET_ENV).map(PathBuf::from),
            std::env::var_os(REPORT_FILE_ENV).map(PathBuf::from),
        )
    }

    /// Creates a reporter with explicit socket and report-file paths.
    #[must_use]
    pub fn new(socket_path: Option<PathBuf>, report_file: Option<PathBuf>) -> Self {
        Self {
            socket_path,
            report_file,
            stream: None,
            reported: BTreeSet::new(),
            sent_initial: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the timeout for socket operations.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether this process runs under a supervisor.
    #[must_use]
    pub fn is_supervised(&self) -> bool {
        self.socket_path.is_some()
    }

    /// Paths reported so far.
    #[must_use]
    pub fn reported(&self) -> &BTreeSet<PathBuf> {
        &self.reported
    }

    /// Report loaded paths.
    ///
    /// Paths already reported are skipped. The first report that reaches the
    /// supervisor is flagged as the initial one. Paths are remembered even
    /// when sending fails so that [`Reporter::write_report_file`] still
    /// covers them.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be reached in time or the
    /// message cannot be sent.
    pub async fn report_paths<I, P>(&mut self, paths: I) -> Result<(), IpcError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let fresh: Vec<PathBuf> = paths
            .into_iter()
            .map(|p| p.as_ref().to_path_buf())
            .filter(|p| self.reported.insert(p.clone()))
            .collect();

        if (fresh.is_empty() && self.sent_initial) || self.socket_path.is_none() {
            return Ok(());
        }

        // The initial report carries everything known so far, including paths
        // from earlier attempts that never reached the supervisor.
        let message = if self.sent_initial {
            ChildMessage::AddPaths {
                paths: fresh,
                initial: false,
            }
        } else {
            ChildMessage::AddPaths {
                paths: self.reported.iter().cloned().collect(),
                initial: true,
            }
        };
        self.send(&message).await?;
        self.sent_initial = true;
        Ok(())
    }

    /// Write every known path to the report file. Call this on exit,
    /// including error exits.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_report_file(&self) -> Result<(), ReportFileError> {
        match &self.report_file {
            Some(path) => write_report_file(path, &self.reported),
            None => Ok(()),
        }
    }

    async fn send(&mut self, message: &ChildMessage) -> Result<(), IpcError> {
        let socket_path = self
            .socket_path
            .clone()
            .ok_or(IpcError::SupervisorNotRunning)?;
        let line = message.to_line()?;
        let timeout = self.timeout;

        let result = tokio::time::timeout(timeout, async {
            if self.stream.is_none() {
                self.stream = Some(UnixStream::connect(&socket_path).await?);
            }
            if let Some(stream) = self.stream.as_mut() {
                stream.write_all(line.as_bytes()).await?;
                stream.flush().await?;
            }
            Ok::<(), std::io::Error>(())
        })
        .await;

        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                // Reconnect on the next report
                self.stream = None;
                Err(IpcError::Io(e))
            }
            Err(_) => {
                self.stream = None;
                Err(IpcError::Io(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("report timed out after {}ms", timeout.as_millis()),
                )))
            }
        }
    }
}
