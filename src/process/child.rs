//! Supervised child process spawning and control.
//!
//! This module provides a builder for the child command line and control
//! methods for the running child.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};

/// Error type for process spawning operations.
#[derive(thiserror::Error, Debug)]
pub enum SpawnError {
    /// The program was not found.
    #[error("Program not found: {0}")]
    NotFound(String),
    /// Permission denied when spawning.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    /// Other I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SpawnError {
    /// Create a `SpawnError` from an I/O error, classifying common cases.
    fn from_io(err: std::io::Error, program: &str) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(program.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(program.to_string()),
            _ => Self::Io(err),
        }
    }
}

/// Builder for the command line of the supervised program.
///
/// With a runtime the command is
/// `runtime [forwarded flags] [reporter flags] entry [args]`; without one the
/// entry is executed directly and forwarded flags precede its arguments.
#[derive(Debug, Clone, Default)]
pub struct ChildCommand {
    entry: PathBuf,
    args: Vec<String>,
    runtime: Option<String>,
    runtime_flags: Vec<String>,
    reporter_args: Vec<String>,
    env: Vec<(String, OsString)>,
    working_dir: Option<PathBuf>,
}

impl ChildCommand {
    /// Create a new builder for the given entry path.
    #[must_use]
    pub fn new(entry: impl Into<PathBuf>) -> Self {
        Self {
            entry: entry.into(),
            ..Default::default()
        }
    }

    /// Arguments passed to the entry.
    #[must_use]
    pub fn args(mut self, args: &[String]) -> Self {
        self.args = args.to_vec();
        self
    }

    /// Interpreter used to run the entry.
    #[must_use]
    pub fn runtime(mut self, runtime: Option<String>) -> Self {
        self.runtime = runtime;
        self
    }

    /// Flags forwarded to the runtime.
    #[must_use]
    pub fn runtime_flags(mut self, flags: &[String]) -> Self {
        self.runtime_flags = flags.to_vec();
        self
    }

    /// Runtime flags that load the path reporter into the child.
    #[must_use]
    pub fn reporter_args(mut self, args: &[String]) -> Self {
        self.reporter_args = args.to_vec();
        self
    }

    /// Add an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Set the working directory for the child.
    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn entry(&self) -> &Path {
        &self.entry
    }

    /// Program to execute.
    #[must_use]
    pub fn program(&self) -> OsString {
        match &self.runtime {
            Some(runtime) => OsString::from(runtime),
            None => self.entry.clone().into_os_string(),
        }
    }

    /// Build the command-line arguments.
    #[must_use]
    pub fn build_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.runtime_flags.iter().map(OsString::from).collect();

        if self.runtime.is_some() {
            args.extend(self.reporter_args.iter().map(OsString::from));
            args.push(self.entry.clone().into_os_string());
        }

        args.extend(self.args.iter().map(OsString::from));
        args
    }

    /// Environment variables added on top of the inherited environment.
    #[must_use]
    pub fn envs(&self) -> &[(String, OsString)] {
        &self.env
    }
}

/// A running supervised program.
#[derive(Debug)]
pub struct SupervisedChild {
    child: Child,
    pid: Option<u32>,
}

impl SupervisedChild {
    /// Spawn the child with inherited standard streams.
    ///
    /// # Errors
    ///
    /// Returns `SpawnError` if the process fails to spawn.
    pub fn spawn(command: &ChildCommand) -> Result<Self, SpawnError> {
        let program = command.program();

        let mut cmd = Command::new(&program);
        cmd.args(command.build_args())
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        for (key, value) in command.envs() {
            cmd.env(key, value);
        }

        if let Some(ref dir) = command.working_dir {
            cmd.current_dir(dir);
        }

        let child = cmd
            .spawn()
            .map_err(|e| SpawnError::from_io(e, &program.to_string_lossy()))?;
        let pid = child.id();

        tracing::debug!(pid = ?pid, program = %program.to_string_lossy(), "Child spawned");

        Ok(Self { child, pid })
    }

    /// Process ID assigned at spawn.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Wait for the process to exit.
    ///
    /// Cancel safe, so it can be used as a `select!` branch.
    ///
    /// # Errors
    ///
    /// Returns an error if waiting fails.
    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Ask the process to terminate.
    ///
    /// On Unix this sends SIGTERM; elsewhere it falls back to an immediate
    /// kill.
    ///
    /// # Errors
    ///
    /// Returns an error if the signal cannot be delivered.
    pub fn terminate(&mut self) -> std::io::Result<()> {
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let Some(pid) = self.child.id() else {
                // Already reaped
                return Ok(());
            };
            let nix_pid = Pid::from_raw(
                i32::try_from(pid)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?,
            );
            kill(nix_pid, Signal::SIGTERM).map_err(std::io::Error::from)
        }

        #[cfg(not(unix))]
        {
            self.child.start_kill()
        }
    }

    /// Terminate and wait for exit.
    ///
    /// Without a timeout the wait is unbounded. With one, a child still alive
    /// after the timeout is killed.
    ///
    /// # Errors
    ///
    /// Returns an error if the child cannot be signalled or waited on.
    pub async fn terminate_and_wait(
        &mut self,
        kill_timeout: Option<Duration>,
    ) -> std::io::Result<ExitStatus> {
        self.terminate()?;

        let Some(timeout) = kill_timeout else {
            return self.child.wait().await;
        };

        match tokio::time::timeout(timeout, self.child.wait()).await {
            Ok(status) => status,
            Err(_) => {
                tracing::warn!(pid = ?self.pid, "Child ignored SIGTERM, killing");
                self.child.kill().await?;
                self.child.wait().await
            }
        }
    }
}
