//! Supervisor runner driving generations of the child program.
//!
//! This module provides the orchestration layer that connects the change
//! source, the report server, the child process and the per-generation
//! restart logic together.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::SupervisorConfig;
use crate::display;
use crate::ipc::{IpcError, ReportServer, REPORT_FILE_ENV, SOCKET_ENV};
use crate::process::{SpawnError, SupervisedChild};
use crate::supervisor::{
    ChangeNotice, Generation, GenerationExit, GenerationFiles, ScheduleOutcome, SupervisorState,
    SupervisorStateMachine, SupervisorStats,
};
use crate::watcher::{guess_real_path, ChangeSource, WatchSet, WatcherError};

/// Error type for supervisor operations. All variants are fatal.
#[derive(thiserror::Error, Debug)]
pub enum SupervisorError {
    /// The change source could not be armed.
    #[error(transparent)]
    Watcher(#[from] WatcherError),
    /// The report socket could not be bound.
    #[error("Report channel error: {0}")]
    Ipc(#[from] IpcError),
    /// The child could not be started.
    #[error("Failed to start child process: {0}")]
    Spawn(#[from] SpawnError),
    /// The child could not be signalled or reaped after signalling.
    #[error("Failed to stop child process: {0}")]
    Signal(#[source] std::io::Error),
    /// Waiting on the running child failed.
    #[error("Failed to wait for child process: {0}")]
    Wait(#[source] std::io::Error),
}

/// Result of a supervised run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorOutcome {
    /// Exit code the supervisor should exit with.
    pub exit_code: i32,
    pub stats: SupervisorStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GenerationEnd {
    Restart,
    Stop,
}

/// Supervisor restarting the child program whenever a watched path changes.
pub struct Supervisor {
    config: SupervisorConfig,
    /// Canonical working directory, matching the form of watched paths.
    display_root: PathBuf,
    state: SupervisorStateMachine,
    cancel: CancellationToken,
}

impl Supervisor {
    #[must_use]
    pub fn new(config: SupervisorConfig, cancel: CancellationToken) -> Self {
        Self {
            display_root: guess_real_path(&config.working_dir),
            config,
            state: SupervisorStateMachine::new(),
            cancel,
        }
    }

    #[must_use]
    pub fn state(&self) -> SupervisorState {
        self.state.state()
    }

    #[must_use]
    pub fn stats(&self) -> SupervisorStats {
        self.state.stats()
    }

    /// Working directory that changed paths are shown relative to.
    #[must_use]
    pub fn display_root(&self) -> &Path {
        &self.display_root
    }

    /// Check if this supervisor has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run generations until the cancellation token fires.
    ///
    /// # Errors
    ///
    /// Returns an error if the change source cannot be armed, the report
    /// socket cannot be bound, or the child cannot be spawned or stopped.
    pub async fn run(&mut self) -> Result<SupervisorOutcome, SupervisorError> {
        let filter = self.config.path_filter();
        let pinned = vec![self.config.entry_path()];
        let mut seed: BTreeSet<PathBuf> = BTreeSet::new();
        let mut last_exit = GenerationExit::Running;

        display::print_start(&self.config.entry);
        tracing::info!(
            entry = %self.config.entry.display(),
            working_dir = %self.config.working_dir.display(),
            debounce_ms = u64::try_from(self.config.debounce.as_millis()).unwrap_or(u64::MAX),
            "Starting supervisor"
        );

        loop {
            let ordinal = self.state.stats().generations;

            let watch_set = WatchSet::new(filter.clone(), pinned.iter().cloned(), seed);
            let generation = Generation::new(
                ordinal,
                watch_set,
                self.config.debounce,
                GenerationFiles::new(&self.config.runtime_dir),
            );

            let (end, generation) = self.run_generation(generation).await?;
            if generation.exit().has_exited() {
                last_exit = generation.exit();
            }

            match end {
                GenerationEnd::Restart if self.cancel.is_cancelled() => {
                    tracing::info!("Stop requested during restart");
                    self.state.transition(SupervisorState::Stopping);
                    return Ok(self.finish(last_exit));
                }
                GenerationEnd::Restart => {
                    seed = generation.next_seed();
                    tracing::debug!(
                        generation = ordinal,
                        exited_with_error = generation.exited_with_error(),
                        seed = seed.len(),
                        "Seed computed for next generation"
                    );
                    self.state.record_restart();
                    display::print_restart();
                }
                GenerationEnd::Stop => return Ok(self.finish(last_exit)),
            }
        }
    }

    fn finish(&mut self, exit: GenerationExit) -> SupervisorOutcome {
        self.state.transition(SupervisorState::Stopped);
        let exit_code = exit.exit_code();
        tracing::info!(exit_code, "Supervisor stopped");
        SupervisorOutcome {
            exit_code,
            stats: self.state.stats(),
        }
    }

    /// Start one generation, service it until it restarts or stops, and tear
    /// it down.
    async fn run_generation(
        &mut self,
        mut generation: Generation,
    ) -> Result<(GenerationEnd, Generation), SupervisorError> {
        self.state.transition(SupervisorState::Starting);

        // Armed before the child starts so that no early edit is missed
        let (mut source, mut changes) = ChangeSource::start(self.config.event_tick)?;
        source.watch_paths(generation.watched_paths());

        let files = generation.files().clone();
        let (server, mut messages) = ReportServer::new(&files.socket_path).start()?;

        if self.cancel.is_cancelled() {
            tracing::info!("Supervisor cancelled before spawn");
            self.state.transition(SupervisorState::Stopping);
            server.shutdown();
            source.stop().await;
            return Ok((GenerationEnd::Stop, generation));
        }

        let command = self
            .config
            .child_command()
            .env(SOCKET_ENV, files.socket_path.as_os_str())
            .env(REPORT_FILE_ENV, files.report_file.as_os_str());
        let mut child = SupervisedChild::spawn(&command)?;
        self.state.record_generation();

        self.state.transition(SupervisorState::Running);
        tracing::debug!(
            generation = generation.ordinal(),
            pid = ?child.pid(),
            watched = generation.watched_paths().len(),
            "Generation running"
        );

        let cancel = self.cancel.clone();
        let mut exited = false;

        let end = loop {
            let deadline = generation.restart_deadline();

            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("Supervisor cancelled");
                    break GenerationEnd::Stop;
                }

                () = sleep_until(deadline) => {
                    if generation.poll_restart(Instant::now()) {
                        break GenerationEnd::Restart;
                    }
                }

                Some(message) = messages.recv() => {
                    let added = generation.handle_message(message);
                    source.watch_paths(&added);
                }

                Some(event) = changes.recv() => {
                    if let Some(outcome) = generation.handle_change(&event, Instant::now()) {
                        self.announce(&outcome);
                    }
                }

                status = child.wait(), if !exited => {
                    let status = status.map_err(SupervisorError::Wait)?;
                    exited = true;
                    let exit = GenerationExit::from_status(status, false);
                    generation.record_exit(exit);
                    display::print_exit(exit);
                    let added = generation.consume_report_file();
                    source.watch_paths(&added);
                }
            }
        };

        self.state.transition(match end {
            GenerationEnd::Restart => SupervisorState::Restarting,
            GenerationEnd::Stop => SupervisorState::Stopping,
        });
        generation.begin_teardown();

        server.shutdown();
        source.stop().await;

        if !exited {
            display::print_killing(child.pid());
            let status = child
                .terminate_and_wait(self.config.kill_timeout)
                .await
                .map_err(SupervisorError::Signal)?;
            let exit = GenerationExit::from_status(status, true);
            generation.record_exit(exit);
            display::print_exit(exit);
            generation.consume_report_file();
        }

        Ok((end, generation))
    }

    fn announce(&self, outcome: &ScheduleOutcome) {
        if outcome.newly_scheduled {
            display::print_restart_scheduled();
        }
        match &outcome.notice {
            Some(ChangeNotice::Path(path)) => {
                display::print_changed_path(path, &self.display_root);
            }
            Some(ChangeNotice::Overflow) => display::print_changed_overflow(),
            None => {}
        }
    }
}

/// Sleep until `deadline`, or forever when there is none.
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sleep_until_none_never_completes() {
        let result =
            tokio::time::timeout(std::time::Duration::from_millis(20), sleep_until(None)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_sleep_until_past_deadline_completes() {
        let past = Instant::now();
        tokio::time::timeout(std::time::Duration::from_secs(1), sleep_until(Some(past)))
            .await
            .unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_display_root_is_canonical() {
        let dir = tempfile::TempDir::new().unwrap();
        let real = dir.path().join("real");
        std::fs::create_dir(&real).unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let config = SupervisorConfig::new("app.js", &link);
        let supervisor = Supervisor::new(config, CancellationToken::new());
        assert_eq!(supervisor.display_root(), real.canonicalize().unwrap());
    }

    #[tokio::test]
    async fn test_cancelled_before_start_spawns_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = SupervisorConfig::new("missing-program", dir.path());
        config.runtime_dir = dir.path().to_path_buf();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut supervisor = Supervisor::new(config, cancel);
        match supervisor.run().await {
            Ok(outcome) => {
                assert_eq!(outcome.exit_code, 0);
                assert_eq!(outcome.stats, SupervisorStats::default());
                assert_eq!(supervisor.state(), SupervisorState::Stopped);
            }
            Err(SupervisorError::Watcher(e)) => {
                eprintln!("Skipping test due to system limit: {e}");
            }
            Err(e) => panic!("Unexpected error: {e}"),
        }
    }

    #[test]
    fn test_new_supervisor_is_starting() {
        let config = SupervisorConfig::new("app.js", "/p");
        let supervisor = Supervisor::new(config, CancellationToken::new());
        assert_eq!(supervisor.state(), SupervisorState::Starting);
        assert_eq!(supervisor.stats(), SupervisorStats::default());
        assert!(!supervisor.is_cancelled());
    }
}
