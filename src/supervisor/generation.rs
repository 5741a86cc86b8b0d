//! One supervised run of the child program.
//!
//! A [`Generation`] owns every piece of per-run state: the watch set, the
//! restart latch, the exit status and the per-run IPC file names. It performs
//! no I/O except consuming the report file, so the supervisor loop stays a
//! thin layer over it and the decision logic is testable without a child.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::Instant;

use crate::ipc::{take_report_file, ChildMessage};
use crate::supervisor::{GenerationExit, RestartScheduler, ScheduleOutcome};
use crate::watcher::{ChangeEvent, ChangeMatcher, WatchSet};

/// Per-generation socket and report file locations.
///
/// Names are unique per generation so that a slow teardown can never mix up
/// the files of two runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationFiles {
    pub socket_path: PathBuf,
    pub report_file: PathBuf,
}

impl GenerationFiles {
    #[must_use]
    pub fn new(runtime_dir: &Path) -> Self {
        let id = uuid::Uuid::new_v4().simple().to_string();
        // Unix socket paths are length-limited, keep the name short.
        let stem = format!("hotwire-{}-{}", std::process::id(), &id[..12]);
        Self {
            socket_path: runtime_dir.join(format!("{stem}.sock")),
            report_file: runtime_dir.join(format!("{stem}.json")),
        }
    }
}

/// State of one generation.
#[derive(Debug)]
pub struct Generation {
    ordinal: u64,
    watch_set: WatchSet,
    scheduler: RestartScheduler,
    matcher: ChangeMatcher,
    exit: GenerationExit,
    discovery_complete: bool,
    files: GenerationFiles,
}

impl Generation {
    #[must_use]
    pub fn new(ordinal: u64, watch_set: WatchSet, debounce: Duration, files: GenerationFiles) -> Self {
        Self {
            ordinal,
            watch_set,
            scheduler: RestartScheduler::new(debounce),
            matcher: ChangeMatcher::new(),
            exit: GenerationExit::Running,
            discovery_complete: false,
            files,
        }
    }

    #[must_use]
    pub fn ordinal(&self) -> u64 {
        self.ordinal
    }

    #[must_use]
    pub fn files(&self) -> &GenerationFiles {
        &self.files
    }

    #[must_use]
    pub fn watch_set(&self) -> &WatchSet {
        &self.watch_set
    }

    #[must_use]
    pub fn scheduler(&self) -> &RestartScheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn exit(&self) -> GenerationExit {
        self.exit
    }

    /// An initial report has been received.
    #[must_use]
    pub fn discovery_complete(&self) -> bool {
        self.discovery_complete
    }

    /// Every path to register with the change source when arming it.
    #[must_use]
    pub fn watched_paths(&self) -> BTreeSet<PathBuf> {
        self.watch_set.watched()
    }

    /// Apply a message from the child.
    ///
    /// Returns the paths that became watched. Reports arriving after a restart
    /// was scheduled are dropped since the watch set is about to be discarded.
    pub fn handle_message(&mut self, message: ChildMessage) -> Vec<PathBuf> {
        match message {
            ChildMessage::AddPaths { paths, initial } => {
                if self.scheduler.is_scheduled() {
                    tracing::debug!(
                        generation = self.ordinal,
                        count = paths.len(),
                        "Restart scheduled, report dropped"
                    );
                    return Vec::new();
                }
                if initial {
                    self.discovery_complete = true;
                }
                let added = self.watch_set.add_paths(&paths, initial);
                tracing::debug!(
                    generation = self.ordinal,
                    reported = paths.len(),
                    added = added.len(),
                    initial,
                    "Paths reported"
                );
                added
            }
        }
    }

    /// Feed a filesystem event. Returns the scheduling outcome when the event
    /// touched a watched path and the restart has not started yet.
    pub fn handle_change(&mut self, event: &ChangeEvent, now: Instant) -> Option<ScheduleOutcome> {
        if self.scheduler.is_started() {
            return None;
        }
        let path = self.matcher.match_event(event, &self.watch_set)?;
        self.scheduler.on_change(&path, now)
    }

    #[must_use]
    pub fn restart_deadline(&self) -> Option<Instant> {
        self.scheduler.deadline()
    }

    /// Returns `true` once, when the debounce deadline has passed.
    pub fn poll_restart(&mut self, now: Instant) -> bool {
        self.scheduler.poll(now)
    }

    /// Block any further scheduling; used when stopping.
    pub fn begin_teardown(&mut self) {
        self.scheduler.start_now();
    }

    pub fn record_exit(&mut self, exit: GenerationExit) {
        tracing::debug!(generation = self.ordinal, exit = ?exit, "Child exited");
        self.exit = exit;
    }

    /// Merge the crash-safe report file, if the child wrote one.
    ///
    /// Unlike socket reports this is applied even when a restart is pending:
    /// the file is the only record of what a crashed child loaded, and it
    /// feeds the next generation's seed. Returns the newly watched paths.
    pub fn consume_report_file(&mut self) -> Vec<PathBuf> {
        match take_report_file(&self.files.report_file) {
            Ok(Some(paths)) => {
                let added = self.watch_set.add_paths(&paths, false);
                tracing::debug!(
                    generation = self.ordinal,
                    reported = paths.len(),
                    added = added.len(),
                    "Report file consumed"
                );
                added
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring report file");
                Vec::new()
            }
        }
    }

    /// Whether the next generation must keep this generation's seed.
    ///
    /// True for error exits, for signals the supervisor did not send, and for
    /// a supervisor-initiated stop that came before the child finished its
    /// initial report.
    #[must_use]
    pub fn exited_with_error(&self) -> bool {
        match self.exit {
            GenerationExit::Running | GenerationExit::Clean => false,
            GenerationExit::Error(_) => true,
            GenerationExit::Killed { by_supervisor, .. } => {
                !by_supervisor || !self.discovery_complete
            }
        }
    }

    /// Seed for the next generation.
    #[must_use]
    pub fn next_seed(&self) -> BTreeSet<PathBuf> {
        self.watch_set
            .seed_for_next_generation(self.exited_with_error())
    }
}
