//! Debounced restart scheduling.
//!
//! The scheduler takes the current time as an argument instead of owning a
//! timer, so the supervisor loop sleeps until [`RestartScheduler::deadline`]
//! and tests can drive it with synthetic instants.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::Instant;

/// Default quiet period before a scheduled restart fires.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Per-path notices printed before collapsing into a single marker.
pub const CHANGED_PATH_PRINT_LIMIT: usize = 10;

/// Restart state of one generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartState {
    Idle,
    Scheduled { deadline: Instant },
    /// Teardown in progress; further changes are ignored.
    Started,
}

/// What the user should be told about a matching change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeNotice {
    /// First time this path changed in the generation.
    Path(PathBuf),
    /// The print limit was just exceeded.
    Overflow,
}

/// Result of feeding a change into the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleOutcome {
    /// The change moved the scheduler out of idle.
    pub newly_scheduled: bool,
    pub notice: Option<ChangeNotice>,
}

/// Coalesces change signals into a single restart.
#[derive(Debug, Clone)]
pub struct RestartScheduler {
    debounce: Duration,
    state: RestartState,
    changed: HashSet<PathBuf>,
}

impl RestartScheduler {
    #[must_use]
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            state: RestartState::Idle,
            changed: HashSet::new(),
        }
    }

    /// Record a change to a watched path at `now`.
    ///
    /// Schedules a restart or pushes the pending deadline out. Returns `None`
    /// once the restart has started.
    pub fn on_change(&mut self, path: &Path, now: Instant) -> Option<ScheduleOutcome> {
        if self.state == RestartState::Started {
            tracing::trace!(path = %path.display(), "Restart already started, change dropped");
            return None;
        }

        let newly_scheduled = self.state == RestartState::Idle;
        self.state = RestartState::Scheduled {
            deadline: now + self.debounce,
        };

        let notice = if self.changed.insert(path.to_path_buf()) {
            match self.changed.len() {
                n if n <= CHANGED_PATH_PRINT_LIMIT => Some(ChangeNotice::Path(path.to_path_buf())),
                n if n == CHANGED_PATH_PRINT_LIMIT + 1 => Some(ChangeNotice::Overflow),
                _ => None,
            }
        } else {
            None
        };

        Some(ScheduleOutcome {
            newly_scheduled,
            notice,
        })
    }

    /// Fire the restart if its deadline has passed.
    ///
    /// Returns `true` exactly once per generation.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.state {
            RestartState::Scheduled { deadline } if now >= deadline => {
                self.state = RestartState::Started;
                true
            }
            _ => false,
        }
    }

    /// Mark the generation as being torn down without a debounce, e.g. on stop.
    pub fn start_now(&mut self) {
        self.state = RestartState::Started;
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            RestartState::Scheduled { deadline } => Some(deadline),
            _ => None,
        }
    }

    #[must_use]
    pub fn state(&self) -> RestartState {
        self.state
    }

    /// A restart is pending or in progress.
    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.state != RestartState::Idle
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.state == RestartState::Started
    }

    /// Distinct paths that changed in this generation.
    #[must_use]
    pub fn changed_count(&self) -> usize {
        self.changed.len()
    }

    #[must_use]
    pub fn debounce(&self) -> Duration {
        self.debounce
    }
}

impl Default for RestartScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}
