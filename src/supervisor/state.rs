//! Supervisor state machine.

use std::process::ExitStatus;

use serde::{Deserialize, Serialize};

/// Lifecycle state of the supervisor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupervisorState {
    #[default]
    Starting,
    Running,
    Restarting,
    Stopping,
    Stopped,
}

/// State machine tracking the supervisor lifecycle across generations.
#[derive(Debug, Clone)]
pub struct SupervisorStateMachine {
    state: SupervisorState,
    generations: u64,
    restarts: u64,
}

impl Default for SupervisorStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SupervisorStateMachine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SupervisorState::Starting,
            generations: 0,
            restarts: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn transition(&mut self, new_state: SupervisorState) {
        tracing::debug!(from = ?self.state, to = ?new_state, "State transition");
        self.state = new_state;
    }

    pub fn record_generation(&mut self) {
        self.generations = self.generations.saturating_add(1);
    }

    pub fn record_restart(&mut self) {
        self.restarts = self.restarts.saturating_add(1);
    }

    #[must_use]
    pub fn stats(&self) -> SupervisorStats {
        SupervisorStats {
            generations: self.generations,
            restarts: self.restarts,
        }
    }
}

/// Supervisor statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupervisorStats {
    pub generations: u64,
    pub restarts: u64,
}

/// How the child of a generation ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GenerationExit {
    #[default]
    Running,
    /// Exit code 0.
    Clean,
    /// Nonzero exit code.
    Error(i32),
    /// Terminated by a signal.
    Killed {
        signal: Option<i32>,
        /// The supervisor sent the terminating signal.
        by_supervisor: bool,
    },
}

impl GenerationExit {
    /// Classify an exit status.
    #[must_use]
    pub fn from_status(status: ExitStatus, by_supervisor: bool) -> Self {
        match status.code() {
            Some(0) => Self::Clean,
            Some(code) => Self::Error(code),
            None => Self::Killed {
                signal: exit_signal(status),
                by_supervisor,
            },
        }
    }

    #[must_use]
    pub fn has_exited(self) -> bool {
        self != Self::Running
    }

    /// Exit code the supervisor mirrors when it stops after this generation.
    ///
    /// A child stopped by the supervisor's own signal counts as a normal
    /// stop; any other signal maps to the shell convention `128 + signal`.
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Running | Self::Clean => 0,
            Self::Error(code) => code,
            Self::Killed {
                by_supervisor: true,
                ..
            } => 0,
            Self::Killed {
                signal,
                by_supervisor: false,
            } => 128 + signal.unwrap_or(0),
        }
    }
}

#[cfg(unix)]
fn exit_signal(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: ExitStatus) -> Option<i32> {
    None
}
