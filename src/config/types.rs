//! Configuration types.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::{ConfigError, FileConfig};
use crate::process::ChildCommand;
use crate::supervisor::DEFAULT_DEBOUNCE;
use crate::watcher::{absolutize, PathFilter, DEFAULT_DEPENDENCY_DIR, DEFAULT_EVENT_TICK};

/// Resolved configuration for the supervisor.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Entry program, as given on the command line.
    pub entry: PathBuf,
    /// Arguments passed to the entry.
    pub args: Vec<String>,
    /// Interpreter used to run the entry.
    pub runtime: Option<String>,
    /// Flags passed to the runtime ahead of the reporter flags.
    pub runtime_flags: Vec<String>,
    /// Runtime flags that load the path reporter into the child.
    pub reporter_args: Vec<String>,
    pub debounce: Duration,
    pub dependency_trees: bool,
    pub dependency_dir_names: Vec<String>,
    pub watch_outside_working_dir: bool,
    /// Force-kill timeout after SIGTERM. `None` waits indefinitely.
    pub kill_timeout: Option<Duration>,
    pub event_tick: Duration,
    pub working_dir: PathBuf,
    /// Installation directory of the supervisor; never watched.
    pub self_dir: PathBuf,
    /// Directory for the per-generation socket and report file.
    pub runtime_dir: PathBuf,
}

impl SupervisorConfig {
    /// Configuration with defaults for the given entry.
    #[must_use]
    pub fn new(entry: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            entry: entry.into(),
            args: Vec::new(),
            runtime: None,
            runtime_flags: Vec::new(),
            reporter_args: Vec::new(),
            debounce: DEFAULT_DEBOUNCE,
            dependency_trees: false,
            dependency_dir_names: vec![DEFAULT_DEPENDENCY_DIR.to_string()],
            watch_outside_working_dir: false,
            kill_timeout: None,
            event_tick: DEFAULT_EVENT_TICK,
            working_dir: working_dir.into(),
            self_dir: default_self_dir(),
            runtime_dir: std::env::temp_dir(),
        }
    }

    /// Apply settings from a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for values that cannot be used.
    pub fn apply_file(mut self, file: &FileConfig) -> Result<Self, ConfigError> {
        if file.event_tick_ms == 0 {
            return Err(ConfigError::Invalid(
                "event_tick_ms must be greater than zero".to_string(),
            ));
        }
        if file.dependency_dir_names.iter().any(String::is_empty) {
            return Err(ConfigError::Invalid(
                "dependency_dir_names must not contain empty names".to_string(),
            ));
        }

        self.debounce = Duration::from_millis(file.debounce_ms);
        self.dependency_trees = file.dependency_trees;
        self.dependency_dir_names.clone_from(&file.dependency_dir_names);
        self.watch_outside_working_dir = file.watch_outside_working_dir;
        self.runtime.clone_from(&file.runtime);
        self.runtime_flags.clone_from(&file.runtime_args);
        self.reporter_args.clone_from(&file.reporter_args);
        self.kill_timeout = file.kill_timeout_ms.map(Duration::from_millis);
        self.event_tick = Duration::from_millis(file.event_tick_ms);
        Ok(self)
    }

    /// Absolute path of the entry, always part of the watch set.
    #[must_use]
    pub fn entry_path(&self) -> PathBuf {
        if self.entry.is_absolute() {
            self.entry.clone()
        } else {
            absolutize(&self.working_dir.join(&self.entry))
        }
    }

    /// Path filter for reported paths.
    #[must_use]
    pub fn path_filter(&self) -> PathFilter {
        PathFilter::new(&self.self_dir, &self.working_dir, self.dependency_trees)
            .watch_outside_working_dir(self.watch_outside_working_dir)
            .dependency_dir_names(self.dependency_dir_names.iter().cloned())
    }

    /// Command line of the child, without the per-generation environment.
    ///
    /// Without a runtime the entry itself is executed, by its resolved path
    /// so that a bare file name is never looked up on `PATH`.
    #[must_use]
    pub fn child_command(&self) -> ChildCommand {
        let entry = match self.runtime {
            Some(_) => self.entry.clone(),
            None => self.entry_path(),
        };
        ChildCommand::new(entry)
            .runtime(self.runtime.clone())
            .runtime_flags(&self.runtime_flags)
            .reporter_args(&self.reporter_args)
            .args(&self.args)
            .working_dir(&self.working_dir)
    }
}

/// Directory holding the running supervisor binary.
fn default_self_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .map_or_else(PathBuf::new, |dir| dir.canonicalize().unwrap_or(dir))
}
