//! Change source backed by notify.
//!
//! One source is created per generation and stopped when the generation is
//! torn down, which implicitly unregisters every watched path.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify_debouncer_full::{
    new_debouncer,
    notify::{RecommendedWatcher, RecursiveMode},
    DebounceEventResult, Debouncer, RecommendedCache,
};
use tokio::sync::mpsc;

use super::error::WatcherError;
use super::event::ChangeEvent;

/// Default notify debounce tick. Only coalesces the raw event bursts of a
/// single save; restart debouncing happens in the restart scheduler.
pub const DEFAULT_EVENT_TICK: Duration = Duration::from_millis(50);

/// Watches the directories that hold watched paths and forwards classified
/// events to a tokio channel.
///
/// Directories are watched instead of files so that editors replacing a file
/// by rename are still observed.
pub struct ChangeSource {
    debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
    watched_dirs: HashSet<PathBuf>,
}

impl ChangeSource {
    /// Arm a new change source.
    ///
    /// The source is ready once this returns; events for directories
    /// registered afterwards are delivered from the moment of registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS watcher cannot be created.
    pub fn start(
        tick: Duration,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ChangeEvent>), WatcherError> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let debouncer = new_debouncer(tick, None, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    for event in &events {
                        if let Some(change) = ChangeEvent::from_notify(event) {
                            // Receiver gone means the generation is over.
                            let _ = event_tx.send(change);
                        }
                    }
                }
                Err(errors) => {
                    for error in errors {
                        tracing::warn!(error = %error, "File watcher error");
                    }
                }
            }
        })?;

        Ok((
            Self {
                debouncer,
                watched_dirs: HashSet::new(),
            },
            event_rx,
        ))
    }

    /// Register the directories holding `paths`.
    ///
    /// Returns the number of newly watched directories. Failures for a single
    /// directory are logged and skipped.
    pub fn watch_paths<I, P>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut registered = 0;

        for path in paths {
            let Some(dir) = watch_target(path.as_ref()) else {
                continue;
            };
            if self.watched_dirs.contains(&dir) {
                continue;
            }

            match self.debouncer.watch(&dir, RecursiveMode::NonRecursive) {
                Ok(()) => {
                    tracing::trace!(dir = %dir.display(), "Watching directory");
                    self.watched_dirs.insert(dir);
                    registered += 1;
                }
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "Failed to watch directory");
                }
            }
        }

        registered
    }

    /// Number of directories currently registered.
    #[must_use]
    pub fn watched_dir_count(&self) -> usize {
        self.watched_dirs.len()
    }

    /// Stop watching and wait for the notify thread to finish.
    pub async fn stop(self) {
        let debouncer = self.debouncer;
        if let Err(e) = tokio::task::spawn_blocking(move || debouncer.stop()).await {
            tracing::warn!(error = %e, "Change source did not shut down cleanly");
        }
    }
}

/// Nearest existing directory that observes changes to `path`.
fn watch_target(path: &Path) -> Option<PathBuf> {
    if path.is_dir() {
        return Some(path.to_path_buf());
    }
    path.ancestors().skip(1).find(|p| p.is_dir()).map(Path::to_path_buf)
}
