//! Matching of change events against the watch set.

use std::path::PathBuf;

use super::event::ChangeEvent;
use super::paths::guess_real_path;
use super::watch_set::WatchSet;

/// Maps a change event to the watched path it affects.
///
/// Candidates are canonicalized the same way watched paths are, so symlinked
/// directories and not-yet-existing leaves compare equal.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChangeMatcher;

impl ChangeMatcher {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// First watched path among the event's candidates, if any.
    #[must_use]
    pub fn match_event(&self, event: &ChangeEvent, watch_set: &WatchSet) -> Option<PathBuf> {
        event
            .candidates()
            .into_iter()
            .map(guess_real_path)
            .find(|candidate| watch_set.contains(candidate))
    }
}
