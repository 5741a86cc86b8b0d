//! Per-generation watch set.
//!
//! Three groups of paths are watched during a generation:
//! - pinned paths (the entry), watched in every generation,
//! - the seed handed over by the previous generation,
//! - paths reported by the child during this generation.
//!
//! Paths are stored canonicalized, so set membership is the path equality
//! used for matching change events.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::filter::PathFilter;
use super::paths::guess_real_path;

/// Watched paths of one generation.
#[derive(Debug, Clone)]
pub struct WatchSet {
    filter: PathFilter,
    pinned: BTreeSet<PathBuf>,
    seed: BTreeSet<PathBuf>,
    reported: BTreeSet<PathBuf>,
}

impl WatchSet {
    /// Create the watch set of a new generation.
    ///
    /// Pinned paths bypass the filter; seed paths are assumed to have passed it
    /// in the generation that reported them.
    #[must_use]
    pub fn new<P, S>(filter: PathFilter, pinned: P, seed: S) -> Self
    where
        P: IntoIterator<Item = PathBuf>,
        S: IntoIterator<Item = PathBuf>,
    {
        Self {
            filter,
            pinned: pinned.into_iter().map(|p| guess_real_path(&p)).collect(),
            seed: seed.into_iter().map(|p| guess_real_path(&p)).collect(),
            reported: BTreeSet::new(),
        }
    }

    /// Merge paths reported by the child.
    ///
    /// Returns the paths that were not watched before, which the caller must
    /// register with the change source. An initial report drops the seed
    /// carried over from the previous generation.
    pub fn add_paths<I, P>(&mut self, raw_paths: I, initial: bool) -> Vec<PathBuf>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut added = Vec::new();

        for raw in raw_paths {
            let path = guess_real_path(raw.as_ref());
            if !self.filter.should_watch(&path) {
                tracing::trace!(path = %path.display(), "Path filtered out");
                continue;
            }
            let already_watched = self.contains(&path);
            if self.reported.insert(path.clone()) && !already_watched {
                added.push(path);
            }
        }

        if initial {
            tracing::debug!(dropped = self.seed.len(), "Initial report replaces seed");
            self.seed.clear();
        }

        added
    }

    /// Seed for the generation that follows this one.
    ///
    /// A generation that failed may have died before reporting everything it
    /// loads, so the previous seed is kept on top of what it did report.
    #[must_use]
    pub fn seed_for_next_generation(&self, exited_with_error: bool) -> BTreeSet<PathBuf> {
        if exited_with_error {
            self.seed.union(&self.reported).cloned().collect()
        } else {
            self.reported.clone()
        }
    }

    /// Whether `canonical` is watched in this generation.
    #[must_use]
    pub fn contains(&self, canonical: &Path) -> bool {
        self.pinned.contains(canonical)
            || self.seed.contains(canonical)
            || self.reported.contains(canonical)
    }

    /// Every watched path, deduplicated.
    #[must_use]
    pub fn watched(&self) -> BTreeSet<PathBuf> {
        self.pinned
            .iter()
            .chain(&self.seed)
            .chain(&self.reported)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn seed(&self) -> &BTreeSet<PathBuf> {
        &self.seed
    }

    #[must_use]
    pub fn reported(&self) -> &BTreeSet<PathBuf> {
        &self.reported
    }

    #[must_use]
    pub fn filter(&self) -> &PathFilter {
        &self.filter
    }
}
