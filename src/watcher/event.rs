//! Filesystem change events after classification.

use std::path::{Path, PathBuf};

use notify::event::{ModifyKind, RenameMode};
use notify::EventKind;
use notify_debouncer_full::DebouncedEvent;

/// A single change reported by the change source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Removed(PathBuf),
    /// A rename carries both the old and the new location.
    Renamed { from: PathBuf, to: PathBuf },
}

impl ChangeEvent {
    /// Paths that may refer to a watched file, in event order.
    #[must_use]
    pub fn candidates(&self) -> Vec<&Path> {
        match self {
            Self::Created(path) | Self::Modified(path) | Self::Removed(path) => {
                vec![path.as_path()]
            }
            Self::Renamed { from, to } => vec![from.as_path(), to.as_path()],
        }
    }

    /// Classify a debounced notify event. Access events are dropped.
    #[must_use]
    pub fn from_notify(event: &DebouncedEvent) -> Option<Self> {
        let mut paths = event.paths.iter().cloned();
        let first = paths.next()?;

        match event.kind {
            EventKind::Access(_) => None,
            EventKind::Create(_) => Some(Self::Created(first)),
            EventKind::Remove(_) => Some(Self::Removed(first)),
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match paths.next() {
                Some(second) => Some(Self::Renamed {
                    from: first,
                    to: second,
                }),
                None => Some(Self::Modified(first)),
            },
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Some(Self::Removed(first)),
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(Self::Created(first)),
            _ => Some(Self::Modified(first)),
        }
    }
}
