//! Watch-set management and the filesystem change source.
//!
//! Paths reported by the child are canonicalized, filtered and merged into a
//! per-generation [`WatchSet`]; filesystem events from [`ChangeSource`] are
//! matched against it by [`ChangeMatcher`].

mod error;
mod event;
mod filter;
mod matcher;
mod paths;
mod source;
mod watch_set;

pub use error::WatcherError;
pub use event::ChangeEvent;
pub use filter::{PathFilter, DEFAULT_DEPENDENCY_DIR};
pub use matcher::ChangeMatcher;
pub use paths::{absolutize, guess_real_path, normalize_lexically};
pub use source::{ChangeSource, DEFAULT_EVENT_TICK};
pub use watch_set::WatchSet;
