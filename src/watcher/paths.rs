//! Path normalization helpers.
//!
//! Paths reported by the child and paths carried by filesystem events must be
//! compared in one canonical form, even when the file does not exist (yet).

use std::io;
use std::path::{Component, Path, PathBuf};

/// Make `path` absolute against the current directory and fold `.`/`..`
/// components lexically.
#[must_use]
pub fn absolutize(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };
    normalize_lexically(&joined)
}

/// Fold `.` and `..` components without touching the filesystem.
#[must_use]
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `/..` stays `/`
                if !normalized.pop() && !normalized.has_root() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Best-effort real path.
///
/// Resolves symlinks on the longest existing ancestor of `path` and re-appends
/// the part that does not exist. A file that was deleted and is about to be
/// recreated therefore keeps the same canonical form it had while it existed.
#[must_use]
pub fn guess_real_path(path: &Path) -> PathBuf {
    let absolute = absolutize(path);

    let mut current = absolute.as_path();
    let mut remainder: Vec<&std::ffi::OsStr> = Vec::new();

    loop {
        match current.canonicalize() {
            Ok(real) => {
                let mut resolved = real;
                for part in remainder.iter().rev() {
                    resolved.push(part);
                }
                return resolved;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::debug!(
                    path = %absolute.display(),
                    error = %e,
                    "Cannot resolve path, using it as is"
                );
                return absolute;
            }
        }

        let (Some(parent), Some(name)) = (current.parent(), current.file_name()) else {
            return absolute;
        };
        remainder.push(name);
        current = parent;
    }
}
