//! Watch policy for discovered paths.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::paths::guess_real_path;

/// Directory name used by package managers for third-party trees.
pub const DEFAULT_DEPENDENCY_DIR: &str = "node_modules";

/// Decides whether a discovered path belongs to the watched program.
///
/// All rules must pass:
/// 1. the path is not inside the supervisor's own directory,
/// 2. the path is inside the working directory (unless loosened),
/// 3. the path has no dependency-directory segment (unless dependency trees
///    are included).
///
/// Paths given to [`PathFilter::should_watch`] are expected in canonical form
/// (see [`guess_real_path`]); the directories are canonicalized on
/// construction.
#[derive(Debug, Clone)]
pub struct PathFilter {
    self_dir: PathBuf,
    working_dir: PathBuf,
    include_dependency_trees: bool,
    watch_outside_working_dir: bool,
    dependency_dir_names: Vec<OsString>,
}

impl PathFilter {
    #[must_use]
    pub fn new(self_dir: &Path, working_dir: &Path, include_dependency_trees: bool) -> Self {
        Self {
            self_dir: guess_real_path(self_dir),
            working_dir: guess_real_path(working_dir),
            include_dependency_trees,
            watch_outside_working_dir: false,
            dependency_dir_names: vec![OsString::from(DEFAULT_DEPENDENCY_DIR)],
        }
    }

    /// Also accept paths outside the working directory.
    #[must_use]
    pub fn watch_outside_working_dir(mut self, enabled: bool) -> Self {
        self.watch_outside_working_dir = enabled;
        self
    }

    /// Replace the directory names that mark dependency trees.
    #[must_use]
    pub fn dependency_dir_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.dependency_dir_names = names.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    #[must_use]
    pub fn self_dir(&self) -> &Path {
        &self.self_dir
    }

    #[must_use]
    pub fn should_watch(&self, path: &Path) -> bool {
        if path.starts_with(&self.self_dir) {
            return false;
        }

        let inside = path.strip_prefix(&self.working_dir).ok();
        if inside.is_none() && !self.watch_outside_working_dir {
            return false;
        }

        if !self.include_dependency_trees {
            let relevant = inside.unwrap_or(path);
            if relevant
                .components()
                .any(|c| self.dependency_dir_names.iter().any(|n| n == c.as_os_str()))
            {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(include_dependency_trees: bool) -> PathFilter {
        PathFilter::new(
            Path::new("/opt/hotwire/bin"),
            Path::new("/work/project"),
            include_dependency_trees,
        )
    }

    #[test]
    fn test_accepts_project_file() {
        assert!(filter(false).should_watch(Path::new("/work/project/lib/a.js")));
    }

    #[test]
    fn test_rejects_outside_working_dir() {
        assert!(!filter(false).should_watch(Path::new("/work/other/a.js")));
        assert!(!filter(true).should_watch(Path::new("/etc/hosts")));
    }

    #[test]
    fn test_rejects_prefix_that_is_not_a_parent() {
        assert!(!filter(false).should_watch(Path::new("/work/project-old/a.js")));
    }

    #[test]
    fn test_rejects_self_dir_even_when_outside_allowed() {
        let f = filter(true).watch_outside_working_dir(true);
        assert!(!f.should_watch(Path::new("/opt/hotwire/bin/hotwire")));
        assert!(f.should_watch(Path::new("/opt/shared/lib.js")));
    }

    #[test]
    fn test_rejects_self_dir_inside_working_dir() {
        let f = PathFilter::new(
            Path::new("/work/project/target/debug"),
            Path::new("/work/project"),
            true,
        );
        assert!(!f.should_watch(Path::new("/work/project/target/debug/hotwire")));
        assert!(f.should_watch(Path::new("/work/project/src/main.rs")));
    }

    #[test]
    fn test_dependency_trees_excluded_by_default() {
        let path = Path::new("/work/project/node_modules/left-pad/index.js");
        assert!(!filter(false).should_watch(path));
        assert!(filter(true).should_watch(path));
    }

    #[test]
    fn test_dependency_segment_must_be_whole_component() {
        assert!(filter(false).should_watch(Path::new("/work/project/my_node_modules_notes.md")));
    }

    #[test]
    fn test_dependency_segment_checked_below_working_dir_only() {
        let f = PathFilter::new(
            Path::new("/opt/hotwire"),
            Path::new("/srv/node_modules/tool"),
            false,
        );
        assert!(f.should_watch(Path::new("/srv/node_modules/tool/index.js")));
        assert!(!f.should_watch(Path::new("/srv/node_modules/tool/node_modules/dep/x.js")));
    }

    #[test]
    fn test_custom_dependency_dir_names() {
        let f = filter(false).dependency_dir_names(["vendor", ".venv"]);
        assert!(!f.should_watch(Path::new("/work/project/vendor/pkg/mod.php")));
        assert!(!f.should_watch(Path::new("/work/project/.venv/lib/site.py")));
        assert!(f.should_watch(Path::new("/work/project/node_modules/x.js")));
    }
}
