//! Crash-safe report file.
//!
//! A child that dies while loading its files may never get to report them
//! over the socket. It therefore writes every path it knows about to a
//! scratch file on exit, and the supervisor picks that file up once the child
//! is gone.

use std::io;
use std::path::{Path, PathBuf};

/// Errors reading or writing the report file.
#[derive(Debug, thiserror::Error)]
pub enum ReportFileError {
    #[error("Failed to access report file {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("Invalid report file {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Write `paths` to the report file as a JSON array, replacing earlier content.
///
/// # Errors
///
/// Returns an error if the paths cannot be serialized or the file cannot be
/// written.
pub fn write_report_file<I, P>(path: &Path, paths: I) -> Result<(), ReportFileError>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let paths: Vec<PathBuf> = paths.into_iter().map(|p| p.as_ref().to_path_buf()).collect();
    let json = serde_json::to_string(&paths).map_err(|source| ReportFileError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json).map_err(|source| ReportFileError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Read and delete the report file.
///
/// A missing file means the child never wrote one and yields `Ok(None)`. The
/// file is removed even when its content is malformed, so it is consumed at
/// most once.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn take_report_file(path: &Path) -> Result<Option<Vec<PathBuf>>, ReportFileError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ReportFileError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %e, "Failed to remove report file");
    }

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| ReportFileError::Json {
            path: path.to_path_buf(),
            source,
        })
}
