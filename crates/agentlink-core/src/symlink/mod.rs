//! Symlink inspection and reconciliation

mod reconcile;

pub use reconcile::{
    reconcile, remove_symlink, ConfirmationRequest, LinkAction, LinkOutcome, LinkResult,
    PendingOperation,
};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::warn;

/// Observed state of a target path relative to its expected source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LinkStatus {
    /// Symlink resolving to the expected source
    Correct,
    /// Nothing at the target path
    Missing,
    /// Symlink whose destination does not exist
    Broken,
    /// Symlink resolving to some other existing location
    WrongTarget { actual: PathBuf },
    /// A regular file or directory
    NotSymlink,
}

impl LinkStatus {
    /// Short label for reports
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Correct => "correct",
            Self::Missing => "missing",
            Self::Broken => "broken",
            Self::WrongTarget { .. } => "wrong target",
            Self::NotSymlink => "not a symlink",
        }
    }
}

/// Inspect `target` and classify it against `source`
#[must_use]
pub fn check_symlink(target: &Path, source: &Path) -> LinkStatus {
    let meta = match fs::symlink_metadata(target) {
        Ok(meta) => meta,
        Err(e) => {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(target = %target.display(), error = %e, "could not inspect target");
            }
            return LinkStatus::Missing;
        }
    };

    if !meta.file_type().is_symlink() {
        return LinkStatus::NotSymlink;
    }

    let Ok(resolved) = fs::canonicalize(target) else {
        return LinkStatus::Broken;
    };

    match fs::canonicalize(source) {
        Ok(expected) if expected == resolved => LinkStatus::Correct,
        _ => LinkStatus::WrongTarget {
            actual: fs::read_link(target).unwrap_or(resolved),
        },
    }
}

/// Whether `path` is a symlink whose destination cannot be resolved
#[must_use]
pub fn is_broken(path: &Path) -> bool {
    path.is_symlink() && fs::canonicalize(path).is_err()
}

/// Compute what a new link at `target` should contain
///
/// Prefers a path relative to the target's directory and falls back to
/// the absolute source.
pub(crate) fn link_contents(target: &Path, source: &Path) -> PathBuf {
    let absolute = fs::canonicalize(source).unwrap_or_else(|_| source.to_path_buf());
    target
        .parent()
        .and_then(|parent| fs::canonicalize(parent).ok())
        .and_then(|parent| pathdiff::diff_paths(&absolute, parent))
        .filter(|rel| !rel.as_os_str().is_empty())
        .unwrap_or(absolute)
}

#[cfg(unix)]
pub(crate) fn make_link(contents: &Path, target: &Path, _source_is_dir: bool) -> io::Result<()> {
    std::os::unix::fs::symlink(contents, target)
}

#[cfg(windows)]
pub(crate) fn make_link(contents: &Path, target: &Path, source_is_dir: bool) -> io::Result<()> {
    if source_is_dir {
        std::os::windows::fs::symlink_dir(contents, target)
    } else {
        std::os::windows::fs::symlink_file(contents, target)
    }
}

/// Remove the link itself, never what it points at
pub(crate) fn unlink(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        #[cfg(windows)]
        Err(_) => fs::remove_dir(path),
        #[cfg(not(windows))]
        Err(e) => Err(e),
    }
}
