//! Timestamped sibling backups of files about to be replaced
//!
//! A backup of `settings.json` taken at 14:03:07 on 2026-03-01 is named
//! `settings.json.agentlink-backup.20260301-140307`. Backups are left in
//! place and never deleted automatically.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use crate::error::{CoreError, CoreResult};

/// Marker inserted between the original name and the timestamp
pub const BACKUP_MARKER: &str = ".agentlink-backup";

/// Choose a free backup path next to `original`
#[must_use]
pub fn backup_path(original: &Path) -> PathBuf {
    let name = original
        .file_name()
        .map_or_else(|| "backup".to_string(), |n| n.to_string_lossy().to_string());
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    let base = format!("{name}{BACKUP_MARKER}.{stamp}");

    let mut candidate = original.with_file_name(&base);
    let mut n = 1;
    while candidate.symlink_metadata().is_ok() {
        candidate = original.with_file_name(format!("{base}-{n}"));
        n += 1;
    }
    candidate
}

/// Move `path` aside so a symlink can take its place
pub fn backup_in_place(path: &Path) -> CoreResult<PathBuf> {
    let dest = backup_path(path);
    fs::rename(path, &dest).map_err(|e| {
        CoreError::BackupFailed(format!("Failed to back up {}: {e}", path.display()))
    })?;
    info!(from = %path.display(), to = %dest.display(), "moved existing file aside");
    Ok(dest)
}

/// Copy `path` to a backup before rewriting it
///
/// Returns `None` when there is nothing to back up.
pub fn backup_copy(path: &Path) -> CoreResult<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }
    let dest = backup_path(path);
    fs::copy(path, &dest).map_err(|e| {
        CoreError::BackupFailed(format!("Failed to back up {}: {e}", path.display()))
    })?;
    info!(from = %path.display(), to = %dest.display(), "backed up file");
    Ok(Some(dest))
}

/// Existing backups of `original`, oldest name first
pub fn list_backups(original: &Path) -> CoreResult<Vec<PathBuf>> {
    let Some(dir) = original.parent() else {
        return Ok(Vec::new());
    };
    let Some(name) = original.file_name().map(|n| n.to_string_lossy().to_string()) else {
        return Ok(Vec::new());
    };
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let prefix = format!("{name}{BACKUP_MARKER}.");
    let mut found: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| CoreError::io(dir, &e))?
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(&prefix))
        .map(|entry| entry.path())
        .collect();
    found.sort();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_backup_in_place_moves_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("CLAUDE.md");
        fs::write(&path, "mine").unwrap();

        let backup = backup_in_place(&path).unwrap();
        assert!(!path.exists());
        assert_eq!(fs::read_to_string(&backup).unwrap(), "mine");
        assert!(backup
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("CLAUDE.md.agentlink-backup."));
    }

    #[test]
    fn test_backup_names_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".claude.json");
        fs::write(&path, "{}").unwrap();

        let first = backup_copy(&path).unwrap().unwrap();
        let second = backup_copy(&path).unwrap().unwrap();
        assert_ne!(first, second);
        assert_eq!(list_backups(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_backup_copy_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(backup_copy(&dir.path().join("absent")).unwrap().is_none());
    }
}
