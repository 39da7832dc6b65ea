//! Utility functions for agentlink

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{CoreError, CoreResult};

/// Replace `path` with `contents` without exposing a partial write
///
/// The data goes to a temporary file in the destination directory which
/// is then renamed over the original.
pub fn atomic_write(path: &Path, contents: &[u8]) -> CoreResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, &e))?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| CoreError::io(parent, &e))?;
    tmp.write_all(contents).map_err(|e| CoreError::io(path, &e))?;
    tmp.as_file().sync_all().map_err(|e| CoreError::io(path, &e))?;
    tmp.persist(path).map_err(|e| CoreError::io(path, &e.error))?;
    Ok(())
}

/// Validate a name (profile, project) for use in paths
/// Names must not contain path separators or .. sequences
pub fn validate_name(name: &str) -> CoreResult<()> {
    if name.is_empty() {
        return Err(CoreError::InvalidName("Empty name".to_string()));
    }

    if name.contains('/') || name.contains('\\') {
        return Err(CoreError::InvalidName(format!(
            "Name contains path separator: {name}"
        )));
    }

    if name.contains("..") {
        return Err(CoreError::InvalidName(format!(
            "Name contains parent directory reference: {name}"
        )));
    }

    if name.starts_with('.') {
        return Err(CoreError::InvalidName(format!(
            "Name cannot start with dot: {name}"
        )));
    }

    if name.contains('\0') {
        return Err(CoreError::InvalidName("Name contains null byte".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_replaces_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/state.yaml");

        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        let leftovers = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_validate_name_normal() {
        assert!(validate_name("work").is_ok());
        assert!(validate_name("my_project-2").is_ok());
    }

    #[test]
    fn test_validate_name_rejects_traversal() {
        assert!(validate_name("../etc").is_err());
        assert!(validate_name("foo/bar").is_err());
        assert!(validate_name("foo\\bar").is_err());
        assert!(validate_name(".hidden").is_err());
        assert!(validate_name("").is_err());
    }
}
