//! Loading profiles from `profiles/<name>.yaml`

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use super::error::ProfileError;
use super::types::{Profile, ProfileFile, DEFAULT_PROFILE};
use crate::util::validate_name;

const EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// Name and description of an available profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Reads and resolves profiles from a directory
#[derive(Debug, Clone)]
pub struct ProfileLoader {
    profiles_dir: PathBuf,
}

impl ProfileLoader {
    /// Create a loader over a profiles directory
    #[must_use]
    pub fn new(profiles_dir: impl Into<PathBuf>) -> Self {
        Self {
            profiles_dir: profiles_dir.into(),
        }
    }

    /// Definition file for `name`, if one exists
    #[must_use]
    pub fn profile_path(&self, name: &str) -> Option<PathBuf> {
        EXTENSIONS
            .iter()
            .map(|ext| self.profiles_dir.join(format!("{name}.{ext}")))
            .find(|p| p.is_file())
    }

    /// Load a profile with its inheritance chain applied
    pub fn load(&self, name: &str) -> Result<Profile, ProfileError> {
        self.resolve(name, Vec::new())
    }

    fn resolve(&self, name: &str, mut chain: Vec<String>) -> Result<Profile, ProfileError> {
        if chain.iter().any(|seen| seen == name) {
            chain.push(name.to_string());
            return Err(ProfileError::CircularInheritance {
                chain: chain.join(" -> "),
            });
        }
        validate_name(name).map_err(|e| ProfileError::InvalidName(e.to_string()))?;
        chain.push(name.to_string());

        let Some(path) = self.profile_path(name) else {
            if name == DEFAULT_PROFILE {
                debug!("no default profile file, using empty overrides");
                return Ok(Profile::empty(DEFAULT_PROFILE));
            }
            return Err(ProfileError::NotFound {
                name: name.to_string(),
                available: self.names()?,
            });
        };

        let file = read_profile_file(name, &path)?;
        if let Some(declared) = file.name.as_deref().filter(|declared| *declared != name) {
            warn!(file = %path.display(), declared, "profile name does not match file name");
        }

        let profile = Profile::from_file(name, file, path)?;
        match profile.extends.clone() {
            Some(parent) => {
                debug!(profile = name, parent = %parent, "resolving parent profile");
                let parent = self.resolve(&parent, chain)?;
                Ok(profile.inherit(parent))
            }
            None => Ok(profile),
        }
    }

    /// Names of profiles with a definition file, sorted
    pub fn names(&self) -> Result<Vec<String>, ProfileError> {
        if !self.profiles_dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.profiles_dir).map_err(|e| ProfileError::Io {
            path: self.profiles_dir.clone(),
            message: e.to_string(),
        })?;

        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| EXTENSIONS.contains(&e))
            })
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().to_string()))
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// All profiles with their descriptions, including the built-in default
    pub fn list(&self) -> Result<Vec<ProfileSummary>, ProfileError> {
        let mut names = self.names()?;
        if !names.iter().any(|n| n == DEFAULT_PROFILE) {
            names.push(DEFAULT_PROFILE.to_string());
            names.sort();
        }

        names
            .into_iter()
            .map(|name| {
                let description = match self.profile_path(&name) {
                    Some(path) => read_profile_file(&name, &path)?.description,
                    None => Some("Built-in profile with no overrides".to_string()),
                };
                Ok(ProfileSummary { name, description })
            })
            .collect()
    }
}

fn read_profile_file(name: &str, path: &Path) -> Result<ProfileFile, ProfileError> {
    let content = fs::read_to_string(path).map_err(|e| ProfileError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    if content.trim().is_empty() {
        return Ok(ProfileFile::default());
    }
    serde_yaml::from_str(&content).map_err(|e| ProfileError::Malformed {
        name: name.to_string(),
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
