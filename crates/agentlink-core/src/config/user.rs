//! User-local override file (`~/.agentlink-config.yaml`)

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::error::{CoreError, CoreResult};
use crate::path::{navigate, remove_at_path, set_at_path, PathSegment};
use crate::util::{atomic_write, validate_name};

fn default_version() -> u32 {
    1
}

/// A project registered for per-project links
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project root, `~` allowed
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_symlinks: Vec<String>,
}

/// Personal overrides layered over the active profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_symlinks: Vec<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub settings_overrides: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub mcp_overrides: Map<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub projects: BTreeMap<String, ProjectConfig>,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            exclude_symlinks: Vec::new(),
            settings_overrides: Map::new(),
            mcp_overrides: Map::new(),
            projects: BTreeMap::new(),
        }
    }
}

impl UserConfig {
    /// Load from disk; a missing or blank file is an empty config
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| CoreError::io(path, &e))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(&content).map_err(|e| CoreError::Parse {
            path: path.to_path_buf(),
            format: "yaml".to_string(),
            message: e.to_string(),
        })?;
        for name in config.projects.keys() {
            validate_name(name)?;
        }
        Ok(config)
    }

    /// Write atomically
    pub fn save(&self, path: &Path) -> CoreResult<()> {
        let content = serde_yaml::to_string(self).map_err(|e| CoreError::Render {
            format: "yaml".to_string(),
            message: e.to_string(),
        })?;
        atomic_write(path, content.as_bytes())?;
        info!(path = %path.display(), "saved user config");
        Ok(())
    }

    /// Set one value inside an agent's overrides
    pub fn set_override(
        &mut self,
        agent: &str,
        segments: &[PathSegment],
        value: Value,
    ) -> CoreResult<()> {
        let root = self
            .settings_overrides
            .entry(agent.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !root.is_object() {
            *root = Value::Object(Map::new());
        }
        set_at_path(root, segments, value)?;
        Ok(())
    }

    /// Remove one value from an agent's overrides, pruning emptied parents
    ///
    /// Returns the removed value.
    pub fn unset_override(&mut self, agent: &str, segments: &[PathSegment]) -> CoreResult<Value> {
        let root = self.settings_overrides.get_mut(agent).ok_or_else(|| {
            CoreError::Validation(format!("No overrides set for agent '{agent}'"))
        })?;
        let removed = remove_at_path(root, segments)?;

        for depth in (1..segments.len()).rev() {
            let prefix = &segments[..depth];
            let empty = navigate(root, prefix).is_ok_and(is_empty_container);
            if !empty {
                break;
            }
            remove_at_path(root, prefix)?;
        }

        if is_empty_container(root) {
            self.settings_overrides.shift_remove(agent);
        }
        Ok(removed)
    }

    /// Add an exclusion pattern; false if already present
    pub fn add_exclusion(&mut self, pattern: &str) -> bool {
        if self.exclude_symlinks.iter().any(|p| p == pattern) {
            return false;
        }
        self.exclude_symlinks.push(pattern.to_string());
        true
    }

    /// Remove an exclusion pattern; false if it was not present
    pub fn remove_exclusion(&mut self, pattern: &str) -> bool {
        let before = self.exclude_symlinks.len();
        self.exclude_symlinks.retain(|p| p != pattern);
        before != self.exclude_symlinks.len()
    }
}

fn is_empty_container(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
