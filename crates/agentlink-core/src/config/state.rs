//! Persistent state (`~/.agentlink/state.yaml`)

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::profile::DEFAULT_PROFILE;
use crate::util::atomic_write;

fn default_profile() -> String {
    DEFAULT_PROFILE.to_string()
}

/// Small record carried between invocations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveState {
    #[serde(default = "default_profile")]
    pub active_profile: String,
    /// Plugins installed by agentlink, as `name@marketplace`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub managed_plugins: Vec<String>,
}

impl Default for ActiveState {
    fn default() -> Self {
        Self {
            active_profile: default_profile(),
            managed_plugins: Vec::new(),
        }
    }
}

impl ActiveState {
    /// Load from disk; a missing file means the default profile
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| CoreError::io(path, &e))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content).map_err(|e| CoreError::Parse {
            path: path.to_path_buf(),
            format: "yaml".to_string(),
            message: e.to_string(),
        })
    }

    /// Write atomically
    pub fn save(&self, path: &Path) -> CoreResult<()> {
        let content = serde_yaml::to_string(self).map_err(|e| CoreError::Render {
            format: "yaml".to_string(),
            message: e.to_string(),
        })?;
        atomic_write(path, content.as_bytes())
    }

    /// Record ownership of a plugin
    pub fn claim_plugin(&mut self, plugin: &str) {
        if !self.managed_plugins.iter().any(|p| p == plugin) {
            self.managed_plugins.push(plugin.to_string());
        }
    }

    /// Drop ownership of a plugin
    pub fn release_plugin(&mut self, plugin: &str) {
        self.managed_plugins.retain(|p| p != plugin);
    }

    /// Whether agentlink installed this plugin
    #[must_use]
    pub fn owns_plugin(&self, plugin: &str) -> bool {
        self.managed_plugins.iter().any(|p| p == plugin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_when_missing() {
        let dir = TempDir::new().unwrap();
        let state = ActiveState::load(&dir.path().join("state.yaml")).unwrap();
        assert_eq!(state.active_profile, "default");
    }

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".agentlink/state.yaml");
        let mut state = ActiveState {
            active_profile: "work".into(),
            ..ActiveState::default()
        };
        state.claim_plugin("review@tools");
        state.claim_plugin("review@tools");
        state.save(&path).unwrap();

        let loaded = ActiveState::load(&path).unwrap();
        assert_eq!(loaded, state);
        assert_eq!(loaded.managed_plugins.len(), 1);
        assert!(loaded.owns_plugin("review@tools"));
    }
}
