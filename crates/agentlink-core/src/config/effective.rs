//! The effective configuration: active profile layered under user overrides

use std::path::{Path, PathBuf};

use agentlink_agents::AgentKind;
use serde::Serialize;
use serde_json::{Map, Value};

use super::exclude::ExclusionSet;
use super::user::{ProjectConfig, UserConfig};
use crate::error::CoreResult;
use crate::merge::merge_maps;
use crate::profile::Profile;

/// Resolved overrides for one invocation
///
/// Built fresh each run; inputs are never modified.
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub profile: String,
    pub settings_overrides: Map<String, Value>,
    pub mcp_overrides: Map<String, Value>,
    pub exclude_symlinks: Vec<String>,
    #[serde(skip)]
    pub projects: Vec<(String, ProjectConfig)>,
    /// Files whose modification invalidates merged caches
    #[serde(skip)]
    pub inputs: Vec<PathBuf>,
}

impl EffectiveConfig {
    /// Layer the user config over a resolved profile
    #[must_use]
    pub fn resolve(profile: &Profile, user: &UserConfig, user_config_path: &Path) -> Self {
        let mut exclude_symlinks = profile.exclude_symlinks.clone();
        for pattern in &user.exclude_symlinks {
            if !exclude_symlinks.contains(pattern) {
                exclude_symlinks.push(pattern.clone());
            }
        }

        let mut inputs = vec![user_config_path.to_path_buf()];
        inputs.extend(profile.source_files.iter().cloned());

        Self {
            profile: profile.name.clone(),
            settings_overrides: merge_maps(&profile.settings_overrides, &user.settings_overrides),
            mcp_overrides: merge_maps(&profile.mcp_overrides, &user.mcp_overrides),
            exclude_symlinks,
            projects: user
                .projects
                .iter()
                .map(|(name, project)| (name.clone(), project.clone()))
                .collect(),
            inputs,
        }
    }

    /// Also invalidate merged caches when `path` changes
    #[must_use]
    pub fn with_input(mut self, path: impl Into<PathBuf>) -> Self {
        self.inputs.push(path.into());
        self
    }

    /// Override tree for an agent, if it changes anything
    #[must_use]
    pub fn overrides_for(&self, agent: AgentKind) -> Option<&Value> {
        self.settings_overrides
            .get(agent.id())
            .filter(|value| match value {
                Value::Object(map) => !map.is_empty(),
                Value::Null => false,
                _ => true,
            })
    }

    /// Agents with non-empty overrides
    #[must_use]
    pub fn agents_with_overrides(&self) -> Vec<AgentKind> {
        AgentKind::ALL
            .into_iter()
            .filter(|agent| self.overrides_for(*agent).is_some())
            .collect()
    }

    /// Global exclusions
    pub fn exclusions(&self, home: &Path) -> CoreResult<ExclusionSet> {
        ExclusionSet::new(&self.exclude_symlinks, home)
    }

    /// Global exclusions plus one project's own
    pub fn project_exclusions(
        &self,
        project: &ProjectConfig,
        home: &Path,
    ) -> CoreResult<ExclusionSet> {
        let mut patterns = self.exclude_symlinks.clone();
        for pattern in &project.exclude_symlinks {
            if !patterns.contains(pattern) {
                patterns.push(pattern.clone());
            }
        }
        ExclusionSet::new(&patterns, home)
    }
}
