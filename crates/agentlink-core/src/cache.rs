//! Merged settings cache
//!
//! When an agent has overrides, its settings symlink points at
//! `<cache>/<agent>/<file>` instead of the tracked base file. The entry is
//! rebuilt only when it is older than one of its inputs: the base file,
//! the user config, the state file naming the active profile, or a profile
//! definition in the active chain.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use agentlink_agents::AgentKind;
use tracing::{debug, info, warn};

use crate::config::EffectiveConfig;
use crate::error::{CoreError, CoreResult};
use crate::format;
use crate::merge::deep_merge;
use crate::util::atomic_write;

/// What [`SettingsCache::cleanup_orphans`] did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrphanCleanup {
    /// Directories deleted
    pub removed: Vec<String>,
    /// Directories without overrides that a settings link still points into
    pub kept: Vec<String>,
}

/// Per-agent merged settings files under one directory
#[derive(Debug, Clone)]
pub struct SettingsCache {
    root: PathBuf,
}

impl SettingsCache {
    /// Create a cache rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where an agent's merged settings live, if the agent has settings
    #[must_use]
    pub fn cache_path(&self, agent: AgentKind) -> Option<PathBuf> {
        agent
            .settings()
            .map(|spec| self.root.join(agent.id()).join(spec.file_name()))
    }

    /// Whether the agent's cache entry must be rebuilt
    ///
    /// Missing inputs are ignored; equal timestamps are not stale.
    #[must_use]
    pub fn is_cache_stale(&self, agent: AgentKind, base: &Path, config: &EffectiveConfig) -> bool {
        let Some(cache_path) = self.cache_path(agent) else {
            return false;
        };
        let Some(cached_at) = modified(&cache_path) else {
            return true;
        };

        std::iter::once(base)
            .chain(config.inputs.iter().map(PathBuf::as_path))
            .filter_map(modified)
            .any(|input| input > cached_at)
    }

    /// Render the merged settings for an agent without writing anything
    ///
    /// Returns `None` when the agent has no overrides.
    pub fn render_merged(
        &self,
        agent: AgentKind,
        base: &Path,
        config: &EffectiveConfig,
    ) -> CoreResult<Option<String>> {
        let Some(overrides) = config.overrides_for(agent) else {
            return Ok(None);
        };
        let Some(spec) = agent.settings() else {
            return Ok(None);
        };
        if !base.exists() {
            return Err(CoreError::MissingBase {
                agent: agent.id().to_string(),
                path: base.to_path_buf(),
            });
        }

        let base_value = format::read_file(base, spec.format)?;
        let merged = deep_merge(&base_value, overrides);
        format::render(&merged, spec.format).map(Some)
    }

    /// Ensure a fresh merged file exists for an agent
    ///
    /// Returns `None` when the agent has no overrides and should link
    /// straight to `base`. A fresh entry is left untouched unless `force`.
    pub fn build_merged_settings(
        &self,
        agent: AgentKind,
        base: &Path,
        config: &EffectiveConfig,
        force: bool,
    ) -> CoreResult<Option<PathBuf>> {
        if config.overrides_for(agent).is_none() {
            return Ok(None);
        }
        let Some(cache_path) = self.cache_path(agent) else {
            return Ok(None);
        };

        if !force && !self.is_cache_stale(agent, base, config) {
            debug!(agent = %agent, "merged settings are fresh, skipping rebuild");
            return Ok(Some(cache_path));
        }

        let Some(rendered) = self.render_merged(agent, base, config)? else {
            return Ok(None);
        };
        atomic_write(&cache_path, rendered.as_bytes())?;
        info!(agent = %agent, path = %cache_path.display(), "wrote merged settings");
        Ok(Some(cache_path))
    }

    /// Delete cache directories for agents that no longer have overrides
    ///
    /// Directories of agents in `in_use` are kept even without overrides,
    /// since deleting them would leave a dangling settings link.
    pub fn cleanup_orphans(
        &self,
        config: &EffectiveConfig,
        in_use: &[AgentKind],
    ) -> CoreResult<OrphanCleanup> {
        let mut cleanup = OrphanCleanup::default();
        if !self.root.is_dir() {
            return Ok(cleanup);
        }

        let keep: Vec<&str> = config
            .agents_with_overrides()
            .into_iter()
            .map(AgentKind::id)
            .collect();

        let entries = fs::read_dir(&self.root).map_err(|e| CoreError::io(&self.root, &e))?;
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if keep.contains(&name.as_str()) {
                continue;
            }
            if in_use.iter().any(|agent| agent.id() == name) {
                warn!(agent = %name, "settings link still points at the merged cache, keeping it");
                cleanup.kept.push(name);
                continue;
            }
            fs::remove_dir_all(&path).map_err(|e| CoreError::io(&path, &e))?;
            info!(agent = %name, "removed orphaned settings cache");
            cleanup.removed.push(name);
        }
        cleanup.removed.sort();
        cleanup.kept.sort();
        Ok(cleanup)
    }

    /// Remove one agent's cache directory
    pub fn remove(&self, agent: AgentKind) -> CoreResult<bool> {
        let dir = self.root.join(agent.id());
        if !dir.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir).map_err(|e| CoreError::io(&dir, &e))?;
        Ok(true)
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    match fs::metadata(path).and_then(|m| m.modified()) {
        Ok(time) => Some(time),
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "could not read modification time");
            }
            None
        }
    }
}
