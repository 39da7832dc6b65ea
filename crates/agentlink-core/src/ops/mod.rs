//! Operations over every agent: install, uninstall, status and diff
//!
//! Each invocation builds a [`Session`] from the filesystem, runs one
//! operation against it, and returns a report for the caller to print.
//! Nothing is carried between invocations apart from the state file.

mod install;
mod overrides;
mod status;

pub use install::{install, uninstall, InstallOptions, InstallReport, UninstallReport};
pub use overrides::{set_override, switch_profile, unset_override};
pub use status::{diff, status, CacheState, DiffReport, LinkState, SettingsDiff, StatusReport};

use std::path::PathBuf;

use agentlink_agents::{AgentKind, SymlinkDescriptor};
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::SettingsCache;
use crate::config::{ActiveState, EffectiveConfig, UserConfig};
use crate::error::CoreResult;
use crate::layout::Layout;
use crate::managed::{McpManager, PluginManager};
use crate::profile::{Profile, ProfileLoader};
use crate::symlink::LinkOutcome;

/// Everything one invocation needs, loaded up front
#[derive(Debug, Clone)]
pub struct Session {
    pub layout: Layout,
    pub state: ActiveState,
    pub user: UserConfig,
    pub profile: Profile,
    pub config: EffectiveConfig,
}

/// A descriptor selected for reconciliation
#[derive(Debug, Clone)]
pub struct PlannedLink {
    pub agent: AgentKind,
    /// Project name for project-scoped descriptors
    pub project: Option<String>,
    pub descriptor: SymlinkDescriptor,
    /// Matched an exclusion pattern
    pub excluded: bool,
}

impl PlannedLink {
    /// Whether this link should point at a merged cache entry
    pub fn uses_cache(&self, config: &EffectiveConfig) -> bool {
        self.project.is_none()
            && self.descriptor.settings_format().is_some()
            && config.overrides_for(self.agent).is_some()
    }
}

/// Per-descriptor line in install and uninstall reports
#[derive(Debug, Clone, Serialize)]
pub struct LinkReport {
    pub agent: AgentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub target: PathBuf,
    pub target_display: String,
    pub outcome: LinkOutcome,
}

impl LinkReport {
    fn new(link: &PlannedLink, outcome: LinkOutcome) -> Self {
        Self {
            agent: link.agent,
            project: link.project.clone(),
            target: link.descriptor.target.clone(),
            target_display: link.descriptor.target_display.clone(),
            outcome,
        }
    }
}

impl Session {
    /// Load state, the active profile chain and the user config
    pub fn load(layout: Layout) -> CoreResult<Self> {
        let state = ActiveState::load(&layout.state_path())?;
        let user = UserConfig::load(&layout.user_config_path())?;
        let profile = ProfileLoader::new(layout.profiles_dir()).load(&state.active_profile)?;
        let config = EffectiveConfig::resolve(&profile, &user, &layout.user_config_path())
            .with_input(layout.state_path());
        debug!(profile = %config.profile, "loaded session");

        Ok(Self {
            layout,
            state,
            user,
            profile,
            config,
        })
    }

    /// Merged settings cache for this home
    pub fn cache(&self) -> SettingsCache {
        SettingsCache::new(self.layout.cache_dir())
    }

    /// MCP server manager for this home and repository
    pub fn mcp(&self) -> McpManager {
        McpManager::new(self.layout.mcp_source(), self.layout.claude_state())
    }

    /// Plugin manager for this home and repository
    pub fn plugins(&self) -> PluginManager {
        PluginManager::new(self.layout.plugin_manifest(), self.layout.claude_plugins_dir())
    }

    /// Persist the state file
    pub fn save_state(&self) -> CoreResult<()> {
        self.state.save(&self.layout.state_path())
    }

    /// Enumerate descriptors for `agents`, global ones first, then projects
    pub fn planned_links(&self, agents: &[AgentKind]) -> CoreResult<Vec<PlannedLink>> {
        let ctx = self.layout.agent_context();
        let home = &self.layout.home;
        let global = self.config.exclusions(home)?;

        let mut links = Vec::new();
        for &agent in agents {
            for descriptor in agent.symlinks(&ctx)? {
                links.push(PlannedLink {
                    agent,
                    project: None,
                    excluded: global.excludes(&descriptor),
                    descriptor,
                });
            }
        }

        for (name, project) in &self.config.projects {
            let root = self.layout.expand(&project.path);
            if !root.is_dir() {
                warn!(project = %name, path = %root.display(), "project directory not found, skipping");
                continue;
            }
            let exclusions = self.config.project_exclusions(project, home)?;
            for &agent in agents {
                for descriptor in agent.project_symlinks(&ctx, &root, name)? {
                    links.push(PlannedLink {
                        agent,
                        project: Some(name.clone()),
                        excluded: exclusions.excludes(&descriptor),
                        descriptor,
                    });
                }
            }
        }

        Ok(links)
    }

    /// The path a link's target should resolve to right now
    ///
    /// Settings with overrides resolve to the cache entry, which may not
    /// have been built yet.
    pub fn expected_source(&self, link: &PlannedLink) -> PathBuf {
        if link.uses_cache(&self.config) {
            if let Some(path) = self.cache().cache_path(link.agent) {
                return path;
            }
        }
        link.descriptor.source.clone()
    }
}

/// `agents`, or every agent when empty
pub fn select_agents(agents: &[AgentKind]) -> Vec<AgentKind> {
    if agents.is_empty() {
        AgentKind::ALL.to_vec()
    } else {
        agents.to_vec()
    }
}
