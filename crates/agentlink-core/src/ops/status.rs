//! Read-only reports: link status and diffs

use std::fs;
use std::path::PathBuf;

use agentlink_agents::AgentKind;
use serde::Serialize;

use super::{select_agents, Session};
use crate::diff::unified_diff;
use crate::error::{CoreError, CoreResult};
use crate::managed::mcp::McpDiff;
use crate::managed::{McpStatus, PluginStatus};
use crate::symlink::{check_symlink, LinkStatus};

/// One descriptor's current state
#[derive(Debug, Clone, Serialize)]
pub struct LinkState {
    pub agent: AgentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub target: PathBuf,
    pub target_display: String,
    /// Where the target should resolve
    pub source: PathBuf,
    pub status: LinkStatus,
    pub excluded: bool,
}

/// Merged settings cache entry for an agent with overrides
#[derive(Debug, Clone, Serialize)]
pub struct CacheState {
    pub agent: AgentKind,
    pub path: PathBuf,
    pub exists: bool,
    pub stale: bool,
}

/// Everything `status` reports
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub profile: String,
    pub links: Vec<LinkState>,
    pub caches: Vec<CacheState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcp: Option<McpStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugins: Option<PluginStatus>,
}

impl StatusReport {
    /// Non-excluded links that are not correct
    pub fn problems(&self) -> impl Iterator<Item = &LinkState> {
        self.links
            .iter()
            .filter(|l| !l.excluded && l.status != LinkStatus::Correct)
    }
}

/// Inspect links, caches and managed entities without changing anything
pub fn status(session: &Session, agents: &[AgentKind]) -> CoreResult<StatusReport> {
    let agents = select_agents(agents);
    let links = session
        .planned_links(&agents)?
        .into_iter()
        .map(|link| {
            let source = session.expected_source(&link);
            LinkState {
                agent: link.agent,
                status: check_symlink(&link.descriptor.target, &source),
                project: link.project,
                target: link.descriptor.target,
                target_display: link.descriptor.target_display,
                source,
                excluded: link.excluded,
            }
        })
        .collect();

    let cache = session.cache();
    let caches = session
        .config
        .agents_with_overrides()
        .into_iter()
        .filter(|agent| agents.contains(agent))
        .filter_map(|agent| {
            let path = cache.cache_path(agent)?;
            let base = session.layout.base_settings(agent)?;
            Some(CacheState {
                agent,
                exists: path.exists(),
                stale: cache.is_cache_stale(agent, &base, &session.config),
                path,
            })
        })
        .collect();

    let (mcp, plugins) = if agents.contains(&AgentKind::Claude) {
        let mcp = session.mcp();
        let plugins = session.plugins();
        (
            Some(mcp.status(&session.config.mcp_overrides)?).filter(|s| {
                mcp.is_configured() || !s.unmanaged.is_empty() || !s.orphaned.is_empty()
            }),
            if plugins.is_configured() || !session.state.managed_plugins.is_empty() {
                Some(plugins.status(&session.state)?)
            } else {
                None
            },
        )
    } else {
        (None, None)
    };

    Ok(StatusReport {
        profile: session.config.profile.clone(),
        links,
        caches,
        mcp,
        plugins,
    })
}

/// Difference between an agent's cache entry and freshly merged settings
#[derive(Debug, Clone, Serialize)]
pub struct SettingsDiff {
    pub agent: AgentKind,
    pub path: PathBuf,
    pub diff: String,
}

/// Everything `diff` reports
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiffReport {
    pub settings: Vec<SettingsDiff>,
    pub mcp: Vec<McpDiff>,
}

impl DiffReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.settings.is_empty() && self.mcp.is_empty()
    }
}

/// Compare what is on disk with what install would produce
///
/// Agents without a cache entry are compared against their base file.
pub fn diff(session: &Session, agents: &[AgentKind]) -> CoreResult<DiffReport> {
    let agents = select_agents(agents);
    let cache = session.cache();
    let mut report = DiffReport::default();

    for agent in session.config.agents_with_overrides() {
        if !agents.contains(&agent) {
            continue;
        }
        let (Some(base), Some(cache_path)) =
            (session.layout.base_settings(agent), cache.cache_path(agent))
        else {
            continue;
        };
        let Some(merged) = cache.render_merged(agent, &base, &session.config)? else {
            continue;
        };

        let current = if cache_path.exists() { &cache_path } else { &base };
        let old = fs::read_to_string(current).map_err(|e| CoreError::io(current, &e))?;
        let text = unified_diff(
            &old,
            &merged,
            &current.display().to_string(),
            &format!("merged/{agent}"),
        );
        if !text.is_empty() {
            report.settings.push(SettingsDiff {
                agent,
                path: cache_path,
                diff: text,
            });
        }
    }

    if agents.contains(&AgentKind::Claude) {
        report.mcp = session.mcp().diff(&session.config.mcp_overrides)?;
    }
    Ok(report)
}
