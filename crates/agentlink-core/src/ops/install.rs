//! Install and uninstall across agents

use std::path::PathBuf;

use agentlink_agents::AgentKind;
use serde::Serialize;
use tracing::{info, warn};

use super::{select_agents, LinkReport, PlannedLink, Session};
use crate::error::CoreResult;
use crate::managed::{McpInstallReport, McpUninstallReport, PluginCli, PluginReport};
use crate::symlink::{
    check_symlink, reconcile, remove_symlink, ConfirmationRequest, LinkAction, LinkOutcome,
    LinkStatus,
};

/// Flags shared by install and uninstall
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Replace or remove without asking
    pub force: bool,
    /// Report what would happen without touching anything
    pub dry_run: bool,
    /// Rebuild merged settings even when fresh
    pub rebuild_cache: bool,
    /// Restrict to these agents; empty means all
    pub agents: Vec<AgentKind>,
}

/// Everything an install run did
#[derive(Debug, Clone, Default, Serialize)]
pub struct InstallReport {
    pub links: Vec<LinkReport>,
    /// Cache directories removed because their agent lost its overrides
    pub orphaned_caches: Vec<String>,
    /// Cache directories without overrides kept because a link still uses them
    pub kept_caches: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcp: Option<McpInstallReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugins: Option<PluginReport>,
    /// Failures outside of individual links
    pub errors: Vec<String>,
}

impl InstallReport {
    /// Whether anything failed or was blocked
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.links.iter().any(|l| l.outcome.is_error())
            || !self.errors.is_empty()
            || self.mcp.as_ref().is_some_and(|m| m.blocked)
            || self.plugins.as_ref().is_some_and(|p| !p.failed.is_empty())
    }
}

/// Everything an uninstall run did
#[derive(Debug, Clone, Default, Serialize)]
pub struct UninstallReport {
    pub links: Vec<LinkReport>,
    pub removed_caches: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcp: Option<McpUninstallReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugins: Option<PluginReport>,
    pub errors: Vec<String>,
}

impl UninstallReport {
    /// Whether anything failed
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.links.iter().any(|l| l.outcome.is_error())
            || !self.errors.is_empty()
            || self.plugins.as_ref().is_some_and(|p| !p.failed.is_empty())
    }
}

/// Link every selected agent's descriptors, then sync managed entities
///
/// A failing descriptor is recorded and the run continues with the next
/// one. `confirm` is asked before anything existing is replaced unless
/// `options.force` is set.
pub fn install(
    session: &mut Session,
    options: &InstallOptions,
    plugin_cli: Option<&mut dyn PluginCli>,
    confirm: &mut dyn FnMut(&ConfirmationRequest) -> bool,
) -> CoreResult<InstallReport> {
    let agents = select_agents(&options.agents);
    let mut report = InstallReport::default();

    for link in session.planned_links(&agents)? {
        let outcome = if link.excluded {
            LinkOutcome::skipped(format!("{} is excluded", link.descriptor.target_display))
        } else {
            link_one(session, &link, options, confirm)
        };
        report.links.push(LinkReport::new(&link, outcome));
    }

    if !options.dry_run {
        let cleanup = caches_in_use(session)
            .and_then(|in_use| session.cache().cleanup_orphans(&session.config, &in_use));
        match cleanup {
            Ok(cleanup) => {
                report.orphaned_caches = cleanup.removed;
                report.kept_caches = cleanup.kept;
            }
            Err(e) => report.errors.push(e.to_string()),
        }
    }

    if agents.contains(&AgentKind::Claude) {
        let mcp = session.mcp();
        match mcp.install(&session.config.mcp_overrides, options.force, options.dry_run) {
            Ok(mcp_report) => {
                if mcp.is_configured() || mcp_report.has_changes() {
                    report.mcp = Some(mcp_report);
                }
            }
            Err(e) => report.errors.push(e.to_string()),
        }

        let plugins = session.plugins();
        if let Some(cli) = plugin_cli {
            if plugins.is_configured() || !session.state.managed_plugins.is_empty() {
                let before = session.state.clone();
                match plugins.install(cli, &mut session.state, options.dry_run) {
                    Ok(plugin_report) => report.plugins = Some(plugin_report),
                    Err(e) => report.errors.push(e.to_string()),
                }
                if !options.dry_run && session.state != before {
                    session.save_state()?;
                }
            }
        }
    }

    info!(
        links = report.links.len(),
        errors = report.has_errors(),
        "install finished"
    );
    Ok(report)
}

fn link_one(
    session: &Session,
    link: &PlannedLink,
    options: &InstallOptions,
    confirm: &mut dyn FnMut(&ConfirmationRequest) -> bool,
) -> LinkOutcome {
    let source = match resolve_source(session, link, options) {
        Ok(Some(source)) => source,
        Ok(None) => {
            return LinkOutcome::planned(
                LinkAction::Created,
                format!(
                    "Would build merged settings and link {}",
                    link.descriptor.target_display
                ),
            )
        }
        Err(e) => return LinkOutcome::error(e.to_string()),
    };

    let force = options.force || is_own_settings_link(session, link);
    reconcile(&link.descriptor.target, &source, force, options.dry_run).resolve(confirm)
}

/// Whether a global settings target is a link agentlink made earlier
///
/// Such a link points at either the merged cache entry or the tracked
/// base, and moving it between the two needs no confirmation.
fn is_own_settings_link(session: &Session, link: &PlannedLink) -> bool {
    if link.project.is_some() || link.descriptor.settings_format().is_none() {
        return false;
    }
    let target = &link.descriptor.target;
    session
        .cache()
        .cache_path(link.agent)
        .into_iter()
        .chain(std::iter::once(link.descriptor.source.clone()))
        .any(|source| check_symlink(target, &source) == LinkStatus::Correct)
}

/// Agents whose global settings link resolves into the merged cache
///
/// Looks at every agent, not only the ones selected for this run.
fn caches_in_use(session: &Session) -> CoreResult<Vec<AgentKind>> {
    let ctx = session.layout.agent_context();
    let cache = session.cache();
    let mut in_use = Vec::new();
    for agent in AgentKind::ALL {
        let Some(path) = cache.cache_path(agent) else {
            continue;
        };
        let linked = agent.symlinks(&ctx)?.iter().any(|descriptor| {
            descriptor.settings_format().is_some()
                && check_symlink(&descriptor.target, &path) == LinkStatus::Correct
        });
        if linked {
            in_use.push(agent);
        }
    }
    Ok(in_use)
}

/// Source for a link, building the merged cache when needed
///
/// `None` only in a dry run whose cache entry does not exist yet.
fn resolve_source(
    session: &Session,
    link: &PlannedLink,
    options: &InstallOptions,
) -> CoreResult<Option<PathBuf>> {
    if !link.uses_cache(&session.config) {
        return Ok(Some(link.descriptor.source.clone()));
    }

    let cache = session.cache();
    let base = &link.descriptor.source;
    if options.dry_run {
        // Surface a missing or malformed base without writing the cache.
        cache.render_merged(link.agent, base, &session.config)?;
        return Ok(cache
            .cache_path(link.agent)
            .filter(|path| path.exists()));
    }

    let built =
        cache.build_merged_settings(link.agent, base, &session.config, options.rebuild_cache)?;
    Ok(Some(built.unwrap_or_else(|| base.clone())))
}

/// Remove links agentlink created, then managed entities
///
/// Only symlinks resolving to a tracked source or cache entry, and broken
/// symlinks, are removed. Anything else at a target is left alone.
pub fn uninstall(
    session: &mut Session,
    options: &InstallOptions,
    plugin_cli: Option<&mut dyn PluginCli>,
    confirm: &mut dyn FnMut(&ConfirmationRequest) -> bool,
) -> CoreResult<UninstallReport> {
    let agents = select_agents(&options.agents);
    let cache = session.cache();
    let mut report = UninstallReport::default();

    for link in session.planned_links(&agents)? {
        let target = &link.descriptor.target;
        let mut candidates = vec![link.descriptor.source.clone()];
        if link.project.is_none() {
            candidates.extend(cache.cache_path(link.agent));
        }

        let statuses: Vec<LinkStatus> = candidates
            .iter()
            .map(|source| check_symlink(target, source))
            .collect();
        let owner = candidates
            .iter()
            .zip(&statuses)
            .find(|(_, s)| matches!(s, LinkStatus::Correct | LinkStatus::Broken))
            .map(|(source, _)| source);

        let outcome = if let Some(expected) = owner {
            if options.dry_run {
                LinkOutcome::planned(
                    LinkAction::Removed,
                    format!("Would remove {}", link.descriptor.target_display),
                )
            } else {
                remove_symlink(target, expected, options.force).resolve(confirm)
            }
        } else {
            let reason = match statuses.first() {
                Some(LinkStatus::WrongTarget { actual }) => {
                    format!("points to {}, left alone", actual.display())
                }
                Some(LinkStatus::NotSymlink) => "not a symlink, left alone".to_string(),
                _ => "not installed".to_string(),
            };
            LinkOutcome::skipped(format!("{} {reason}", link.descriptor.target_display))
        };
        report.links.push(LinkReport::new(&link, outcome));
    }

    if !options.dry_run {
        for &agent in &agents {
            match cache.remove(agent) {
                Ok(true) => report.removed_caches.push(agent.id().to_string()),
                Ok(false) => {}
                Err(e) => report.errors.push(e.to_string()),
            }
        }
    }

    if agents.contains(&AgentKind::Claude) {
        match session.mcp().uninstall(options.dry_run) {
            Ok(mcp_report) => {
                if !mcp_report.removed.is_empty() {
                    report.mcp = Some(mcp_report);
                }
            }
            Err(e) => report.errors.push(e.to_string()),
        }

        if let Some(cli) = plugin_cli {
            if !session.state.managed_plugins.is_empty() {
                let before = session.state.clone();
                match session
                    .plugins()
                    .uninstall(cli, &mut session.state, options.dry_run)
                {
                    Ok(plugin_report) => report.plugins = Some(plugin_report),
                    Err(e) => report.errors.push(e.to_string()),
                }
                if !options.dry_run && session.state != before {
                    session.save_state()?;
                }
            }
        }
    }

    if report.has_errors() {
        warn!("uninstall finished with errors");
    }
    Ok(report)
}
