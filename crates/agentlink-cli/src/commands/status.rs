//! Read-only commands
//!
//! Handles: agentlink status, agentlink diff

use agentlink_core::ops::{self, StatusReport};
use agentlink_core::{Layout, LinkStatus, Session};

use super::print_list;
use crate::AgentFilter;

/// Execute `agentlink status`
pub fn run_status(layout: Layout, filter: &AgentFilter, json: bool) -> anyhow::Result<()> {
    let session = Session::load(layout)?;
    let report = ops::status(&session, &filter.agents)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    print_status(&report);
    Ok(())
}

fn print_status(report: &StatusReport) {
    println!("Profile: {}", report.profile);

    println!("\nLinks:");
    if report.links.is_empty() {
        println!("  (none)");
    }
    for link in &report.links {
        let name = match &link.project {
            Some(project) => format!("{}:{project}", link.agent),
            None => link.agent.to_string(),
        };
        let detail = match &link.status {
            LinkStatus::WrongTarget { actual } if !link.excluded => {
                format!(" (points to {})", actual.display())
            }
            _ => String::new(),
        };
        println!("  {:<10} {name:<14} {}{detail}", short(link), link.target_display);
    }

    if !report.caches.is_empty() {
        println!("\nMerged settings:");
        for cache in &report.caches {
            let state = match (cache.exists, cache.stale) {
                (false, _) => "not built",
                (true, true) => "stale",
                (true, false) => "fresh",
            };
            println!("  {:<10} {state:<10} {}", cache.agent, cache.path.display());
        }
    }

    if let Some(mcp) = &report.mcp {
        println!("\nMCP servers:");
        print_list("in sync", &mcp.in_sync);
        print_list("drifted", &mcp.drifted);
        print_list("orphaned", &mcp.orphaned);
        print_list("missing", &mcp.missing);
        print_list("unmanaged", &mcp.unmanaged);
    }

    if let Some(plugins) = &report.plugins {
        println!("\nPlugins:");
        print_list("in sync", &plugins.in_sync);
        print_list("missing", &plugins.missing);
        print_list("orphaned", &plugins.orphaned);
        print_list("unmanaged", &plugins.unmanaged);
    }

    let problems = report.problems().count();
    if problems > 0 {
        println!("\n{problems} link(s) need attention. Run `agentlink install` to fix them.");
    }
}

fn short(link: &ops::LinkState) -> &'static str {
    if link.excluded {
        return "excluded";
    }
    match link.status {
        LinkStatus::Correct => "ok",
        LinkStatus::Missing => "missing",
        LinkStatus::Broken => "broken",
        LinkStatus::WrongTarget { .. } => "elsewhere",
        LinkStatus::NotSymlink => "file",
    }
}

/// Execute `agentlink diff`
pub fn run_diff(layout: Layout, filter: &AgentFilter) -> anyhow::Result<()> {
    let session = Session::load(layout)?;
    let report = ops::diff(&session, &filter.agents)?;

    if report.is_empty() {
        println!("No differences.");
        return Ok(());
    }
    for settings in &report.settings {
        println!("# {} settings", settings.agent);
        print!("{}", settings.diff);
    }
    for server in &report.mcp {
        println!("# MCP server {}", server.name);
        print!("{}", server.diff);
    }
    Ok(())
}
