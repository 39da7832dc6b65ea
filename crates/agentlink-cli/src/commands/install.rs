//! Install and uninstall commands
//!
//! Handles: agentlink install, agentlink uninstall

use agentlink_core::managed::{ClaudeCli, PluginCli, PluginReport};
use agentlink_core::ops::{self, InstallOptions, LinkReport};
use agentlink_core::{Layout, LinkAction, Session};
use anyhow::bail;

use super::print_list;
use super::prompt::{confirm, link_confirmer};
use crate::{InstallArgs, UninstallArgs};

/// Execute `agentlink install`
pub fn run_install(layout: Layout, args: &InstallArgs) -> anyhow::Result<()> {
    let mut session = Session::load(layout)?;
    let options = InstallOptions {
        force: args.force,
        dry_run: args.dry_run,
        rebuild_cache: args.rebuild_cache,
        agents: args.agents.agents.clone(),
    };

    if args.dry_run {
        println!("Dry run: nothing will be changed.\n");
    }
    println!("Profile: {}", session.config.profile);

    let mut cli = ClaudeCli::default();
    let plugin_cli: Option<&mut dyn PluginCli> = if args.no_plugins {
        None
    } else {
        Some(&mut cli)
    };
    let mut confirmer = link_confirmer(args.yes);
    let mut report = ops::install(&mut session, &options, plugin_cli, &mut confirmer)?;

    print_links(&report.links);

    if !report.orphaned_caches.is_empty() {
        println!(
            "\nRemoved merged settings no longer needed: {}",
            report.orphaned_caches.join(", ")
        );
    }
    if !report.kept_caches.is_empty() {
        println!(
            "\nKept merged settings still linked from home: {}",
            report.kept_caches.join(", ")
        );
        println!("Run `agentlink install` for those agents to relink them to the tracked files.");
    }

    if let Some(mcp) = report.mcp.as_mut() {
        if mcp.blocked && !args.dry_run {
            println!(
                "\nMCP servers modified outside agentlink: {}",
                mcp.conflicts.join(", ")
            );
            println!("Run `agentlink diff` to see the changes.");
            if args.yes || confirm("Overwrite them with the tracked definitions?")? {
                *mcp = session
                    .mcp()
                    .install(&session.config.mcp_overrides, true, false)?;
            }
        }
        println!("\nMCP servers:");
        print_list("installed", &mcp.installed);
        print_list("adopted", &mcp.adopted);
        print_list("removed", &mcp.removed);
        if mcp.blocked {
            print_list("conflicts", &mcp.conflicts);
        } else {
            print_list("overwritten", &mcp.conflicts);
        }
        print_list("unchanged", &mcp.unchanged);
        if let Some(backup) = &mcp.backup {
            println!("  backup: {}", backup.display());
        }
    }

    if let Some(plugins) = &report.plugins {
        print_plugins(plugins);
    }
    for error in &report.errors {
        eprintln!("Error: {error}");
    }

    if report.has_errors() {
        bail!("install finished with errors");
    }
    Ok(())
}

/// Execute `agentlink uninstall`
pub fn run_uninstall(layout: Layout, args: &UninstallArgs) -> anyhow::Result<()> {
    let mut session = Session::load(layout)?;
    let options = InstallOptions {
        force: args.force,
        dry_run: args.dry_run,
        rebuild_cache: false,
        agents: args.agents.agents.clone(),
    };

    if args.dry_run {
        println!("Dry run: nothing will be changed.\n");
    }

    let mut cli = ClaudeCli::default();
    let plugin_cli: Option<&mut dyn PluginCli> = if args.no_plugins {
        None
    } else {
        Some(&mut cli)
    };
    let mut confirmer = link_confirmer(args.yes);
    let report = ops::uninstall(&mut session, &options, plugin_cli, &mut confirmer)?;

    print_links(&report.links);
    if !report.removed_caches.is_empty() {
        println!("\nRemoved merged settings: {}", report.removed_caches.join(", "));
    }
    if let Some(mcp) = &report.mcp {
        println!("\nMCP servers:");
        print_list("removed", &mcp.removed);
        if let Some(backup) = &mcp.backup {
            println!("  backup: {}", backup.display());
        }
    }
    if let Some(plugins) = &report.plugins {
        print_plugins(plugins);
    }
    for error in &report.errors {
        eprintln!("Error: {error}");
    }

    if report.has_errors() {
        bail!("uninstall finished with errors");
    }
    Ok(())
}

fn print_links(links: &[LinkReport]) {
    if links.is_empty() {
        println!("\nNothing to link. Is --repo pointing at the right repository?");
        return;
    }

    println!();
    for link in links {
        let name = match &link.project {
            Some(project) => format!("{}:{project}", link.agent),
            None => link.agent.to_string(),
        };
        let action = if link.outcome.dry_run {
            format!("would {}", verb(link.outcome.action))
        } else {
            link.outcome.action.to_string()
        };
        println!("  {action:<14} {name:<14} {}", link.target_display);
        if matches!(link.outcome.action, LinkAction::Error | LinkAction::Skipped) {
            println!("  {:<14} {:<14} {}", "", "", link.outcome.message);
        }
        if let Some(backup) = &link.outcome.backup {
            println!("  {:<14} {:<14} backup: {}", "", "", backup.display());
        }
    }
}

fn verb(action: LinkAction) -> &'static str {
    match action {
        LinkAction::Created => "create",
        LinkAction::Updated => "update",
        LinkAction::Removed => "remove",
        LinkAction::Skipped => "skip",
        LinkAction::AlreadyCorrect => "keep",
        LinkAction::Error => "fail",
    }
}

fn print_plugins(report: &PluginReport) {
    println!("\nPlugins:");
    print_list("marketplaces added", &report.marketplaces_added);
    print_list("installed", &report.installed);
    print_list("removed", &report.removed);
    print_list("unchanged", &report.unchanged);
    for (name, reason) in &report.failed {
        println!("  failed: {name}: {reason}");
    }
}
