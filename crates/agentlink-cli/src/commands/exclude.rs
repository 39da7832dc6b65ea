//! Symlink exclusion commands
//!
//! Handles: agentlink exclude add/remove/list

use agentlink_core::config::{ExclusionSet, UserConfig};
use agentlink_core::{Layout, Session};
use anyhow::bail;
use clap::Subcommand;

/// Exclusion commands
#[derive(Subcommand)]
pub enum ExcludeCommands {
    /// Stop linking targets matching a path or glob, e.g. `~/.gemini/*`
    Add {
        /// Path or glob pattern
        pattern: String,
    },
    /// Remove a pattern from the user config
    Remove {
        /// Pattern exactly as added
        pattern: String,
    },
    /// List effective exclusion patterns
    List,
}

/// Execute exclude command
pub fn execute(cmd: ExcludeCommands, layout: &Layout) -> anyhow::Result<()> {
    let path = layout.user_config_path();

    match cmd {
        ExcludeCommands::Add { pattern } => {
            // Reject patterns that would fail every later run.
            ExclusionSet::new(std::slice::from_ref(&pattern), &layout.home)?;
            let mut user = UserConfig::load(&path)?;
            if user.add_exclusion(&pattern) {
                user.save(&path)?;
                println!("Excluded {pattern}");
            } else {
                println!("{pattern} is already excluded");
            }
        }
        ExcludeCommands::Remove { pattern } => {
            let mut user = UserConfig::load(&path)?;
            if !user.remove_exclusion(&pattern) {
                bail!("'{pattern}' is not in {}", path.display());
            }
            user.save(&path)?;
            println!("Removed exclusion {pattern}");
        }
        ExcludeCommands::List => {
            let session = Session::load(layout.clone())?;
            if session.config.exclude_symlinks.is_empty() {
                println!("No exclusions.");
            }
            for pattern in &session.config.exclude_symlinks {
                if session.user.exclude_symlinks.contains(pattern) {
                    println!("  {pattern}");
                } else {
                    println!("  {pattern}  (profile {})", session.profile.name);
                }
            }
            for (name, project) in &session.config.projects {
                for pattern in &project.exclude_symlinks {
                    println!("  {pattern}  (project {name})");
                }
            }
        }
    }
    Ok(())
}
