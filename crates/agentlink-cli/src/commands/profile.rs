//! Profile commands
//!
//! Handles: agentlink profile list/show/switch/current

use agentlink_core::config::ActiveState;
use agentlink_core::ops;
use agentlink_core::{Layout, ProfileLoader};
use clap::Subcommand;
use serde_json::{json, Value};

/// Profile commands
#[derive(Subcommand)]
pub enum ProfileCommands {
    /// List available profiles
    List,
    /// Show a profile with its inheritance applied
    Show {
        /// Profile name (defaults to the active profile)
        name: Option<String>,
    },
    /// Make a profile active
    Switch {
        /// Profile name
        name: String,
    },
    /// Print the active profile name
    Current,
}

/// Execute profile command
pub fn execute(cmd: ProfileCommands, layout: &Layout) -> anyhow::Result<()> {
    let loader = ProfileLoader::new(layout.profiles_dir());

    match cmd {
        ProfileCommands::List => {
            let active = ActiveState::load(&layout.state_path())?.active_profile;
            for profile in loader.list()? {
                let marker = if profile.name == active { "*" } else { " " };
                match profile.description {
                    Some(description) => println!("{marker} {:<16} {description}", profile.name),
                    None => println!("{marker} {}", profile.name),
                }
            }
        }
        ProfileCommands::Show { name } => {
            let name = match name {
                Some(name) => name,
                None => ActiveState::load(&layout.state_path())?.active_profile,
            };
            let profile = loader.load(&name)?;
            let files: Vec<String> = profile
                .source_files
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            let shown = json!({
                "name": profile.name,
                "description": profile.description,
                "extends": profile.extends,
                "files": files,
                "settings_overrides": Value::Object(profile.settings_overrides),
                "exclude_symlinks": profile.exclude_symlinks,
                "mcp_overrides": Value::Object(profile.mcp_overrides),
            });
            print!("{}", serde_yaml::to_string(&shown)?);
        }
        ProfileCommands::Switch { name } => {
            let profile = ops::switch_profile(layout, &name)?;
            println!("Switched to profile '{}'", profile.name);
            println!("Run `agentlink install` to apply it.");
        }
        ProfileCommands::Current => {
            println!("{}", ActiveState::load(&layout.state_path())?.active_profile);
        }
    }
    Ok(())
}
