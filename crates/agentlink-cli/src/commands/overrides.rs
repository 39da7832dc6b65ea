//! Settings override commands
//!
//! Handles: agentlink override set/unset/list, agentlink validate

use agentlink_core::config::UserConfig;
use agentlink_core::ops;
use agentlink_core::{validate_override, Layout, ValidationReport};
use anyhow::bail;
use clap::Subcommand;
use serde_json::Value;

/// Override commands
#[derive(Subcommand)]
pub enum OverrideCommands {
    /// Set a value in an agent's overrides
    Set {
        /// Agent name
        agent: String,
        /// Setting path, e.g. `env.DEBUG` or `permissions.allow[0]`
        path: String,
        /// Value, parsed as YAML (`true`, `3`, `[a, b]`, `{k: v}`, or a plain string)
        value: String,
        /// Write even if the path does not exist in the base settings
        #[arg(short, long)]
        force: bool,
    },
    /// Remove a value from an agent's overrides
    Unset {
        /// Agent name
        agent: String,
        /// Setting path
        path: String,
    },
    /// Show overrides from the user config
    List {
        /// Only this agent
        agent: Option<String>,
    },
}

/// Execute override command
pub fn execute(cmd: OverrideCommands, layout: &Layout) -> anyhow::Result<()> {
    match cmd {
        OverrideCommands::Set {
            agent,
            path,
            value,
            force,
        } => {
            let value = parse_value(&value);
            let report = ops::set_override(layout, &agent, &path, value.clone(), force)?;
            print_report(&report);
            if !report.valid && !force {
                bail!("override not saved (use --force to save it anyway)");
            }
            println!("Set {agent} {path} = {}", serde_json::to_string(&value)?);
        }
        OverrideCommands::Unset { agent, path } => {
            let removed = ops::unset_override(layout, &agent, &path)?;
            println!("Removed {agent} {path} (was {})", serde_json::to_string(&removed)?);
        }
        OverrideCommands::List { agent } => {
            let user = UserConfig::load(&layout.user_config_path())?;
            let overrides: serde_json::Map<String, Value> = user
                .settings_overrides
                .into_iter()
                .filter(|(name, _)| agent.as_deref().map_or(true, |a| a == name))
                .collect();
            if overrides.is_empty() {
                println!("No overrides set.");
            } else {
                print!("{}", serde_yaml::to_string(&overrides)?);
            }
        }
    }
    Ok(())
}

/// Execute `agentlink validate`
pub fn run_validate(layout: &Layout, agent: &str, path: &str) -> anyhow::Result<()> {
    let report = validate_override(agent, path, &layout.config_dir());
    print_report(&report);
    if !report.valid {
        bail!("invalid setting path '{path}'");
    }
    println!("{agent} {path}: ok");
    Ok(())
}

/// Parse a command-line value as YAML, falling back to a plain string
fn parse_value(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::String(raw.to_string());
    }
    serde_yaml::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn print_report(report: &ValidationReport) {
    if let Some(error) = &report.error {
        eprintln!("{error}");
    }
    if let Some(warning) = &report.warning {
        eprintln!("Warning: {warning}");
    }
    if !report.suggestions.is_empty() {
        eprintln!("Did you mean: {}", report.suggestions.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("true"), json!(true));
        assert_eq!(parse_value("3"), json!(3));
        assert_eq!(parse_value("[a, b]"), json!(["a", "b"]));
        assert_eq!(parse_value("{k: v}"), json!({"k": "v"}));
        assert_eq!(parse_value("claude-opus"), json!("claude-opus"));
        assert_eq!(parse_value("null"), Value::Null);
        assert_eq!(parse_value("[unclosed"), json!("[unclosed"));
        assert_eq!(parse_value(""), json!(""));
    }
}
