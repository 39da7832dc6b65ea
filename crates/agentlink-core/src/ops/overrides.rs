//! Editing the user config and the active profile

use agentlink_agents::{AgentKind, SettingsFormat};
use serde_json::Value;
use tracing::info;

use crate::config::{ActiveState, UserConfig};
use crate::error::{CoreError, CoreResult};
use crate::layout::Layout;
use crate::path::parse_setting_path;
use crate::profile::{Profile, ProfileLoader};
use crate::validate::{validate_override, ValidationReport};

/// Set one override value in the user config
///
/// The path is checked against the agent's base settings first. An
/// invalid path is not written unless `force`; the report is returned
/// either way so the caller can show warnings and suggestions.
pub fn set_override(
    layout: &Layout,
    agent: &str,
    setting_path: &str,
    value: Value,
    force: bool,
) -> CoreResult<ValidationReport> {
    let kind: AgentKind = agent.parse()?;
    require_settings(kind)?;
    require_representable(kind, &value)?;
    let segments = parse_setting_path(setting_path)?;

    let report = validate_override(agent, setting_path, &layout.config_dir());
    if !report.valid && !force {
        return Ok(report);
    }

    let path = layout.user_config_path();
    let mut user = UserConfig::load(&path)?;
    user.set_override(kind.id(), &segments, value)?;
    user.save(&path)?;
    info!(agent = %kind, path = %setting_path, "set override");
    Ok(report)
}

/// Remove one override value from the user config, returning it
pub fn unset_override(layout: &Layout, agent: &str, setting_path: &str) -> CoreResult<Value> {
    let kind: AgentKind = agent.parse()?;
    let segments = parse_setting_path(setting_path)?;

    let path = layout.user_config_path();
    let mut user = UserConfig::load(&path)?;
    let removed = user.unset_override(kind.id(), &segments)?;
    user.save(&path)?;
    info!(agent = %kind, path = %setting_path, "removed override");
    Ok(removed)
}

/// Make `name` the active profile
///
/// The profile must resolve, including its whole inheritance chain,
/// before it is recorded.
pub fn switch_profile(layout: &Layout, name: &str) -> CoreResult<Profile> {
    let profile = ProfileLoader::new(layout.profiles_dir()).load(name)?;

    let state_path = layout.state_path();
    let mut state = ActiveState::load(&state_path)?;
    if state.active_profile == profile.name {
        return Ok(profile);
    }
    state.active_profile.clone_from(&profile.name);
    state.save(&state_path)?;
    info!(profile = %profile.name, "switched profile");
    Ok(profile)
}

/// Reject agents that have nothing to override
fn require_settings(agent: AgentKind) -> CoreResult<()> {
    if agent.settings().is_none() {
        return Err(CoreError::Validation(format!(
            "Agent '{agent}' has no settings file to override"
        )));
    }
    Ok(())
}

/// Reject values the agent's settings format cannot hold
fn require_representable(agent: AgentKind, value: &Value) -> CoreResult<()> {
    let is_toml = agent
        .settings()
        .is_some_and(|spec| spec.format == SettingsFormat::Toml);
    if is_toml && contains_null(value) {
        return Err(CoreError::Validation(format!(
            "Agent '{agent}' uses TOML settings, which cannot hold null. \
             Use `agentlink override unset {agent} <path>` to drop a setting"
        )));
    }
    Ok(())
}

fn contains_null(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.iter().any(contains_null),
        Value::Object(map) => map.values().any(contains_null),
        _ => false,
    }
}
