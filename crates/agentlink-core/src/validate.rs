//! Override path validation against tracked base settings

use std::path::Path;

use agentlink_agents::AgentKind;
use serde::Serialize;
use serde_json::Value;

use crate::format;
use crate::path::{navigate, parse_setting_path, NavigateError, PathSegment};

const MAX_SUGGESTIONS: usize = 5;

/// Outcome of checking a setting path before accepting an override
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl ValidationReport {
    fn ok() -> Self {
        Self {
            valid: true,
            ..Self::default()
        }
    }

    fn invalid(error: impl Into<String>, suggestions: Vec<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
            warning: None,
            suggestions,
        }
    }
}

/// Check that `setting_path` addresses something in the agent's base settings
///
/// A path whose only missing piece is its final key is accepted with a
/// warning, since an override may add new keys.
#[must_use]
pub fn validate_override(agent: &str, setting_path: &str, config_dir: &Path) -> ValidationReport {
    let agent: AgentKind = match agent.parse() {
        Ok(agent) => agent,
        Err(e) => return ValidationReport::invalid(e.to_string(), AgentKind::known_ids()),
    };

    let Some(spec) = agent.settings() else {
        return ValidationReport::invalid(
            format!("Agent '{agent}' has no settings file to override"),
            Vec::new(),
        );
    };

    let base_path = config_dir.join(spec.repo_path);
    if !base_path.exists() {
        return ValidationReport::invalid(
            format!("Base settings not found: {}", base_path.display()),
            Vec::new(),
        );
    }

    let base = match format::read_file(&base_path, spec.format) {
        Ok(value) => value,
        Err(e) => return ValidationReport::invalid(e.to_string(), Vec::new()),
    };

    let segments = match parse_setting_path(setting_path) {
        Ok(segments) => segments,
        Err(e) => return ValidationReport::invalid(e.to_string(), Vec::new()),
    };

    match navigate(&base, &segments) {
        Ok(_) => ValidationReport::ok(),
        Err(err) => report_navigation_failure(&base, &segments, &err),
    }
}

fn report_navigation_failure(
    base: &Value,
    segments: &[PathSegment],
    err: &NavigateError,
) -> ValidationReport {
    let NavigateError::KeyNotFound { .. } = err else {
        return ValidationReport::invalid(err.to_string(), Vec::new());
    };

    let leaf_parent = match segments.split_last() {
        Some((PathSegment::Key(key), parents)) => navigate(base, parents)
            .ok()
            .and_then(Value::as_object)
            .map(|map| (key, map)),
        _ => None,
    };

    match leaf_parent {
        Some((key, map)) => ValidationReport {
            valid: true,
            error: None,
            warning: Some(format!("{err}; the override will add it")),
            suggestions: suggest(key, map.keys()),
        },
        None => ValidationReport::invalid(err.to_string(), find_missing_parent(base, segments)),
    }
}

/// Suggestions for the deepest mapping reached before an intermediate key went missing
fn find_missing_parent(base: &Value, segments: &[PathSegment]) -> Vec<String> {
    let mut current = base;
    for segment in segments {
        match (segment, current) {
            (PathSegment::Key(key), Value::Object(map)) => match map.get(key) {
                Some(next) => current = next,
                None => return suggest(key, map.keys()),
            },
            (PathSegment::Index(i), Value::Array(items)) => match items.get(*i) {
                Some(next) => current = next,
                None => return Vec::new(),
            },
            _ => return Vec::new(),
        }
    }
    Vec::new()
}

/// Rank candidate keys: containment matches first, then the rest in order
fn suggest<'a>(wanted: &str, keys: impl Iterator<Item = &'a String>) -> Vec<String> {
    let wanted = wanted.to_lowercase();
    let (mut close, rest): (Vec<_>, Vec<_>) = keys.cloned().partition(|k| {
        let k = k.to_lowercase();
        k.contains(&wanted) || wanted.contains(&k)
    });
    close.extend(rest);
    close.truncate(MAX_SUGGESTIONS);
    close
}
