//! Managed entities: MCP server definitions and plugins
//!
//! These live in files and registries owned by the agent itself, so they
//! cannot be symlinked. Entries agentlink writes carry an ownership marker
//! and only marked entries are ever pruned.

pub mod mcp;
pub mod plugins;

pub use mcp::{McpInstallReport, McpManager, McpStatus, McpUninstallReport};
pub use plugins::{ClaudeCli, PluginCli, PluginManager, PluginManifest, PluginReport, PluginStatus};

use serde_json::{Map, Value};

/// Key added to every managed entry
pub const MANAGED_KEY: &str = "_managedBy";

/// Value of [`MANAGED_KEY`]
pub const MANAGED_VALUE: &str = "agentlink";

/// Whether an entry carries the ownership marker
#[must_use]
pub fn is_managed(entry: &Value) -> bool {
    entry.get(MANAGED_KEY).and_then(Value::as_str) == Some(MANAGED_VALUE)
}

/// Copy of an entry with the ownership marker added
#[must_use]
pub fn tag(entry: &Value) -> Value {
    let mut tagged = entry.clone();
    if let Value::Object(map) = &mut tagged {
        map.insert(MANAGED_KEY.to_string(), Value::String(MANAGED_VALUE.to_string()));
    }
    tagged
}

/// Copy of an entry with the ownership marker removed
#[must_use]
pub fn strip_marker(entry: &Value) -> Value {
    let mut stripped = entry.clone();
    if let Value::Object(map) = &mut stripped {
        map.shift_remove(MANAGED_KEY);
    }
    stripped
}

/// Names present on both sides whose content differs, marker aside
#[must_use]
pub fn detect_conflicts(expected: &Map<String, Value>, installed: &Map<String, Value>) -> Vec<String> {
    expected
        .iter()
        .filter_map(|(name, want)| {
            let have = installed.get(name)?;
            (strip_marker(want) != strip_marker(have)).then(|| name.clone())
        })
        .collect()
}
