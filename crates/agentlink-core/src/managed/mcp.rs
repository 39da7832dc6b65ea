//! MCP server definitions injected into `~/.claude.json`
//!
//! The tracked `config/claude/mcps.json` maps server names to definitions,
//! optionally wrapped in `mcpServers`. Installed servers live under the
//! `mcpServers` key of Claude's own state file, next to unrelated keys
//! that must survive every rewrite.

use std::path::{Path, PathBuf};

use agentlink_agents::SettingsFormat;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use super::{detect_conflicts, is_managed, strip_marker, tag};
use crate::backup::backup_copy;
use crate::diff::unified_diff;
use crate::error::{CoreError, CoreResult};
use crate::format;
use crate::merge::deep_merge;
use crate::util::atomic_write;

const SERVERS_KEY: &str = "mcpServers";

/// What an install run did (or would do)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct McpInstallReport {
    /// Newly added servers
    pub installed: Vec<String>,
    /// Identical unmarked entries that were tagged as managed
    pub adopted: Vec<String>,
    /// Managed servers no longer tracked
    pub removed: Vec<String>,
    pub unchanged: Vec<String>,
    /// Servers whose installed content differs from the expected definition
    pub conflicts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<PathBuf>,
    pub dry_run: bool,
    /// Conflicts prevented any write
    pub blocked: bool,
}

impl McpInstallReport {
    /// Whether the installed file needs rewriting
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.installed.is_empty()
            || !self.adopted.is_empty()
            || !self.removed.is_empty()
            || !self.conflicts.is_empty()
    }
}

/// What an uninstall run removed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct McpUninstallReport {
    pub removed: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<PathBuf>,
    pub dry_run: bool,
}

/// Read-only partition of installed servers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct McpStatus {
    pub in_sync: Vec<String>,
    pub drifted: Vec<String>,
    /// Managed but no longer tracked
    pub orphaned: Vec<String>,
    /// Added by the user, never touched
    pub unmanaged: Vec<String>,
    /// Tracked but not installed
    pub missing: Vec<String>,
}

/// Per-server difference between installed and expected content
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct McpDiff {
    pub name: String,
    pub diff: String,
}

/// Installs tracked MCP servers and detects drift
#[derive(Debug, Clone)]
pub struct McpManager {
    source: PathBuf,
    installed_path: PathBuf,
}

impl McpManager {
    /// Create a manager over a tracked source and an installed-state file
    #[must_use]
    pub fn new(source: impl Into<PathBuf>, installed_path: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            installed_path: installed_path.into(),
        }
    }

    /// Whether there is anything for this manager to do
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.source.exists()
    }

    /// Installed-state file this manager rewrites
    #[must_use]
    pub fn installed_path(&self) -> &Path {
        &self.installed_path
    }

    /// Tracked definitions with overrides applied, tagged as managed
    pub fn expected(&self, overrides: &Map<String, Value>) -> CoreResult<Map<String, Value>> {
        if !self.source.exists() {
            return Ok(Map::new());
        }

        let tracked = format::read_file(&self.source, SettingsFormat::Json)?;
        let servers = match tracked.get(SERVERS_KEY) {
            Some(inner) => inner,
            None => &tracked,
        };
        let servers = servers.as_object().ok_or_else(|| {
            CoreError::Validation(format!(
                "{} must contain a mapping of server names",
                self.source.display()
            ))
        })?;

        for name in overrides.keys() {
            if !servers.contains_key(name) {
                warn!(server = %name, "override for an MCP server that is not tracked");
            }
        }

        Ok(servers
            .iter()
            .map(|(name, definition)| {
                let merged = match overrides.get(name) {
                    Some(patch) => deep_merge(definition, patch),
                    None => definition.clone(),
                };
                (name.clone(), tag(&merged))
            })
            .collect())
    }

    /// Servers currently installed
    pub fn installed(&self) -> CoreResult<Map<String, Value>> {
        Ok(servers_of(&self.read_installed()?))
    }

    /// Bring installed servers in line with the tracked definitions
    ///
    /// Conflicting entries block the write unless `force`. The installed
    /// file is backed up before it is rewritten.
    pub fn install(
        &self,
        overrides: &Map<String, Value>,
        force: bool,
        dry_run: bool,
    ) -> CoreResult<McpInstallReport> {
        let expected = self.expected(overrides)?;
        let mut root = self.read_installed()?;
        let installed = servers_of(&root);

        let mut report = McpInstallReport {
            conflicts: detect_conflicts(&expected, &installed),
            dry_run,
            ..McpInstallReport::default()
        };

        for (name, want) in &expected {
            match installed.get(name) {
                None => report.installed.push(name.clone()),
                Some(have) if have == want => report.unchanged.push(name.clone()),
                Some(have) if strip_marker(have) == strip_marker(want) => {
                    report.adopted.push(name.clone());
                }
                Some(_) => {}
            }
        }
        report.removed = installed
            .iter()
            .filter(|(name, entry)| is_managed(entry) && !expected.contains_key(*name))
            .map(|(name, _)| name.clone())
            .collect();

        if !report.conflicts.is_empty() && !force {
            warn!(conflicts = ?report.conflicts, "MCP servers were modified outside agentlink");
            report.blocked = true;
            return Ok(report);
        }
        if dry_run || !report.has_changes() {
            return Ok(report);
        }

        report.backup = backup_copy(&self.installed_path)?;
        let servers = servers_mut(&mut root, &self.installed_path)?;
        for name in report
            .installed
            .iter()
            .chain(&report.adopted)
            .chain(&report.conflicts)
        {
            if let Some(want) = expected.get(name) {
                servers.insert(name.clone(), want.clone());
            }
        }
        for name in &report.removed {
            servers.shift_remove(name);
        }

        self.write_installed(&root)?;
        info!(
            installed = report.installed.len(),
            removed = report.removed.len(),
            overwritten = report.conflicts.len(),
            "updated MCP servers"
        );
        Ok(report)
    }

    /// Remove every managed server, leaving user entries alone
    pub fn uninstall(&self, dry_run: bool) -> CoreResult<McpUninstallReport> {
        let mut root = self.read_installed()?;
        let removed: Vec<String> = servers_of(&root)
            .iter()
            .filter(|(_, entry)| is_managed(entry))
            .map(|(name, _)| name.clone())
            .collect();

        let mut report = McpUninstallReport {
            removed,
            backup: None,
            dry_run,
        };
        if dry_run || report.removed.is_empty() {
            return Ok(report);
        }

        report.backup = backup_copy(&self.installed_path)?;
        let servers = servers_mut(&mut root, &self.installed_path)?;
        for name in &report.removed {
            servers.shift_remove(name);
        }
        self.write_installed(&root)?;
        info!(removed = report.removed.len(), "removed managed MCP servers");
        Ok(report)
    }

    /// Partition installed servers without writing anything
    pub fn status(&self, overrides: &Map<String, Value>) -> CoreResult<McpStatus> {
        let expected = self.expected(overrides)?;
        let installed = self.installed()?;
        let mut status = McpStatus::default();

        for (name, have) in &installed {
            let bucket = match (is_managed(have), expected.get(name)) {
                (false, _) => &mut status.unmanaged,
                (true, None) => &mut status.orphaned,
                (true, Some(want)) if strip_marker(want) == strip_marker(have) => {
                    &mut status.in_sync
                }
                (true, Some(_)) => &mut status.drifted,
            };
            bucket.push(name.clone());
        }
        status.missing = expected
            .keys()
            .filter(|name| !installed.contains_key(*name))
            .cloned()
            .collect();

        Ok(status)
    }

    /// Unified diffs for installed servers that differ from their definition
    pub fn diff(&self, overrides: &Map<String, Value>) -> CoreResult<Vec<McpDiff>> {
        let expected = self.expected(overrides)?;
        let installed = self.installed()?;

        let mut diffs = Vec::new();
        for name in detect_conflicts(&expected, &installed) {
            let (Some(want), Some(have)) = (expected.get(&name), installed.get(&name)) else {
                continue;
            };
            let diff = unified_diff(
                &pretty(&strip_marker(have))?,
                &pretty(&strip_marker(want))?,
                &format!("installed/{name}"),
                &format!("expected/{name}"),
            );
            diffs.push(McpDiff { name, diff });
        }
        Ok(diffs)
    }

    fn read_installed(&self) -> CoreResult<Value> {
        if !self.installed_path.exists() {
            return Ok(json!({}));
        }
        let root = format::read_file(&self.installed_path, SettingsFormat::Json)?;
        if !root.is_object() {
            return Err(CoreError::Validation(format!(
                "{} is not a JSON object",
                self.installed_path.display()
            )));
        }
        Ok(root)
    }

    fn write_installed(&self, root: &Value) -> CoreResult<()> {
        let mut content = pretty(root)?;
        content.push('\n');
        atomic_write(&self.installed_path, content.as_bytes())
    }
}

fn servers_of(root: &Value) -> Map<String, Value> {
    root.get(SERVERS_KEY)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

fn servers_mut<'a>(root: &'a mut Value, path: &Path) -> CoreResult<&'a mut Map<String, Value>> {
    let not_object = || CoreError::Validation(format!("{SERVERS_KEY} in {} is not an object", path.display()));
    let map = root.as_object_mut().ok_or_else(not_object)?;
    map.entry(SERVERS_KEY)
        .or_insert_with(|| json!({}))
        .as_object_mut()
        .ok_or_else(not_object)
}

fn pretty(value: &Value) -> CoreResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| CoreError::Render {
        format: "json".to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::list_backups;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn setup(tracked: &Value, installed: Option<&Value>) -> (TempDir, McpManager) {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("repo/config/claude/mcps.json");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, tracked.to_string()).unwrap();
        let state = dir.path().join("home/.claude.json");
        if let Some(installed) = installed {
            fs::create_dir_all(state.parent().unwrap()).unwrap();
            fs::write(&state, installed.to_string()).unwrap();
        }
        (dir, McpManager::new(source, state))
    }

    #[test]
    fn test_install_preserves_other_keys() {
        let (_dir, manager) = setup(
            &json!({"mcpServers": {"github": {"command": "gh-mcp"}}}),
            Some(&json!({"numStartups": 4, "mcpServers": {"mine": {"command": "x"}}})),
        );

        let report = manager.install(&Map::new(), false, false).unwrap();
        assert_eq!(report.installed, vec!["github"]);
        assert!(report.backup.is_some());

        let root: Value =
            serde_json::from_str(&fs::read_to_string(manager.installed_path()).unwrap()).unwrap();
        assert_eq!(root["numStartups"], json!(4));
        assert_eq!(root["mcpServers"]["mine"], json!({"command": "x"}));
        assert!(is_managed(&root["mcpServers"]["github"]));
    }

    #[test]
    fn test_overrides_applied() {
        let (_dir, manager) = setup(&json!({"github": {"command": "gh-mcp", "env": {"A": "1"}}}), None);
        let overrides = match json!({"github": {"env": {"TOKEN": "t"}}}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let expected = manager.expected(&overrides).unwrap();
        assert_eq!(
            strip_marker(&expected["github"]),
            json!({"command": "gh-mcp", "env": {"A": "1", "TOKEN": "t"}})
        );
    }

    #[test]
    fn test_prunes_untracked_managed_entries_only() {
        let (_dir, manager) = setup(
            &json!({}),
            Some(&json!({"mcpServers": {
                "old": tag(&json!({"command": "old"})),
                "mine": {"command": "mine"}
            }})),
        );

        let report = manager.install(&Map::new(), false, false).unwrap();
        assert_eq!(report.removed, vec!["old"]);
        let installed = manager.installed().unwrap();
        assert!(installed.contains_key("mine"));
        assert!(!installed.contains_key("old"));
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let (_dir, manager) = setup(&json!({"github": {"command": "gh"}}), None);
        let report = manager.install(&Map::new(), false, true).unwrap();
        assert_eq!(report.installed, vec!["github"]);
        assert!(report.dry_run);
        assert!(!manager.installed_path().exists());
    }

    #[test]
    fn test_status_partitions() {
        let (_dir, manager) = setup(
            &json!({"a": {"command": "a"}, "b": {"command": "b"}, "c": {"command": "c"}}),
            Some(&json!({"mcpServers": {
                "a": tag(&json!({"command": "a"})),
                "b": tag(&json!({"command": "edited"})),
                "gone": tag(&json!({"command": "gone"})),
                "mine": {"command": "mine"}
            }})),
        );

        let status = manager.status(&Map::new()).unwrap();
        assert_eq!(status.in_sync, vec!["a"]);
        assert_eq!(status.drifted, vec!["b"]);
        assert_eq!(status.orphaned, vec!["gone"]);
        assert_eq!(status.unmanaged, vec!["mine"]);
        assert_eq!(status.missing, vec!["c"]);

        let diffs = manager.diff(&Map::new()).unwrap();
        assert_eq!(diffs.len(), 1);
        assert!(diffs[0].diff.contains("+  \"command\": \"b\""));
    }

    #[test]
    fn test_uninstall_keeps_user_entries() {
        let (_dir, manager) = setup(
            &json!({"a": {"command": "a"}}),
            Some(&json!({"mcpServers": {"mine": {"command": "mine"}}})),
        );
        manager.install(&Map::new(), false, false).unwrap();

        let report = manager.uninstall(false).unwrap();
        assert_eq!(report.removed, vec!["a"]);
        let installed = manager.installed().unwrap();
        assert_eq!(installed.keys().collect::<Vec<_>>(), vec!["mine"]);
        assert_eq!(list_backups(manager.installed_path()).unwrap().len(), 2);
    }
}
