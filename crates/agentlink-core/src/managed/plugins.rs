//! Claude plugins installed through the `claude plugin` CLI
//!
//! Plugins have no editable content of their own, so ownership is tracked
//! in agentlink's state file rather than with an in-file marker.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use agentlink_agents::SettingsFormat;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::ActiveState;
use crate::error::{CoreError, CoreResult};
use crate::exec::{run_with_timeout, ExecError};
use crate::format;

/// Deadline for each plugin CLI call
pub const PLUGIN_TIMEOUT: Duration = Duration::from_secs(60);

/// Operations agentlink needs from the plugin CLI
pub trait PluginCli {
    /// Register a marketplace under `name` from `source`
    fn add_marketplace(&mut self, name: &str, source: &str) -> Result<(), ExecError>;
    /// Install `plugin` (`name@marketplace`)
    fn install(&mut self, plugin: &str) -> Result<(), ExecError>;
    /// Uninstall `plugin`
    fn uninstall(&mut self, plugin: &str) -> Result<(), ExecError>;
}

/// The real `claude` executable
#[derive(Debug, Clone)]
pub struct ClaudeCli {
    program: String,
    timeout: Duration,
}

impl Default for ClaudeCli {
    fn default() -> Self {
        Self {
            program: "claude".to_string(),
            timeout: PLUGIN_TIMEOUT,
        }
    }
}

impl ClaudeCli {
    fn run(&self, args: &[&str]) -> Result<(), ExecError> {
        run_with_timeout(&self.program, args, self.timeout).map(|_| ())
    }
}

impl PluginCli for ClaudeCli {
    fn add_marketplace(&mut self, _name: &str, source: &str) -> Result<(), ExecError> {
        self.run(&["plugin", "marketplace", "add", source])
    }

    fn install(&mut self, plugin: &str) -> Result<(), ExecError> {
        self.run(&["plugin", "install", plugin])
    }

    fn uninstall(&mut self, plugin: &str) -> Result<(), ExecError> {
        self.run(&["plugin", "uninstall", plugin])
    }
}

/// Tracked `config/claude/plugins.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Marketplace name to source (`owner/repo`, URL or path)
    #[serde(default)]
    pub marketplaces: BTreeMap<String, String>,
    /// Plugins as `name@marketplace`
    #[serde(default)]
    pub plugins: Vec<String>,
}

/// What a plugin run did (or would do)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PluginReport {
    pub marketplaces_added: Vec<String>,
    pub installed: Vec<String>,
    pub removed: Vec<String>,
    pub unchanged: Vec<String>,
    /// `(plugin or marketplace, reason)`
    pub failed: Vec<(String, String)>,
    pub dry_run: bool,
}

/// Read-only partition of plugins
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PluginStatus {
    pub in_sync: Vec<String>,
    /// Tracked but not installed
    pub missing: Vec<String>,
    /// Installed by agentlink but no longer tracked
    pub orphaned: Vec<String>,
    /// Installed by the user
    pub unmanaged: Vec<String>,
}

/// Installs tracked plugins and prunes ones agentlink owns
#[derive(Debug, Clone)]
pub struct PluginManager {
    manifest_path: PathBuf,
    plugins_dir: PathBuf,
}

impl PluginManager {
    /// Create a manager over a manifest and Claude's plugin directory
    #[must_use]
    pub fn new(manifest_path: impl Into<PathBuf>, plugins_dir: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            plugins_dir: plugins_dir.into(),
        }
    }

    /// Whether a manifest is tracked
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.manifest_path.exists()
    }

    /// Load the tracked manifest; missing means nothing is expected
    pub fn expected(&self) -> CoreResult<PluginManifest> {
        if !self.manifest_path.exists() {
            return Ok(PluginManifest::default());
        }
        let value = format::read_file(&self.manifest_path, SettingsFormat::Json)?;
        serde_json::from_value(value).map_err(|e| CoreError::Parse {
            path: self.manifest_path.clone(),
            format: "json".to_string(),
            message: e.to_string(),
        })
    }

    /// Plugin keys from `installed_plugins.json`
    pub fn installed(&self) -> CoreResult<Vec<String>> {
        self.registry_keys("installed_plugins.json", Some("plugins"))
    }

    /// Marketplace names from `known_marketplaces.json`
    pub fn known_marketplaces(&self) -> CoreResult<Vec<String>> {
        self.registry_keys("known_marketplaces.json", None)
    }

    fn registry_keys(&self, file: &str, nested: Option<&str>) -> CoreResult<Vec<String>> {
        let path = self.plugins_dir.join(file);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let root = format::read_file(&path, SettingsFormat::Json)?;
        let map = nested
            .and_then(|key| root.get(key))
            .unwrap_or(&root)
            .as_object()
            .map(|map| {
                map.iter()
                    .filter(|(key, value)| *key != "version" || value.is_object())
                    .map(|(key, _)| key.clone())
                    .collect()
            })
            .unwrap_or_default();
        Ok(map)
    }

    /// Install tracked plugins and remove owned plugins no longer tracked
    ///
    /// Each CLI failure is recorded and the run continues.
    pub fn install(
        &self,
        cli: &mut dyn PluginCli,
        state: &mut ActiveState,
        dry_run: bool,
    ) -> CoreResult<PluginReport> {
        let manifest = self.expected()?;
        let installed = self.installed()?;
        let known = self.known_marketplaces()?;
        let mut report = PluginReport {
            dry_run,
            ..PluginReport::default()
        };

        for (name, source) in &manifest.marketplaces {
            if known.contains(name) {
                continue;
            }
            if dry_run {
                report.marketplaces_added.push(name.clone());
                continue;
            }
            match cli.add_marketplace(name, source) {
                Ok(()) => report.marketplaces_added.push(name.clone()),
                Err(e) => report.failed.push((name.clone(), e.to_string())),
            }
        }

        for plugin in &manifest.plugins {
            if installed.contains(plugin) {
                report.unchanged.push(plugin.clone());
                continue;
            }
            if dry_run {
                report.installed.push(plugin.clone());
                continue;
            }
            match cli.install(plugin) {
                Ok(()) => {
                    info!(plugin = %plugin, "installed plugin");
                    state.claim_plugin(plugin);
                    report.installed.push(plugin.clone());
                }
                Err(e) => {
                    warn!(plugin = %plugin, error = %e, "plugin install failed");
                    report.failed.push((plugin.clone(), e.to_string()));
                }
            }
        }

        let stale: Vec<String> = state
            .managed_plugins
            .iter()
            .filter(|p| !manifest.plugins.contains(*p))
            .cloned()
            .collect();
        for plugin in stale {
            remove_owned(cli, state, &plugin, &installed, dry_run, &mut report);
        }

        Ok(report)
    }

    /// Uninstall every plugin agentlink owns
    pub fn uninstall(
        &self,
        cli: &mut dyn PluginCli,
        state: &mut ActiveState,
        dry_run: bool,
    ) -> CoreResult<PluginReport> {
        let installed = self.installed()?;
        let mut report = PluginReport {
            dry_run,
            ..PluginReport::default()
        };
        for plugin in state.managed_plugins.clone() {
            remove_owned(cli, state, &plugin, &installed, dry_run, &mut report);
        }
        Ok(report)
    }

    /// Partition plugins without running anything
    pub fn status(&self, state: &ActiveState) -> CoreResult<PluginStatus> {
        let manifest = self.expected()?;
        let installed = self.installed()?;
        let mut status = PluginStatus::default();

        for plugin in &installed {
            let bucket = if !state.owns_plugin(plugin) && !manifest.plugins.contains(plugin) {
                &mut status.unmanaged
            } else if manifest.plugins.contains(plugin) {
                &mut status.in_sync
            } else {
                &mut status.orphaned
            };
            bucket.push(plugin.clone());
        }
        status.missing = manifest
            .plugins
            .iter()
            .filter(|p| !installed.contains(*p))
            .cloned()
            .collect();
        Ok(status)
    }
}

fn remove_owned(
    cli: &mut dyn PluginCli,
    state: &mut ActiveState,
    plugin: &str,
    installed: &[String],
    dry_run: bool,
    report: &mut PluginReport,
) {
    if !installed.iter().any(|p| p == plugin) {
        if !dry_run {
            state.release_plugin(plugin);
        }
        return;
    }
    if dry_run {
        report.removed.push(plugin.to_string());
        return;
    }
    match cli.uninstall(plugin) {
        Ok(()) => {
            info!(plugin = %plugin, "uninstalled plugin");
            state.release_plugin(plugin);
            report.removed.push(plugin.to_string());
        }
        Err(e) => report.failed.push((plugin.to_string(), e.to_string())),
    }
}
