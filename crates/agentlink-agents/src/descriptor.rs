//! Symlink descriptors: where a link goes and what it points at

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::format::SettingsFormat;

/// How the source side of a descriptor may be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "format", rename_all = "lowercase")]
pub enum DescriptorKind {
    /// Always linked directly to the tracked file
    Plain,
    /// A settings file that may be replaced by a merged cache entry
    Settings(SettingsFormat),
}

/// A (target, source) symlink pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymlinkDescriptor {
    /// Absolute location the agent reads
    pub target: PathBuf,
    /// Target as written in the agent layout (`~/.claude/settings.json`)
    pub target_display: String,
    /// Tracked file inside the managed repository
    pub source: PathBuf,
    /// Whether the source may be swapped for merged settings
    pub kind: DescriptorKind,
}

impl SymlinkDescriptor {
    /// Create a plain descriptor from a home-relative template
    #[must_use]
    pub fn plain(home: &Path, template: &str, source: PathBuf) -> Self {
        Self {
            target: expand_home(template, home),
            target_display: template.to_string(),
            source,
            kind: DescriptorKind::Plain,
        }
    }

    /// Create a settings descriptor eligible for override merging
    #[must_use]
    pub fn settings(home: &Path, template: &str, source: PathBuf, format: SettingsFormat) -> Self {
        Self {
            target: expand_home(template, home),
            target_display: template.to_string(),
            source,
            kind: DescriptorKind::Settings(format),
        }
    }

    /// Create a descriptor for an absolute target (project files)
    #[must_use]
    pub fn absolute(target: PathBuf, source: PathBuf, kind: DescriptorKind) -> Self {
        Self {
            target_display: target.display().to_string(),
            target,
            source,
            kind,
        }
    }

    /// Settings format if this descriptor is merge-eligible
    #[must_use]
    pub fn settings_format(&self) -> Option<SettingsFormat> {
        match self.kind {
            DescriptorKind::Settings(format) => Some(format),
            DescriptorKind::Plain => None,
        }
    }
}

/// Expand a leading `~` against the given home directory
///
/// Templates without a leading `~` are returned unchanged.
#[must_use]
pub fn expand_home(template: &str, home: &Path) -> PathBuf {
    if template == "~" {
        return home.to_path_buf();
    }
    match template.strip_prefix("~/") {
        Some(rest) => home.join(rest),
        None => PathBuf::from(template),
    }
}
