//! Supported agents and their symlink layouts

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use walkdir::WalkDir;

use crate::descriptor::{DescriptorKind, SymlinkDescriptor};
use crate::error::{AgentError, AgentResult};
use crate::format::SettingsFormat;

/// Shared instructions file every agent links to
const SHARED_RULES: &str = "AGENTS.md";

/// Paths an agent's descriptors are computed against
#[derive(Debug, Clone)]
pub struct AgentContext {
    /// User home directory
    pub home: PathBuf,
    /// `config/` directory of the managed repository
    pub config_dir: PathBuf,
}

impl AgentContext {
    /// Create a new context
    #[must_use]
    pub fn new(home: impl Into<PathBuf>, config_dir: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            config_dir: config_dir.into(),
        }
    }
}

/// Declaration of an agent's overridable settings file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsSpec {
    /// Path of the tracked base file, relative to `config/`
    pub repo_path: &'static str,
    /// Home-relative location the agent reads
    pub target: &'static str,
    /// Native format of the file
    pub format: SettingsFormat,
}

impl SettingsSpec {
    /// File name used for the cache entry
    #[must_use]
    pub fn file_name(&self) -> &'static str {
        self.repo_path.rsplit('/').next().unwrap_or(self.repo_path)
    }
}

/// The closed set of agents agentlink manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    /// Cross-agent `~/AGENTS.md`
    Shared,
    /// Claude Code
    Claude,
    /// OpenAI Codex CLI
    Codex,
    /// Gemini CLI
    Gemini,
    /// Goose
    Goose,
    /// Cursor editor
    Cursor,
}

impl AgentKind {
    /// Every supported agent, in install order
    pub const ALL: [AgentKind; 6] = [
        AgentKind::Shared,
        AgentKind::Claude,
        AgentKind::Codex,
        AgentKind::Gemini,
        AgentKind::Goose,
        AgentKind::Cursor,
    ];

    /// Stable identifier used in config files and on the command line
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Shared => "shared",
            Self::Claude => "claude",
            Self::Codex => "codex",
            Self::Gemini => "gemini",
            Self::Goose => "goose",
            Self::Cursor => "cursor",
        }
    }

    /// All known identifiers
    #[must_use]
    pub fn known_ids() -> Vec<String> {
        Self::ALL.iter().map(|a| a.id().to_string()).collect()
    }

    /// The agent's overridable settings file, if it has one
    #[must_use]
    pub fn settings(self) -> Option<SettingsSpec> {
        match self {
            Self::Shared => None,
            Self::Claude => Some(SettingsSpec {
                repo_path: "claude/settings.json",
                target: "~/.claude/settings.json",
                format: SettingsFormat::Json,
            }),
            Self::Codex => Some(SettingsSpec {
                repo_path: "codex/config.toml",
                target: "~/.codex/config.toml",
                format: SettingsFormat::Toml,
            }),
            Self::Gemini => Some(SettingsSpec {
                repo_path: "gemini/settings.json",
                target: "~/.gemini/settings.json",
                format: SettingsFormat::Json,
            }),
            Self::Goose => Some(SettingsSpec {
                repo_path: "goose/config.yaml",
                target: "~/.config/goose/config.yaml",
                format: SettingsFormat::Yaml,
            }),
            Self::Cursor => Some(SettingsSpec {
                repo_path: "cursor/settings.json",
                target: cursor_user_dir("settings.json"),
                format: SettingsFormat::Json,
            }),
        }
    }

    /// Enumerate the agent's user-level descriptors
    ///
    /// Only descriptors whose tracked source exists are returned.
    pub fn symlinks(self, ctx: &AgentContext) -> AgentResult<Vec<SymlinkDescriptor>> {
        let home = ctx.home.as_path();
        let config = ctx.config_dir.as_path();
        let rules = config.join(SHARED_RULES);
        let mut out = Vec::new();

        match self {
            Self::Shared => {
                push_plain(&mut out, home, "~/AGENTS.md", rules);
            }
            Self::Claude => {
                push_plain(&mut out, home, "~/.claude/CLAUDE.md", rules);
                for dir in ["agents", "commands", "skills"] {
                    push_dir_entries(
                        &mut out,
                        home,
                        &config.join("claude").join(dir),
                        &format!("~/.claude/{dir}"),
                    )?;
                }
            }
            Self::Codex => {
                push_plain(&mut out, home, "~/.codex/AGENTS.md", rules);
            }
            Self::Gemini => {
                push_plain(&mut out, home, "~/.gemini/GEMINI.md", rules);
            }
            Self::Goose => {
                push_plain(&mut out, home, "~/.config/goose/.goosehints", rules);
            }
            Self::Cursor => {
                // keybindings are a positional array and are never merged
                push_plain(
                    &mut out,
                    home,
                    cursor_user_dir("keybindings.json"),
                    config.join("cursor").join("keybindings.json"),
                );
            }
        }

        if let Some(spec) = self.settings() {
            let source = config.join(spec.repo_path);
            if source.exists() {
                out.push(SymlinkDescriptor::settings(
                    home,
                    spec.target,
                    source,
                    spec.format,
                ));
            }
        }

        Ok(out)
    }

    /// Enumerate descriptors for a registered project
    ///
    /// Sources live under `config/projects/<name>/`.
    pub fn project_symlinks(
        self,
        ctx: &AgentContext,
        project_root: &Path,
        project_name: &str,
    ) -> AgentResult<Vec<SymlinkDescriptor>> {
        let project_config = ctx.config_dir.join("projects").join(project_name);
        let rules = project_config.join(SHARED_RULES);
        let mut out = Vec::new();

        let mut push = |target: PathBuf, source: PathBuf| {
            if source.exists() {
                out.push(SymlinkDescriptor::absolute(
                    target,
                    source,
                    DescriptorKind::Plain,
                ));
            }
        };

        match self {
            Self::Shared => push(project_root.join(SHARED_RULES), rules),
            Self::Claude => {
                push(project_root.join("CLAUDE.md"), rules);
                push(
                    project_root.join(".claude").join("settings.json"),
                    project_config.join("claude").join("settings.json"),
                );
            }
            Self::Gemini => push(project_root.join("GEMINI.md"), rules),
            Self::Codex | Self::Goose | Self::Cursor => {}
        }

        Ok(out)
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.id())
    }
}

impl FromStr for AgentKind {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|agent| agent.id() == s.to_lowercase())
            .ok_or_else(|| AgentError::UnknownAgent {
                name: s.to_string(),
                known: Self::known_ids(),
            })
    }
}

#[cfg(target_os = "macos")]
fn cursor_user_dir(file: &str) -> &'static str {
    match file {
        "settings.json" => "~/Library/Application Support/Cursor/User/settings.json",
        _ => "~/Library/Application Support/Cursor/User/keybindings.json",
    }
}

#[cfg(not(target_os = "macos"))]
fn cursor_user_dir(file: &str) -> &'static str {
    match file {
        "settings.json" => "~/.config/Cursor/User/settings.json",
        _ => "~/.config/Cursor/User/keybindings.json",
    }
}

fn push_plain(out: &mut Vec<SymlinkDescriptor>, home: &Path, template: &str, source: PathBuf) {
    if source.exists() {
        out.push(SymlinkDescriptor::plain(home, template, source));
    }
}

/// One descriptor per top-level entry of a tracked directory, in name order
fn push_dir_entries(
    out: &mut Vec<SymlinkDescriptor>,
    home: &Path,
    source_dir: &Path,
    target_dir: &str,
) -> AgentResult<()> {
    if !source_dir.is_dir() {
        return Ok(());
    }

    for entry in WalkDir::new(source_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(std::io::Error::from)?;
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            continue;
        }
        out.push(SymlinkDescriptor::plain(
            home,
            &format!("{target_dir}/{name}"),
            entry.path().to_path_buf(),
        ));
    }

    Ok(())
}
