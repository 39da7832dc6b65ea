//! Filesystem locations agentlink reads and writes

use std::env;
use std::path::PathBuf;

use agentlink_agents::{AgentContext, AgentKind};

use crate::error::{CoreError, CoreResult};

/// Environment variable naming the managed repository
pub const REPO_ENV: &str = "AGENTLINK_REPO";

const USER_CONFIG_FILE: &str = ".agentlink-config.yaml";
const DATA_DIR: &str = ".agentlink";

/// Home and repository roots, passed explicitly to every operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub home: PathBuf,
    pub repo_root: PathBuf,
}

impl Layout {
    /// Create a layout over explicit roots
    #[must_use]
    pub fn new(home: impl Into<PathBuf>, repo_root: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            repo_root: repo_root.into(),
        }
    }

    /// Resolve roots from the environment
    ///
    /// The repository is `repo` if given, else `$AGENTLINK_REPO`, else the
    /// current directory.
    pub fn discover(repo: Option<PathBuf>) -> CoreResult<Self> {
        let home = dirs::home_dir().ok_or(CoreError::NoHome)?;
        let repo_root = match repo.or_else(|| env::var_os(REPO_ENV).map(PathBuf::from)) {
            Some(path) => path,
            None => env::current_dir().map_err(|e| CoreError::io(".", &e))?,
        };
        Ok(Self::new(home, repo_root))
    }

    /// Tracked configuration directory
    #[must_use]
    pub fn config_dir(&self) -> PathBuf {
        self.repo_root.join("config")
    }

    /// Profile definitions directory
    #[must_use]
    pub fn profiles_dir(&self) -> PathBuf {
        self.repo_root.join("profiles")
    }

    /// User-local override file
    #[must_use]
    pub fn user_config_path(&self) -> PathBuf {
        self.home.join(USER_CONFIG_FILE)
    }

    /// Private data directory
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.home.join(DATA_DIR)
    }

    /// Active-profile state file
    #[must_use]
    pub fn state_path(&self) -> PathBuf {
        self.data_dir().join("state.yaml")
    }

    /// Merged settings cache root
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir().join("cache")
    }

    /// Tracked MCP server definitions
    #[must_use]
    pub fn mcp_source(&self) -> PathBuf {
        self.config_dir().join("claude").join("mcps.json")
    }

    /// Tracked plugin manifest
    #[must_use]
    pub fn plugin_manifest(&self) -> PathBuf {
        self.config_dir().join("claude").join("plugins.json")
    }

    /// Claude's own state file holding installed MCP servers
    #[must_use]
    pub fn claude_state(&self) -> PathBuf {
        self.home.join(".claude.json")
    }

    /// Claude's plugin directory
    #[must_use]
    pub fn claude_plugins_dir(&self) -> PathBuf {
        self.home.join(".claude").join("plugins")
    }

    /// Base settings file for an agent, if it declares one
    #[must_use]
    pub fn base_settings(&self, agent: AgentKind) -> Option<PathBuf> {
        agent
            .settings()
            .map(|spec| self.config_dir().join(spec.repo_path))
    }

    /// Context for descriptor enumeration
    #[must_use]
    pub fn agent_context(&self) -> AgentContext {
        AgentContext::new(&self.home, self.config_dir())
    }

    /// Expand `~` in a user-supplied path against this layout's home
    #[must_use]
    pub fn expand(&self, raw: &str) -> PathBuf {
        let home = self.home.to_string_lossy();
        let expanded = shellexpand::tilde_with_context(raw, || Some(home.as_ref()));
        PathBuf::from(expanded.as_ref())
    }
}
