//! Error types for core operations

use std::path::PathBuf;
use thiserror::Error;

use agentlink_agents::AgentError;

use crate::exec::ExecError;
use crate::path::{NavigateError, PathParseError};
use crate::profile::ProfileError;

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while building or reconciling configuration
#[derive(Debug, Error)]
pub enum CoreError {
    /// File I/O error
    #[error("I/O error for {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// A file could not be parsed in its declared format
    #[error("{format} parse error in {path}: {message}")]
    Parse {
        path: PathBuf,
        format: String,
        message: String,
    },

    /// A merged tree could not be rendered back to its native format
    #[error("Failed to render {format}: {message}")]
    Render { format: String, message: String },

    /// Overrides exist for an agent whose tracked settings file is absent
    #[error("Base settings for '{agent}' not found at {path}")]
    MissingBase { agent: String, path: PathBuf },

    /// An exclusion pattern is not a valid glob
    #[error("Invalid exclusion pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Name is unsafe for use as a path component
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// Value has an unexpected shape
    #[error("Validation error: {0}")]
    Validation(String),

    /// Backup creation failed
    #[error("Failed to create backup: {0}")]
    BackupFailed(String),

    /// Setting path syntax error
    #[error(transparent)]
    PathParse(#[from] PathParseError),

    /// Setting path does not resolve
    #[error(transparent)]
    Navigate(#[from] NavigateError),

    /// Profile resolution failed
    #[error(transparent)]
    Profile(#[from] ProfileError),

    /// Agent lookup failed
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// External command failed
    #[error(transparent)]
    Exec(#[from] ExecError),

    /// Home directory could not be determined
    #[error("Could not determine home directory")]
    NoHome,
}

impl CoreError {
    /// Build an I/O error tied to a path
    pub fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Get the error code for CLI output
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "IO_ERROR",
            Self::Parse { .. } => "PARSE_ERROR",
            Self::Render { .. } => "RENDER_ERROR",
            Self::MissingBase { .. } => "MISSING_BASE",
            Self::InvalidPattern { .. } => "INVALID_PATTERN",
            Self::InvalidName(_) | Self::Validation(_) => "VALIDATION_ERROR",
            Self::BackupFailed(_) => "BACKUP_FAILED",
            Self::PathParse(_) => "INVALID_PATH",
            Self::Navigate(_) => "PATH_NOT_FOUND",
            Self::Profile(_) => "PROFILE_ERROR",
            Self::Agent(_) => "UNKNOWN_AGENT",
            Self::Exec(_) => "EXEC_ERROR",
            Self::NoHome => "NO_HOME",
        }
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::new(),
            message: err.to_string(),
        }
    }
}
