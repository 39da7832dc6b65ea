//! Error types for agent lookup and enumeration

use thiserror::Error;

/// Result type for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors that can occur while resolving agents
#[derive(Error, Debug)]
pub enum AgentError {
    /// Agent identifier is not one of the supported agents
    #[error("Unknown agent '{name}'. Known agents: {}", known.join(", "))]
    UnknownAgent { name: String, known: Vec<String> },

    /// IO error while listing tracked files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
