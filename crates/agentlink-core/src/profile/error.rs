//! Error types for profile loading

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or resolving a profile
#[derive(Debug, Error)]
pub enum ProfileError {
    /// No profile file with this name
    #[error("Profile '{name}' not found. Available profiles: {}", available.join(", "))]
    NotFound { name: String, available: Vec<String> },

    /// Profile file is not valid YAML
    #[error("Profile '{name}' in {path} is malformed: {message}")]
    Malformed {
        name: String,
        path: PathBuf,
        message: String,
    },

    /// A profile transitively extends itself
    #[error("Circular profile inheritance: {chain}")]
    CircularInheritance { chain: String },

    /// A field holds the wrong kind of container
    #[error("Profile '{profile}': field '{field}' must be {expected}, found {found}")]
    InvalidField {
        profile: String,
        field: String,
        expected: String,
        found: String,
    },

    /// Profile name is unsafe for use as a file name
    #[error("Invalid profile name: {0}")]
    InvalidName(String),

    /// File I/O error
    #[error("I/O error for {path}: {message}")]
    Io { path: PathBuf, message: String },
}
