//! Native settings file formats

use serde::{Deserialize, Serialize};

/// On-disk format of an agent's settings file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingsFormat {
    /// Braces-and-keys structured text
    Json,
    /// Table-based text
    Toml,
    /// Indentation-based text
    Yaml,
}

impl std::fmt::Display for SettingsFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Toml => write!(f, "toml"),
            Self::Yaml => write!(f, "yaml"),
        }
    }
}
