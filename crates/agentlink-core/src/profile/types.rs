//! Profile data types

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::ProfileError;
use crate::merge::merge_maps;

/// Name of the built-in profile
pub const DEFAULT_PROFILE: &str = "default";

/// A profile file exactly as written
///
/// Override fields are kept untyped so a wrong shape can be reported
/// against the field that holds it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileFile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub extends: Option<String>,
    #[serde(default)]
    pub settings_overrides: Option<Value>,
    #[serde(default)]
    pub exclude_symlinks: Option<Value>,
    #[serde(default)]
    pub mcp_overrides: Option<Value>,
}

/// A fully resolved profile with inheritance applied
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Profile {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    /// Agent id to override tree
    pub settings_overrides: Map<String, Value>,
    pub exclude_symlinks: Vec<String>,
    /// Server name to override tree
    pub mcp_overrides: Map<String, Value>,
    /// Definition files this profile was built from, own file last
    #[serde(skip)]
    pub source_files: Vec<PathBuf>,
}

impl Profile {
    /// An empty profile
    #[must_use]
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Check field shapes and build a profile from one file, ignoring `extends`
    pub fn from_file(name: &str, file: ProfileFile, path: PathBuf) -> Result<Self, ProfileError> {
        Ok(Self {
            name: name.to_string(),
            description: file.description,
            extends: file.extends,
            settings_overrides: mapping_field(name, "settings_overrides", file.settings_overrides)?,
            exclude_symlinks: string_list_field(name, "exclude_symlinks", file.exclude_symlinks)?,
            mcp_overrides: mapping_field(name, "mcp_overrides", file.mcp_overrides)?,
            source_files: vec![path],
        })
    }

    /// Layer this profile over its resolved parent
    ///
    /// Overrides deep-merge with this profile winning; exclusions are a
    /// set union in first-seen order.
    #[must_use]
    pub fn inherit(self, parent: Profile) -> Self {
        let mut exclude_symlinks = parent.exclude_symlinks;
        for pattern in self.exclude_symlinks {
            if !exclude_symlinks.contains(&pattern) {
                exclude_symlinks.push(pattern);
            }
        }

        let mut source_files = parent.source_files;
        source_files.extend(self.source_files);

        Self {
            name: self.name,
            description: self.description.or(parent.description),
            extends: self.extends,
            settings_overrides: merge_maps(&parent.settings_overrides, &self.settings_overrides),
            exclude_symlinks,
            mcp_overrides: merge_maps(&parent.mcp_overrides, &self.mcp_overrides),
            source_files,
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

fn invalid(profile: &str, field: &str, expected: &str, found: &Value) -> ProfileError {
    ProfileError::InvalidField {
        profile: profile.to_string(),
        field: field.to_string(),
        expected: expected.to_string(),
        found: kind_of(found).to_string(),
    }
}

fn mapping_field(
    profile: &str,
    field: &str,
    value: Option<Value>,
) -> Result<Map<String, Value>, ProfileError> {
    match value {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(other) => Err(invalid(profile, field, "a mapping", &other)),
    }
}

fn string_list_field(
    profile: &str,
    field: &str,
    value: Option<Value>,
) -> Result<Vec<String>, ProfileError> {
    let items = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => return Err(invalid(profile, field, "a sequence", &other)),
    };

    let mut patterns: Vec<String> = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        match item {
            Value::String(s) => {
                if !patterns.contains(&s) {
                    patterns.push(s);
                }
            }
            other => return Err(invalid(profile, &format!("{field}[{i}]"), "a string", &other)),
        }
    }
    Ok(patterns)
}
