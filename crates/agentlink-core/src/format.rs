//! Parsing and rendering settings files
//!
//! Every supported format is read into a single in-memory tree
//! (`serde_json::Value`) so merging and navigation are format-agnostic.
//! Key insertion order survives the round trip in all three formats.

use std::fs;
use std::path::Path;

use agentlink_agents::SettingsFormat;
use serde_json::{Map, Value};

use crate::error::{CoreError, CoreResult};

/// Parse text in the given format
///
/// Blank TOML and YAML documents parse as an empty mapping.
pub fn parse_str(content: &str, format: SettingsFormat) -> Result<Value, String> {
    match format {
        SettingsFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        SettingsFormat::Toml => {
            let table: toml::Table = toml::from_str(content).map_err(|e| e.to_string())?;
            serde_json::to_value(table).map_err(|e| e.to_string())
        }
        SettingsFormat::Yaml => {
            if content.trim().is_empty() {
                return Ok(Value::Object(Map::new()));
            }
            let value: Value = serde_yaml::from_str(content).map_err(|e| e.to_string())?;
            Ok(if value.is_null() {
                Value::Object(Map::new())
            } else {
                value
            })
        }
    }
}

/// Read and parse a settings file
pub fn read_file(path: &Path, format: SettingsFormat) -> CoreResult<Value> {
    let content = fs::read_to_string(path).map_err(|e| CoreError::io(path, &e))?;
    parse_str(&content, format).map_err(|message| CoreError::Parse {
        path: path.to_path_buf(),
        format: format.to_string(),
        message,
    })
}

/// Render a tree in the given format, ending with a newline
///
/// TOML has no null, so null keys and array elements are dropped when
/// rendering it.
pub fn render(value: &Value, format: SettingsFormat) -> CoreResult<String> {
    let render_err = |message: String| CoreError::Render {
        format: format.to_string(),
        message,
    };

    let mut out = match format {
        SettingsFormat::Json => {
            serde_json::to_string_pretty(value).map_err(|e| render_err(e.to_string()))?
        }
        SettingsFormat::Toml => toml::to_string_pretty(&without_nulls(value))
            .map_err(|e| render_err(e.to_string()))?,
        SettingsFormat::Yaml => serde_yaml::to_string(value).map_err(|e| render_err(e.to_string()))?,
    };

    if !out.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}

fn without_nulls(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), without_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .filter(|v| !v.is_null())
                .map(without_nulls)
                .collect(),
        ),
        other => other.clone(),
    }
}
