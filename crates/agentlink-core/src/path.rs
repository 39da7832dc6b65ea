//! Setting path addressing
//!
//! A setting path is a dot-separated list of keys where each key may carry
//! one or more bracketed indices: `hooks.SubagentStop[0].hooks[0].command`.

use serde_json::{Map, Value};
use thiserror::Error;

/// One step of a setting path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Mapping key
    Key(String),
    /// Sequence index
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// Syntax errors in a setting path
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathParseError {
    #[error("Setting path is empty")]
    Empty,

    #[error("Invalid path segment '{segment}': {reason}")]
    InvalidSegment { segment: String, reason: String },
}

/// Reasons navigation stops short of the end of a path
///
/// `path` is the portion of the path reached before the failing step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigateError {
    #[error("Cannot index into '{path}': not an array")]
    NotAnArray { path: String, index: usize },

    #[error("Cannot look up key '{key}' in '{path}': not an object")]
    NotAnObject { path: String, key: String },

    #[error("Index {index} out of range at '{path}' (length {len})")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },

    #[error("Key '{key}' not found at '{path}'")]
    KeyNotFound { path: String, key: String },
}

const ROOT: &str = "<root>";

/// Parse a textual setting path into segments
pub fn parse_setting_path(text: &str) -> Result<Vec<PathSegment>, PathParseError> {
    if text.trim().is_empty() {
        return Err(PathParseError::Empty);
    }

    let mut segments = Vec::new();
    for part in text.split('.') {
        parse_part(part, &mut segments)?;
    }
    Ok(segments)
}

fn parse_part(part: &str, out: &mut Vec<PathSegment>) -> Result<(), PathParseError> {
    let invalid = |reason: &str| PathParseError::InvalidSegment {
        segment: part.to_string(),
        reason: reason.to_string(),
    };

    let (key, mut rest) = match part.find('[') {
        Some(pos) => (&part[..pos], &part[pos..]),
        None => (part, ""),
    };

    if key.is_empty() {
        return Err(invalid("missing key"));
    }
    if key.contains(']') {
        return Err(invalid("unbalanced brackets"));
    }
    out.push(PathSegment::Key(key.to_string()));

    while !rest.is_empty() {
        let Some(inner) = rest.strip_prefix('[') else {
            return Err(invalid("unexpected text after index"));
        };
        let Some(close) = inner.find(']') else {
            return Err(invalid("unbalanced brackets"));
        };
        let digits = &inner[..close];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("index must be a non-negative integer"));
        }
        let index = digits
            .parse::<usize>()
            .map_err(|_| invalid("index is too large"))?;
        out.push(PathSegment::Index(index));
        rest = &inner[close + 1..];
    }

    Ok(())
}

/// Render segments back to their textual form
#[must_use]
pub fn format_path(segments: &[PathSegment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            PathSegment::Key(key) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(key);
            }
            PathSegment::Index(index) => {
                out.push('[');
                out.push_str(&index.to_string());
                out.push(']');
            }
        }
    }
    out
}

fn reached(segments: &[PathSegment], depth: usize) -> String {
    if depth == 0 {
        ROOT.to_string()
    } else {
        format_path(&segments[..depth])
    }
}

/// Walk `data` along `segments`
pub fn navigate<'a>(data: &'a Value, segments: &[PathSegment]) -> Result<&'a Value, NavigateError> {
    let mut current = data;
    for (depth, segment) in segments.iter().enumerate() {
        current = step(current, segment, segments, depth)?;
    }
    Ok(current)
}

fn step<'a>(
    current: &'a Value,
    segment: &PathSegment,
    segments: &[PathSegment],
    depth: usize,
) -> Result<&'a Value, NavigateError> {
    match segment {
        PathSegment::Key(key) => {
            let map = current.as_object().ok_or_else(|| NavigateError::NotAnObject {
                path: reached(segments, depth),
                key: key.clone(),
            })?;
            map.get(key).ok_or_else(|| NavigateError::KeyNotFound {
                path: reached(segments, depth),
                key: key.clone(),
            })
        }
        PathSegment::Index(index) => {
            let items = current.as_array().ok_or_else(|| NavigateError::NotAnArray {
                path: reached(segments, depth),
                index: *index,
            })?;
            items.get(*index).ok_or_else(|| NavigateError::IndexOutOfRange {
                path: reached(segments, depth),
                index: *index,
                len: items.len(),
            })
        }
    }
}

/// Write `value` at `segments`, creating intermediate containers
///
/// An index equal to the current sequence length appends.
pub fn set_at_path(
    root: &mut Value,
    segments: &[PathSegment],
    value: Value,
) -> Result<(), NavigateError> {
    let Some((last, parents)) = segments.split_last() else {
        *root = value;
        return Ok(());
    };

    let mut current = root;
    for (depth, segment) in parents.iter().enumerate() {
        let next = &segments[depth + 1];
        current = child_mut(current, segment, segments, depth, Some(next))?;
    }

    let depth = parents.len();
    match last {
        PathSegment::Key(key) => {
            let map = current
                .as_object_mut()
                .ok_or_else(|| NavigateError::NotAnObject {
                    path: reached(segments, depth),
                    key: key.clone(),
                })?;
            map.insert(key.clone(), value);
        }
        PathSegment::Index(index) => {
            let items = current
                .as_array_mut()
                .ok_or_else(|| NavigateError::NotAnArray {
                    path: reached(segments, depth),
                    index: *index,
                })?;
            match (*index).cmp(&items.len()) {
                std::cmp::Ordering::Less => items[*index] = value,
                std::cmp::Ordering::Equal => items.push(value),
                std::cmp::Ordering::Greater => {
                    return Err(NavigateError::IndexOutOfRange {
                        path: reached(segments, depth),
                        index: *index,
                        len: items.len(),
                    })
                }
            }
        }
    }
    Ok(())
}

/// Remove and return the value at `segments`
pub fn remove_at_path(root: &mut Value, segments: &[PathSegment]) -> Result<Value, NavigateError> {
    let Some((last, parents)) = segments.split_last() else {
        return Ok(std::mem::take(root));
    };

    let mut current = root;
    for (depth, segment) in parents.iter().enumerate() {
        current = child_mut(current, segment, segments, depth, None)?;
    }

    let depth = parents.len();
    match last {
        PathSegment::Key(key) => {
            let map = current
                .as_object_mut()
                .ok_or_else(|| NavigateError::NotAnObject {
                    path: reached(segments, depth),
                    key: key.clone(),
                })?;
            map.shift_remove(key)
                .ok_or_else(|| NavigateError::KeyNotFound {
                    path: reached(segments, depth),
                    key: key.clone(),
                })
        }
        PathSegment::Index(index) => {
            let items = current
                .as_array_mut()
                .ok_or_else(|| NavigateError::NotAnArray {
                    path: reached(segments, depth),
                    index: *index,
                })?;
            if *index >= items.len() {
                return Err(NavigateError::IndexOutOfRange {
                    path: reached(segments, depth),
                    index: *index,
                    len: items.len(),
                });
            }
            Ok(items.remove(*index))
        }
    }
}

/// Step into a child mutably; with `create` set, missing children are
/// created with the container shape the following segment needs
fn child_mut<'a>(
    current: &'a mut Value,
    segment: &PathSegment,
    segments: &[PathSegment],
    depth: usize,
    create: Option<&PathSegment>,
) -> Result<&'a mut Value, NavigateError> {
    let empty_for = |next: &PathSegment| match next {
        PathSegment::Key(_) => Value::Object(Map::new()),
        PathSegment::Index(_) => Value::Array(Vec::new()),
    };

    match segment {
        PathSegment::Key(key) => {
            let map = current
                .as_object_mut()
                .ok_or_else(|| NavigateError::NotAnObject {
                    path: reached(segments, depth),
                    key: key.clone(),
                })?;
            match create {
                Some(next) => Ok(map.entry(key.clone()).or_insert_with(|| empty_for(next))),
                None => map.get_mut(key).ok_or_else(|| NavigateError::KeyNotFound {
                    path: reached(segments, depth),
                    key: key.clone(),
                }),
            }
        }
        PathSegment::Index(index) => {
            let items = current
                .as_array_mut()
                .ok_or_else(|| NavigateError::NotAnArray {
                    path: reached(segments, depth),
                    index: *index,
                })?;
            let len = items.len();
            if let Some(next) = create {
                if *index == len {
                    items.push(empty_for(next));
                }
            }
            items
                .get_mut(*index)
                .ok_or(NavigateError::IndexOutOfRange {
                    path: reached(segments, depth),
                    index: *index,
                    len,
                })
        }
    }
}
