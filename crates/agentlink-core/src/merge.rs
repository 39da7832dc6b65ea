//! Deep merge of configuration trees

use serde_json::{Map, Value};

/// Merge `overlay` onto `base`, returning a new tree
///
/// - mapping + mapping: merged key by key, keys from both sides kept
/// - sequence + sequence: patched by position; paired mappings recurse,
///   any other pair takes the overlay element, base-only tail elements
///   are kept and overlay-only tail elements are appended
/// - anything else: the overlay value wins
///
/// Neither input is modified.
#[must_use]
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(b), Value::Object(o)) => Value::Object(merge_maps(b, o)),
        (Value::Array(b), Value::Array(o)) => {
            let len = b.len().max(o.len());
            let merged = (0..len)
                .filter_map(|i| match (b.get(i), o.get(i)) {
                    (Some(bv @ Value::Object(_)), Some(ov @ Value::Object(_))) => {
                        Some(deep_merge(bv, ov))
                    }
                    (_, Some(ov)) => Some(ov.clone()),
                    (Some(bv), None) => Some(bv.clone()),
                    (None, None) => None,
                })
                .collect();
            Value::Array(merged)
        }
        (_, overlay) => overlay.clone(),
    }
}

/// Merge two mappings with [`deep_merge`] semantics
#[must_use]
pub fn merge_maps(base: &Map<String, Value>, overlay: &Map<String, Value>) -> Map<String, Value> {
    let mut out = base.clone();
    for (key, value) in overlay {
        let merged = match base.get(key) {
            Some(existing) => deep_merge(existing, value),
            None => value.clone(),
        };
        out.insert(key.clone(), merged);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_nested_objects_merge() {
        let base = json!({"a": {"x": 1, "y": 2}, "keep": true});
        let overlay = json!({"a": {"y": 3, "z": 4}, "new": "v"});
        assert_eq!(
            deep_merge(&base, &overlay),
            json!({"a": {"x": 1, "y": 3, "z": 4}, "keep": true, "new": "v"})
        );
    }

    #[test]
    fn test_array_patch_by_position() {
        let base = json!({"items": ["a", "b", "c"]});
        let overlay = json!({"items": ["x", "y"]});
        assert_eq!(deep_merge(&base, &overlay), json!({"items": ["x", "y", "c"]}));
    }

    #[test]
    fn test_array_overlay_longer() {
        let base = json!({"items": ["a"]});
        let overlay = json!({"items": ["x", "y", "z"]});
        assert_eq!(deep_merge(&base, &overlay), json!({"items": ["x", "y", "z"]}));
    }

    #[test]
    fn test_array_of_objects_recurses() {
        let base = json!({"hooks": [{"cmd": "a", "timeout": 5}, {"cmd": "b"}]});
        let overlay = json!({"hooks": [{}, {"cmd": "B"}]});
        assert_eq!(
            deep_merge(&base, &overlay),
            json!({"hooks": [{"cmd": "a", "timeout": 5}, {"cmd": "B"}]})
        );
    }

    #[test]
    fn test_shape_mismatch_overlay_wins() {
        assert_eq!(deep_merge(&json!({"a": [1, 2]}), &json!({"a": {"b": 1}})), json!({"a": {"b": 1}}));
        assert_eq!(deep_merge(&json!({"a": {"b": 1}}), &json!({"a": null})), json!({"a": null}));
        assert_eq!(deep_merge(&json!("s"), &json!(3)), json!(3));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let base = json!({"a": [1, {"b": 2}], "c": {"d": "e"}});
        let overlay = json!({"a": [9, {"f": 1}, 7], "c": {"g": false}});
        let once = deep_merge(&base, &overlay);
        assert_eq!(deep_merge(&once, &overlay), once);
    }

    #[test]
    fn test_disjoint_keys_union() {
        let base = json!({"a": 1});
        let overlay = json!({"b": 2});
        assert_eq!(deep_merge(&base, &overlay), json!({"a": 1, "b": 2}));
        assert_eq!(deep_merge(&base, &json!({"a": 1})), base);
    }

    #[test]
    fn test_inputs_untouched() {
        let base = json!({"a": {"b": 1}});
        let overlay = json!({"a": {"c": 2}});
        let _ = deep_merge(&base, &overlay);
        assert_eq!(base, json!({"a": {"b": 1}}));
        assert_eq!(overlay, json!({"a": {"c": 2}}));
    }
}
