//! Deep merge for layered settings.
//!
//! Higher tiers override lower tiers field by field. Arrays are replaced
//! entirely, not concatenated.

use serde_json::Value;

/// Deep merge two JSON values, with `overlay` taking precedence over `base`.
///
/// - Objects are merged recursively: keys in overlay override keys in base
/// - Arrays, strings, numbers, booleans are replaced entirely
/// - A null overlay keeps the base value (null means "not specified")
///
/// # Example
/// ```
/// use serde_json::json;
/// use confluence_entrypoint::config::deep_merge;
///
/// let base = json!({ "home_dir": "/var/data", "start_args": ["-fg"] });
/// let overlay = json!({ "home_dir": "/data", "start_args": [] });
/// let merged = deep_merge(base, overlay);
/// assert_eq!(merged, json!({ "home_dir": "/data", "start_args": [] }));
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged_value = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged_value);
            }
            Value::Object(base_map)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Merge tiers in order, later tiers taking precedence.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values.into_iter().fold(Value::Null, deep_merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_simple_objects() {
        let result = deep_merge(json!({"a": 1, "b": 2}), json!({"b": 3, "c": 4}));
        assert_eq!(result, json!({"a": 1, "b": 3, "c": 4}));
    }

    #[test]
    fn test_arrays_replaced_not_merged() {
        let result = deep_merge(
            json!({"keep_env": ["A", "B"]}),
            json!({"keep_env": ["C"]}),
        );
        assert_eq!(result, json!({"keep_env": ["C"]}));
    }

    #[test]
    fn test_null_preserves_base() {
        let result = deep_merge(json!({"run_uid": 2002}), json!({"run_uid": null}));
        assert_eq!(result, json!({"run_uid": 2002}));
    }

    #[test]
    fn test_merge_all_later_wins() {
        let result = deep_merge_all(vec![
            json!({"home_dir": "/a"}),
            json!({"install_dir": "/b"}),
            json!({"home_dir": "/c"}),
        ]);
        assert_eq!(result, json!({"home_dir": "/c", "install_dir": "/b"}));
    }
}
