//! Dotted-path access into loosely typed state

use serde_json::Value;

fn step<'a>(current: &'a Value, key: &str) -> Option<&'a Value> {
    match current {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Resolve `path` (e.g. `"threads.byId.t1"`) inside `state`.
///
/// Array segments are addressed by index. Returns `None` as soon as a
/// segment is missing or the current value is not a container.
pub fn get_safe_property<'a>(state: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(state, step)
}

/// Whether `path` resolves to a present value (`null` counts as present).
pub fn has_valid_property(state: &Value, path: &str) -> bool {
    get_safe_property(state, path).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_lookup() {
        let state = json!({"threads": {"byId": {"t1": {"name": "general"}}, "allIds": ["t1"]}});
        assert!(has_valid_property(&state, "threads.byId.t1"));
        assert_eq!(
            get_safe_property(&state, "threads.byId.t1.name"),
            Some(&json!("general"))
        );
        assert_eq!(get_safe_property(&state, "threads.allIds.0"), Some(&json!("t1")));
        assert!(!has_valid_property(&state, "threads.byId.t2"));
        assert!(!has_valid_property(&state, "threads.byId.t1.name.first"));
    }

    #[test]
    fn test_null_is_present() {
        let state = json!({"room": null});
        assert!(has_valid_property(&state, "room"));
        assert!(!has_valid_property(&state, "room.id"));
        assert_eq!(get_safe_property(&state, "me").cloned().unwrap_or(json!("fallback")), "fallback");
    }
}
