//! Recursive JSON merge
//!
//! `source` keys are folded into `target` in place. Two objects recurse;
//! anything else overwrites, including `null`, which clears the field.
//! How arrays behave is an explicit [`ArrayPolicy`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// How [`deep_merge`] treats two array values meeting at the same key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArrayPolicy {
    /// The source array replaces the target array atomically
    #[default]
    Replace,
    /// Arrays merge element-wise by index; the result has the longer length
    /// and keeps target elements past the end of the source
    MergeByIndex,
}

impl ArrayPolicy {
    /// Lowercase label, as accepted by [`FromStr`].
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::MergeByIndex => "merge-by-index",
        }
    }
}

impl fmt::Display for ArrayPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ArrayPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "replace" => Ok(Self::Replace),
            "merge-by-index" | "merge_by_index" | "by-index" => Ok(Self::MergeByIndex),
            other => Err(format!(
                "unknown array policy '{other}' (expected 'replace' or 'merge-by-index')"
            )),
        }
    }
}

/// Merge `source` into `target` recursively and return `target`.
pub fn deep_merge<'a>(target: &'a mut Value, source: &Value, policy: ArrayPolicy) -> &'a mut Value {
    merge_value(target, source, policy);
    target
}

fn merge_value(target: &mut Value, source: &Value, policy: ArrayPolicy) {
    match (target, source) {
        (Value::Object(target_obj), Value::Object(source_obj)) => {
            for (key, source_value) in source_obj {
                match target_obj.get_mut(key) {
                    Some(target_value) => merge_value(target_value, source_value, policy),
                    None => {
                        target_obj.insert(key.clone(), source_value.clone());
                    }
                }
            }
        }
        (Value::Array(target_arr), Value::Array(source_arr))
            if policy == ArrayPolicy::MergeByIndex =>
        {
            for (idx, source_value) in source_arr.iter().enumerate() {
                match target_arr.get_mut(idx) {
                    Some(target_value) => merge_value(target_value, source_value, policy),
                    None => target_arr.push(source_value.clone()),
                }
            }
        }
        (target, source) => {
            *target = source.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_objects_recurse() {
        let mut target = json!({"a": {"x": 1, "y": 2}, "b": 1});
        deep_merge(&mut target, &json!({"a": {"y": 3, "z": 4}}), ArrayPolicy::Replace);
        assert_eq!(target, json!({"a": {"x": 1, "y": 3, "z": 4}, "b": 1}));
    }

    #[test]
    fn test_null_clears_field() {
        let mut target = json!({"meta": {"k": "v"}});
        deep_merge(&mut target, &json!({"meta": null}), ArrayPolicy::Replace);
        assert_eq!(target, json!({"meta": null}));
    }

    #[test]
    fn test_scalar_replaces_object() {
        let mut target = json!({"a": {"x": 1}});
        deep_merge(&mut target, &json!({"a": 5}), ArrayPolicy::Replace);
        assert_eq!(target, json!({"a": 5}));
    }

    #[test]
    fn test_arrays_replace_atomically() {
        let mut target = json!({"tags": [1, 2, 3]});
        deep_merge(&mut target, &json!({"tags": [9]}), ArrayPolicy::Replace);
        assert_eq!(target, json!({"tags": [9]}));
    }

    #[test]
    fn test_arrays_merge_by_index_keeps_tail() {
        let mut target = json!({"tags": [1, 2, 3]});
        deep_merge(&mut target, &json!({"tags": [9]}), ArrayPolicy::MergeByIndex);
        assert_eq!(target, json!({"tags": [9, 2, 3]}));

        let mut target = json!({"rows": [{"a": 1}]});
        deep_merge(
            &mut target,
            &json!({"rows": [{"b": 2}, {"c": 3}]}),
            ArrayPolicy::MergeByIndex,
        );
        assert_eq!(target, json!({"rows": [{"a": 1, "b": 2}, {"c": 3}]}));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let source = json!({"a": {"b": [1, {"c": 2}]}, "d": null});
        for policy in [ArrayPolicy::Replace, ArrayPolicy::MergeByIndex] {
            let mut once = json!({"a": {"b": [0], "e": 1}});
            deep_merge(&mut once, &source, policy);
            let mut twice = once.clone();
            deep_merge(&mut twice, &source, policy);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("replace".parse::<ArrayPolicy>(), Ok(ArrayPolicy::Replace));
        assert_eq!(
            "merge-by-index".parse::<ArrayPolicy>(),
            Ok(ArrayPolicy::MergeByIndex)
        );
        assert!("zip".parse::<ArrayPolicy>().is_err());
    }
}
