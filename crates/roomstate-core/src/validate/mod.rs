//! # State Shape Validation
//!
//! The room state is assembled from untyped JSON payloads, so its shape is
//! checked at runtime against a declarative table of top-level properties
//! (see [`room_state_shape`]). A [`ValidationReport`] separates:
//!
//! - **missing properties**: declared but absent
//! - **errors**: wrong type, or a broken nested structure (`byId`/`allIds`, ...)
//! - **warnings**: undeclared keys (schema drift) and soft flag checks
//!
//! [`StateShapeValidator::assert_valid`] turns an invalid report into a single
//! [`StoreError::InvalidState`]; [`StateShapeValidator::validate_and_log`] only
//! logs.

mod path;
mod shape;

pub use path::{get_safe_property, has_valid_property};
pub use shape::{room_state_shape, NestedRule, PropertySpec, TypeDescriptor, ValueKind};

use crate::errors::{Result, StoreError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Outcome of a shape check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// No errors and no missing properties
    pub is_valid: bool,
    /// Type mismatches and broken nested structures
    pub errors: Vec<String>,
    /// Drift and soft checks; never affect validity
    pub warnings: Vec<String>,
    /// Declared properties absent from the state
    pub missing_properties: Vec<String>,
}

impl ValidationReport {
    /// One-line summary used by the fail-fast assertion.
    ///
    /// `Invalid room state (ctx) | Missing: a, b | Errors: e1; e2`
    pub fn summary(&self, context: Option<&str>) -> String {
        let mut pieces = vec![match context {
            Some(context) => format!("Invalid room state ({context})"),
            None => "Invalid room state".to_string(),
        }];
        if !self.missing_properties.is_empty() {
            pieces.push(format!("Missing: {}", self.missing_properties.join(", ")));
        }
        if !self.errors.is_empty() {
            pieces.push(format!("Errors: {}", self.errors.join("; ")));
        }
        pieces.join(" | ")
    }
}

/// How a host applies the validator after merges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Skip validation
    Off,
    /// Validate and log problems
    #[default]
    Log,
    /// Fail on invalid state
    Assert,
}

impl FromStr for ValidationMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "log" => Ok(Self::Log),
            "assert" => Ok(Self::Assert),
            other => Err(format!("unknown validation mode '{other}' (off, log, assert)")),
        }
    }
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Off => "off",
            Self::Log => "log",
            Self::Assert => "assert",
        })
    }
}

/// Checks a state object against a property table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateShapeValidator {
    shape: IndexMap<String, PropertySpec>,
}

impl Default for StateShapeValidator {
    fn default() -> Self {
        Self::room()
    }
}

impl StateShapeValidator {
    /// Validator for the room state.
    pub fn room() -> Self {
        Self::with_shape(room_state_shape())
    }

    /// Validator for an arbitrary table.
    pub fn with_shape(shape: IndexMap<String, PropertySpec>) -> Self {
        Self { shape }
    }

    /// Declare (or redeclare) a property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, spec: PropertySpec) -> Self {
        self.shape.insert(key.into(), spec);
        self
    }

    /// Declared property names in table order.
    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.shape.keys().map(String::as_str)
    }

    /// Check `state` and report every problem found.
    pub fn validate(&self, state: &Value) -> ValidationReport {
        let Value::Object(state) = state else {
            return ValidationReport {
                is_valid: false,
                errors: vec!["Room state is not an object".to_string()],
                ..ValidationReport::default()
            };
        };

        let mut report = ValidationReport::default();
        for (key, spec) in &self.shape {
            match state.get(key) {
                None if !spec.descriptor.is_optional() => {
                    report.missing_properties.push(key.clone());
                }
                None => {}
                Some(value) => check_property(key, value, spec, &mut report),
            }
        }

        let unexpected: Vec<&str> = state
            .keys()
            .filter(|key| !self.shape.contains_key(*key))
            .map(String::as_str)
            .collect();
        if !unexpected.is_empty() {
            report
                .warnings
                .push(format!("Unexpected properties found: {}", unexpected.join(", ")));
        }

        report.is_valid = report.errors.is_empty() && report.missing_properties.is_empty();
        report
    }

    /// Fail with an aggregated [`StoreError::InvalidState`] if `state` is invalid.
    pub fn assert_valid(&self, state: &Value, context: Option<&str>) -> Result<ValidationReport> {
        let report = self.validate(state);
        if report.is_valid {
            Ok(report)
        } else {
            Err(StoreError::invalid_state(context, report.summary(context)))
        }
    }

    /// Validate and log the outcome; never fails.
    pub fn validate_and_log(&self, state: &Value) -> ValidationReport {
        let report = self.validate(state);

        if !report.is_valid {
            tracing::error!(
                missing = ?report.missing_properties,
                errors = ?report.errors,
                "room state validation failed"
            );
        }
        for warning in &report.warnings {
            tracing::warn!(%warning, "room state validation warning");
        }
        report
    }

    /// Run the validator as configured by `mode`.
    ///
    /// Returns `None` when validation is off.
    pub fn check(
        &self,
        state: &Value,
        mode: ValidationMode,
        context: Option<&str>,
    ) -> Result<Option<ValidationReport>> {
        match mode {
            ValidationMode::Off => Ok(None),
            ValidationMode::Log => Ok(Some(self.validate_and_log(state))),
            ValidationMode::Assert => self.assert_valid(state, context).map(Some),
        }
    }
}

fn check_property(key: &str, value: &Value, spec: &PropertySpec, report: &mut ValidationReport) {
    if !spec.descriptor.matches(value) {
        report.errors.push(format!(
            "Property '{key}' has incorrect type. Expected: {}, Got: {}",
            spec.descriptor,
            ValueKind::of(value)
        ));
    }

    let Value::Object(inner) = value else {
        return;
    };
    for rule in &spec.nested {
        match rule {
            NestedRule::Require { field, kind } => {
                if inner.get(*field).map(ValueKind::of) != Some(*kind) {
                    report
                        .errors
                        .push(format!("{key}.{field} is missing or not an {kind}"));
                }
            }
            NestedRule::ExpectBoolean { field } => {
                if !inner.get(*field).is_some_and(Value::is_boolean) {
                    report
                        .warnings
                        .push(format!("{key}.{field} should be a boolean"));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn collection() -> Value {
        json!({"byId": {}, "allIds": []})
    }

    fn flags() -> Value {
        json!({"room": false, "mainThread": false, "allThreads": false, "userRooms": false})
    }

    fn well_formed() -> Value {
        json!({
            "room": null, "userRooms": [], "userRoomsPagination": {}, "searchRooms": {},
            "account": null, "roomContext": null, "authorization_requests": [],
            "messages": collection(), "messagesContent": {}, "messagesExecutions": {},
            "executions": collection(),
            "messageParts": {"byId": {}, "allIds": [], "byMessageId": {}},
            "threads": collection(), "mainThread": null,
            "thread": {"drawer": {}, "main": {}, "respond": {}},
            "temporaryThread": null, "members": collection(), "me": null,
            "tabs": collection(), "voiceConversations": {},
            "activationLifecycles": {}, "responseLifecycles": {}, "runningResponses": {},
            "drawerOpen": false, "isRealtimeCall": false, "contextMenu": null,
            "uploadProgress": 0, "isUploading": false,
            "initialized": flags(), "loading": flags()
        })
    }

    #[test]
    fn test_empty_state_is_missing_everything() {
        let validator = StateShapeValidator::room();
        let report = validator.validate(&json!({}));
        assert!(!report.is_valid);
        let expected: Vec<String> = validator.properties().map(str::to_string).collect();
        assert_eq!(report.missing_properties, expected);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_well_formed_state_is_valid() {
        let report = StateShapeValidator::room().validate(&well_formed());
        assert!(report.is_valid, "{report:?}");
        assert!(report.errors.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_type_and_nested_errors() {
        let mut state = well_formed();
        state["mainThread"] = json!(42);
        state["messages"] = json!({"byId": {}});
        state["thread"] = json!({"drawer": {}, "main": {}});
        state["messageParts"] = json!({"byId": {}, "allIds": []});

        let report = StateShapeValidator::room().validate(&state);
        assert!(!report.is_valid);
        assert!(report.errors.contains(
            &"Property 'mainThread' has incorrect type. Expected: string|null, Got: number"
                .to_string()
        ));
        assert!(report
            .errors
            .contains(&"messages.allIds is missing or not an array".to_string()));
        assert!(report
            .errors
            .contains(&"thread.respond is missing or not an object".to_string()));
        assert!(report
            .errors
            .contains(&"messageParts.byMessageId is missing or not an object".to_string()));
    }

    #[test]
    fn test_warnings_do_not_invalidate() {
        let mut state = well_formed();
        state["legacyField"] = json!(1);
        state["initialized"] = json!({"room": true});

        let report = StateShapeValidator::room().validate(&state);
        assert!(report.is_valid);
        assert!(report
            .warnings
            .contains(&"Unexpected properties found: legacyField".to_string()));
        assert!(report
            .warnings
            .contains(&"initialized.mainThread should be a boolean".to_string()));
    }

    #[test]
    fn test_non_object_state() {
        let report = StateShapeValidator::room().validate(&json!([1, 2]));
        assert!(!report.is_valid);
        assert_eq!(report.errors, vec!["Room state is not an object"]);
    }

    #[test]
    fn test_assert_valid_message() {
        let validator = StateShapeValidator::with_shape(IndexMap::new())
            .with_property("a", PropertySpec::new(TypeDescriptor::kind(ValueKind::String)))
            .with_property("b", PropertySpec::new(TypeDescriptor::kind(ValueKind::Number)));

        let err = validator
            .assert_valid(&json!({"b": "x"}), Some("merge"))
            .unwrap_err();
        assert_matches!(err, StoreError::InvalidState { ref context, .. } if context.as_deref() == Some("merge"));
        assert_eq!(
            err.to_string(),
            "Invalid room state (merge) | Missing: a | Errors: Property 'b' has incorrect type. Expected: number, Got: string"
        );
        assert!(validator.assert_valid(&json!({"a": "", "b": 1}), None).is_ok());
    }

    #[test]
    fn test_check_respects_mode() {
        let validator = StateShapeValidator::room();
        assert_eq!(validator.check(&json!({}), ValidationMode::Off, None), Ok(None));
        assert!(validator
            .check(&json!({}), ValidationMode::Log, None)
            .unwrap()
            .is_some());
        assert!(validator.check(&json!({}), ValidationMode::Assert, None).is_err());
        assert_eq!("ASSERT".parse::<ValidationMode>(), Ok(ValidationMode::Assert));
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = StateShapeValidator::room().validate(&json!({}));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["isValid"], false);
        assert!(json["missingProperties"].is_array());
    }
}
