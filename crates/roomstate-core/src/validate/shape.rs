//! Type descriptors and the room state shape table

use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Runtime kind of a JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// JSON object
    Object,
    /// JSON array
    Array,
    /// JSON string
    String,
    /// JSON number
    Number,
    /// JSON boolean
    Boolean,
    /// JSON null
    Null,
}

impl ValueKind {
    /// Kind of `value`.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Object(_) => Self::Object,
            Value::Array(_) => Self::Array,
            Value::String(_) => Self::String,
            Value::Number(_) => Self::Number,
            Value::Bool(_) => Self::Boolean,
            Value::Null => Self::Null,
        }
    }

    /// Descriptor label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Null => "null",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Expected type of a top-level property.
///
/// Parsed from union syntax such as `"string|null"`. `any` accepts every
/// present value; `undefined` makes the property optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    kinds: Vec<ValueKind>,
    any: bool,
    optional: bool,
}

impl TypeDescriptor {
    /// Descriptor accepting exactly one kind.
    pub fn kind(kind: ValueKind) -> Self {
        Self {
            kinds: vec![kind],
            any: false,
            optional: false,
        }
    }

    /// Descriptor accepting any present value.
    pub fn any() -> Self {
        Self {
            kinds: Vec::new(),
            any: true,
            optional: false,
        }
    }

    /// Also accept `null`.
    #[must_use]
    pub fn or_null(mut self) -> Self {
        if !self.kinds.contains(&ValueKind::Null) {
            self.kinds.push(ValueKind::Null);
        }
        self
    }

    /// Allow the property to be absent.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Whether absence is allowed.
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Whether `value` satisfies the descriptor.
    pub fn matches(&self, value: &Value) -> bool {
        self.any || self.kinds.contains(&ValueKind::of(value))
    }
}

impl FromStr for TypeDescriptor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut descriptor = Self {
            kinds: Vec::new(),
            any: false,
            optional: false,
        };
        for part in s.split('|').map(str::trim) {
            match part {
                "any" => descriptor.any = true,
                "undefined" => descriptor.optional = true,
                "object" => descriptor.kinds.push(ValueKind::Object),
                "array" => descriptor.kinds.push(ValueKind::Array),
                "string" => descriptor.kinds.push(ValueKind::String),
                "number" => descriptor.kinds.push(ValueKind::Number),
                "boolean" => descriptor.kinds.push(ValueKind::Boolean),
                "null" => descriptor.kinds.push(ValueKind::Null),
                other => return Err(format!("unknown type '{other}' in '{s}'")),
            }
        }
        Ok(descriptor)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut labels: Vec<&str> = self.kinds.iter().map(ValueKind::label).collect();
        if self.any {
            labels.insert(0, "any");
        }
        if self.optional {
            labels.push("undefined");
        }
        f.write_str(&labels.join("|"))
    }
}

/// Structural check applied inside a present, object-valued property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NestedRule {
    /// `field` must exist with the given kind (error otherwise)
    Require {
        /// Sub-field name
        field: &'static str,
        /// Required kind
        kind: ValueKind,
    },
    /// `field` should be a boolean (warning otherwise)
    ExpectBoolean {
        /// Sub-field name
        field: &'static str,
    },
}

/// Expected type plus nested rules of one property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySpec {
    /// Top-level type
    pub descriptor: TypeDescriptor,
    /// Checks run when the value is an object
    pub nested: Vec<NestedRule>,
}

impl PropertySpec {
    /// Property with no nested rules.
    pub fn new(descriptor: TypeDescriptor) -> Self {
        Self {
            descriptor,
            nested: Vec::new(),
        }
    }

    /// Normalized collection: `byId` object and `allIds` array.
    pub fn collection() -> Self {
        Self::new(TypeDescriptor::kind(ValueKind::Object))
            .require("byId", ValueKind::Object)
            .require("allIds", ValueKind::Array)
    }

    /// Add a required sub-field.
    #[must_use]
    pub fn require(mut self, field: &'static str, kind: ValueKind) -> Self {
        self.nested.push(NestedRule::Require { field, kind });
        self
    }

    /// Add boolean-flag expectations.
    #[must_use]
    pub fn boolean_flags(mut self, fields: &[&'static str]) -> Self {
        self.nested
            .extend(fields.iter().map(|&field| NestedRule::ExpectBoolean { field }));
        self
    }
}

const LIFECYCLE_FLAGS: &[&str] = &["room", "mainThread", "allThreads", "userRooms"];

/// Shape of the client's room state.
pub fn room_state_shape() -> IndexMap<String, PropertySpec> {
    use ValueKind::{Array, Boolean, Object, String as Str};

    let object = || PropertySpec::new(TypeDescriptor::kind(Object));
    let nullable = |kind| PropertySpec::new(TypeDescriptor::kind(kind).or_null());
    let any = || PropertySpec::new(TypeDescriptor::any());
    let plain = |kind| PropertySpec::new(TypeDescriptor::kind(kind));

    let entries: Vec<(&str, PropertySpec)> = vec![
        // room
        ("room", nullable(Object)),
        ("userRooms", plain(Array)),
        ("userRoomsPagination", object()),
        ("searchRooms", object()),
        ("account", nullable(Object)),
        ("roomContext", any()),
        ("authorization_requests", plain(Array)),
        // messages
        ("messages", PropertySpec::collection()),
        ("messagesContent", object()),
        ("messagesExecutions", object()),
        ("executions", PropertySpec::collection()),
        (
            "messageParts",
            PropertySpec::collection().require("byMessageId", Object),
        ),
        // threads
        ("threads", PropertySpec::collection()),
        ("mainThread", nullable(Str)),
        (
            "thread",
            object()
                .require("drawer", Object)
                .require("main", Object)
                .require("respond", Object),
        ),
        ("temporaryThread", nullable(Object)),
        // members
        ("members", PropertySpec::collection()),
        ("me", nullable(Object)),
        ("tabs", PropertySpec::collection()),
        ("voiceConversations", object()),
        // lifecycles
        ("activationLifecycles", object()),
        ("responseLifecycles", object()),
        ("runningResponses", object()),
        // ui
        ("drawerOpen", plain(Boolean)),
        ("isRealtimeCall", plain(Boolean)),
        ("contextMenu", any()),
        ("uploadProgress", any()),
        ("isUploading", plain(Boolean)),
        ("initialized", object().boolean_flags(LIFECYCLE_FLAGS)),
        ("loading", object().boolean_flags(LIFECYCLE_FLAGS)),
    ];

    entries
        .into_iter()
        .map(|(key, spec)| (key.to_string(), spec))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_descriptor_parse_and_display() {
        let descriptor: TypeDescriptor = "string|null".parse().unwrap();
        assert!(descriptor.matches(&json!("x")));
        assert!(descriptor.matches(&Value::Null));
        assert!(!descriptor.matches(&json!(1)));
        assert_eq!(descriptor.to_string(), "string|null");

        assert!("strnig".parse::<TypeDescriptor>().is_err());
        assert!("object|undefined".parse::<TypeDescriptor>().unwrap().is_optional());
    }

    #[test]
    fn test_any_accepts_null_but_object_does_not() {
        assert!(TypeDescriptor::any().matches(&Value::Null));
        assert!(!TypeDescriptor::kind(ValueKind::Object).matches(&Value::Null));
        assert!(!TypeDescriptor::kind(ValueKind::Object).matches(&json!([])));
    }

    #[test]
    fn test_room_shape_has_every_property() {
        let shape = room_state_shape();
        assert_eq!(shape.len(), 30);
        assert_eq!(shape["mainThread"].descriptor.to_string(), "string|null");
        assert_eq!(shape["messageParts"].nested.len(), 3);
    }
}
