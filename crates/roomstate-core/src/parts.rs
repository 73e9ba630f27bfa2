//! Message parts
//!
//! A message is rendered from an ordered set of parts: text, thinking, or
//! tool calls. Parts arrive either whole (REST payloads, batch loads) or as
//! a stream of deltas appended to their `text` / `arguments` field.
//!
//! [`MessagePart::from_raw`] turns a loose JSON payload into a typed part:
//! it resolves the part kind (`type` or `part_type`, default text), drops
//! non-finite ordering keys, derives tool data from an embedded
//! `task_execution` and fills kind-specific defaults. Payloads merged over
//! a stored part go through [`MessagePart::from_payload`] instead, which
//! leaves absent fields unset.

use crate::collection::{coerce_id, Entity};
use crate::streaming::{DeltaOutcome, StreamCursor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Execution status strings shared by tool and thinking parts.
pub mod status {
    /// Tool finished successfully
    pub const SUCCESS: &str = "success";
    /// Tool failed
    pub const ERROR: &str = "error";
    /// Tool queued
    pub const PENDING: &str = "pending";
    /// Thinking still running
    pub const IN_PROGRESS: &str = "in_progress";
    /// Thinking (or tool) finished
    pub const COMPLETED: &str = "completed";
}

/// Fallback name for tool parts without a usable one.
pub const DEFAULT_TOOL_NAME: &str = "Tool";

/// Event keywords that leak into tool names from lifecycle payloads.
const EVENT_KEYWORDS: &[&str] = &[
    "updated", "update", "added", "add", "completed", "complete", "deleted", "delete", "created",
    "create", "removed", "remove", "started", "start", "finished", "finish", "failed", "fail",
];

/// Whether `name` can be shown as a tool name.
///
/// Event keywords and names shorter than 3 characters are rejected.
pub fn is_valid_tool_name(name: &str) -> bool {
    let lower = name.trim().to_lowercase();
    lower.chars().count() >= 3 && !EVENT_KEYWORDS.contains(&lower.as_str())
}

// ============================================================================
// Part kind
// ============================================================================

/// Kind of content a part carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartKind {
    /// Plain assistant or user text
    #[default]
    Text,
    /// Model reasoning
    Thinking,
    /// Tool call with streamed arguments
    Tool,
}

impl PartKind {
    /// Parse a wire label; unknown labels yield `None`.
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "text" => Some(Self::Text),
            "thinking" => Some(Self::Thinking),
            "tool" => Some(Self::Tool),
            _ => None,
        }
    }

    /// Wire label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Thinking => "thinking",
            Self::Tool => "tool",
        }
    }
}

impl fmt::Display for PartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Serde helpers
// ============================================================================

/// Accept any JSON value, keeping only finite numbers.
fn finite_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_f64)
        .filter(|n| n.is_finite()))
}

/// Emit whole numbers as integers.
fn whole_number<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => serializer.serialize_i64(*n as i64),
        Some(n) => serializer.serialize_f64(*n),
        None => serializer.serialize_none(),
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

// ============================================================================
// Message part
// ============================================================================

/// A single fragment of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePart {
    /// Part identifier
    pub id: String,
    /// Owning message
    pub message_id: String,
    /// Content kind
    #[serde(rename = "type", default)]
    pub kind: PartKind,
    /// Primary stream position; `None` sorts last
    #[serde(
        default,
        deserialize_with = "finite_number",
        serialize_with = "whole_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub order: Option<f64>,
    /// Position within one `order` bucket; `None` sorts last
    #[serde(
        default,
        deserialize_with = "finite_number",
        serialize_with = "whole_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub block_order: Option<f64>,
    /// ISO-8601 creation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Streaming finished
    #[serde(default)]
    pub is_done: bool,
    /// Deltas still arriving
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_streaming: bool,
    /// Text or thinking content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Tool call arguments (raw, possibly partial JSON)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
    /// Tool name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Execution status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// ISO-8601 completion time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
    /// Bumped on every accepted delta
    #[serde(rename = "updateRevision", default, skip_serializing_if = "is_zero")]
    pub update_revision: u64,
    /// Text chunks in the order they were appended
    #[serde(rename = "streamingChunks", default, skip_serializing_if = "Vec::is_empty")]
    pub streaming_chunks: Vec<String>,
    /// Reorder buffer for `text`
    #[serde(rename = "textStream", default, skip_serializing_if = "StreamCursor::is_fresh")]
    pub text_stream: StreamCursor,
    /// Reorder buffer for `arguments`
    #[serde(
        rename = "argumentsStream",
        default,
        skip_serializing_if = "StreamCursor::is_fresh"
    )]
    pub arguments_stream: StreamCursor,
    /// Every other field, kept verbatim
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Why a raw payload could not become a [`MessagePart`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PartRejection {
    /// Payload is not a JSON object
    #[error("Part payload is not an object")]
    NotAnObject,
    /// No usable `id`
    #[error("Missing part id")]
    MissingId,
    /// No usable `message_id`
    #[error("Missing message_id")]
    MissingMessageId,
    /// Fields present with unusable types
    #[error("Malformed part: {0}")]
    Malformed(String),
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

impl MessagePart {
    /// Create an empty part of the given kind.
    pub fn new(id: impl Into<String>, message_id: impl Into<String>, kind: PartKind) -> Self {
        Self {
            id: id.into(),
            message_id: message_id.into(),
            kind,
            order: None,
            block_order: None,
            created_at: None,
            is_done: false,
            is_streaming: false,
            text: None,
            arguments: None,
            name: None,
            status: None,
            finished_at: None,
            update_revision: 0,
            streaming_chunks: Vec::new(),
            text_stream: StreamCursor::default(),
            arguments_stream: StreamCursor::default(),
            rest: Map::new(),
        }
    }

    /// Set the ordering keys (builder style).
    #[must_use]
    pub fn with_order(mut self, order: f64, block_order: Option<f64>) -> Self {
        self.set_order(Some(order), block_order);
        self
    }

    /// Normalize a raw payload into a fresh part, defaults included.
    pub fn from_raw(raw: Value) -> Result<Self, PartRejection> {
        let mut part = Self::from_payload(raw, PartKind::default())?;
        part.fill_defaults();
        Ok(part)
    }

    /// Normalize a raw payload without filling defaults.
    ///
    /// Only fields the payload carries, or derives through its
    /// `task_execution` / `meta_data`, are set, so the result can be merged
    /// over a stored part without resetting its content. `fallback_kind`
    /// applies when the payload names no type.
    pub fn from_payload(raw: Value, fallback_kind: PartKind) -> Result<Self, PartRejection> {
        let Value::Object(mut map) = raw else {
            return Err(PartRejection::NotAnObject);
        };

        let id = map.get("id").and_then(coerce_id).ok_or(PartRejection::MissingId)?;
        let message_id = map
            .get("message_id")
            .and_then(coerce_id)
            .ok_or(PartRejection::MissingMessageId)?;
        map.insert("id".into(), Value::String(id));
        map.insert("message_id".into(), Value::String(message_id));

        let part_type = map.remove("part_type");
        let kind = non_empty_str(map.get("type"))
            .or_else(|| non_empty_str(part_type.as_ref()))
            .and_then(PartKind::parse)
            .unwrap_or(fallback_kind);
        map.insert("type".into(), Value::String(kind.label().into()));

        if non_empty_str(map.get("created_at")).is_none() {
            match non_empty_str(map.get("date_creation")).map(str::to_owned) {
                Some(date) => map.insert("created_at".into(), Value::String(date)),
                None => map.remove("created_at"),
            };
        }

        if !map.get("text").is_some_and(Value::is_string) {
            map.remove("text");
        }
        match kind {
            PartKind::Text => {}
            PartKind::Thinking => derive_thinking_meta(&mut map),
            PartKind::Tool => derive_tool_data(&mut map),
        }

        let is_done = map.get("is_done").and_then(Value::as_bool).unwrap_or(false)
            || completed_by_status(kind, &map);
        map.insert("is_done".into(), Value::Bool(is_done));
        if !map.get("is_streaming").is_some_and(Value::is_boolean) {
            map.remove("is_streaming");
        }

        serde_json::from_value(Value::Object(map))
            .map_err(|err| PartRejection::Malformed(err.to_string()))
    }

    /// Fill the fields a freshly inserted part must carry.
    ///
    /// Text and thinking parts get an empty `text`; thinking parts an
    /// `in_progress` status and empty provider metadata; tool parts a
    /// displayable name, plus `pending` status and empty arguments when a
    /// task execution is attached.
    pub fn fill_defaults(&mut self) {
        match self.kind {
            PartKind::Text => {
                self.text.get_or_insert_with(String::new);
            }
            PartKind::Thinking => {
                self.text.get_or_insert_with(String::new);
                if self.status.as_deref().map_or(true, str::is_empty) {
                    self.status = Some(status::IN_PROGRESS.to_string());
                }
                self.rest
                    .entry("summary")
                    .or_insert_with(|| Value::Array(Vec::new()));
                for key in ["provider", "provider_id"] {
                    self.rest
                        .entry(key)
                        .or_insert_with(|| Value::String(String::new()));
                }
            }
            PartKind::Tool => {
                if !self.name.as_deref().is_some_and(is_valid_tool_name) {
                    self.name = Some(DEFAULT_TOOL_NAME.to_string());
                }
                if self.rest.contains_key("task_execution") {
                    self.status.get_or_insert_with(|| status::PENDING.to_string());
                    self.arguments.get_or_insert_with(String::new);
                }
            }
        }
    }

    /// Overwrite the ordering keys, discarding non-finite values.
    pub fn set_order(&mut self, order: Option<f64>, block_order: Option<f64>) {
        self.order = order.filter(|n| n.is_finite());
        self.block_order = block_order.filter(|n| n.is_finite());
    }

    /// Fold a freshly normalized payload for the same part into this one.
    ///
    /// Fields the incoming part carries overwrite the stored ones. Stream
    /// cursors, chunk history and the revision counter are kept unless the
    /// incoming part brings its own. A valid tool name is never replaced by
    /// an invalid one, and a finished part stays finished.
    pub fn merge_from(&mut self, incoming: MessagePart) {
        let MessagePart {
            id: _,
            message_id,
            kind,
            order,
            block_order,
            created_at,
            is_done,
            is_streaming,
            text,
            arguments,
            name,
            status,
            finished_at,
            update_revision,
            streaming_chunks,
            text_stream,
            arguments_stream,
            rest,
        } = incoming;

        self.message_id = message_id;
        self.kind = kind;
        if order.is_some() {
            self.order = order;
        }
        if block_order.is_some() {
            self.block_order = block_order;
        }
        overwrite(&mut self.created_at, created_at);
        self.is_done |= is_done;
        self.is_streaming = is_streaming;
        overwrite(&mut self.text, text);
        overwrite(&mut self.arguments, arguments);
        self.merge_name(name);
        overwrite(&mut self.status, status);
        overwrite(&mut self.finished_at, finished_at);
        self.update_revision = self.update_revision.max(update_revision);
        if !streaming_chunks.is_empty() {
            self.streaming_chunks = streaming_chunks;
        }
        if !text_stream.is_fresh() {
            self.text_stream = text_stream;
        }
        if !arguments_stream.is_fresh() {
            self.arguments_stream = arguments_stream;
        }
        self.rest.extend(rest);
    }

    /// Feed one streamed delta into the part's content field.
    ///
    /// Text and thinking parts stream into `text` (recording chunks), tool
    /// parts into `arguments`. Accepted deltas bump `update_revision`.
    pub fn apply_delta(&mut self, delta: &str, index: Option<i64>) -> DeltaOutcome {
        let outcome = match self.kind {
            PartKind::Text | PartKind::Thinking => {
                let text = self.text.get_or_insert_with(String::new);
                let chunks = &mut self.streaming_chunks;
                self.text_stream
                    .push(text, delta, index, |chunk| chunks.push(chunk.to_string()))
            }
            PartKind::Tool => {
                let arguments = self.arguments.get_or_insert_with(String::new);
                let outcome = self.arguments_stream.push(arguments, delta, index, |_| {});
                if outcome.accepted() {
                    self.extract_intent_fields();
                }
                outcome
            }
        };

        if outcome.accepted() {
            self.update_revision += 1;
        }
        outcome
    }

    /// Apply explicit field updates.
    pub fn apply_updates(&mut self, update: &PartUpdate) {
        if update.order.is_some() {
            self.order = update.order;
        }
        if update.block_order.is_some() {
            self.block_order = update.block_order;
        }
        if let Some(kind) = update.kind {
            self.kind = kind;
        }
        overwrite(&mut self.text, update.text.clone());
        overwrite(&mut self.arguments, update.arguments.clone());
        overwrite(&mut self.status, update.status.clone());
        overwrite(&mut self.finished_at, update.finished_at.clone());
        overwrite(&mut self.created_at, update.created_at.clone());
        if let Some(is_done) = update.is_done {
            self.is_done = is_done;
        }
        if let Some(is_streaming) = update.is_streaming {
            self.is_streaming = is_streaming;
        }
        self.merge_name(update.name.clone());
        for (key, value) in &update.fields {
            // identity fields are owned by the store
            if !matches!(key.as_str(), "id" | "message_id") {
                self.rest.insert(key.clone(), value.clone());
            }
        }
    }

    /// Mark the part finished.
    ///
    /// Thinking parts default to `completed`; tool parts become `success`
    /// unless they already carry a terminal status. Both get `finished_at`
    /// when they have none.
    pub fn complete(&mut self, finished_at: &str) {
        self.is_done = true;
        self.is_streaming = false;

        match self.kind {
            PartKind::Thinking => {
                if self.status.as_deref().map_or(true, str::is_empty) {
                    self.status = Some(status::COMPLETED.to_string());
                }
            }
            PartKind::Tool => {
                let terminal = matches!(
                    self.status.as_deref(),
                    Some(status::SUCCESS | status::ERROR | status::COMPLETED)
                );
                if !terminal {
                    self.status = Some(status::SUCCESS.to_string());
                }
            }
            PartKind::Text => return,
        }

        if self.finished_at.is_none() {
            self.finished_at = Some(finished_at.to_string());
        }
    }

    /// A valid tool name is only replaced by another valid one.
    fn merge_name(&mut self, name: Option<String>) {
        let Some(name) = name else { return };
        let keep_current = self.kind == PartKind::Tool
            && !is_valid_tool_name(&name)
            && self.name.as_deref().is_some_and(is_valid_tool_name);
        if keep_current {
            tracing::debug!(part = %self.id, rejected = %name, "kept existing tool name");
        } else {
            self.name = Some(name);
        }
    }

    /// Lift `__act_now`, `__act_done`, `__intent` and `__use_intent` out of
    /// complete JSON arguments.
    fn extract_intent_fields(&mut self) {
        let Some(arguments) = self.arguments.as_deref() else {
            return;
        };
        let Ok(Value::Object(parsed)) = serde_json::from_str::<Value>(arguments) else {
            return;
        };
        for key in ["act_now", "act_done", "intent"] {
            if let Some(value) = non_empty_str(parsed.get(&format!("__{key}"))) {
                self.rest.insert(key.into(), Value::String(value.to_string()));
            }
        }
        if let Some(flag) = parsed.get("__use_intent").and_then(Value::as_bool) {
            self.rest.insert("use_intent".into(), Value::Bool(flag));
        }
    }
}

impl Entity for MessagePart {
    fn entity_id(&self) -> Option<String> {
        (!self.id.is_empty()).then(|| self.id.clone())
    }
}

fn overwrite<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

// ─── Normalization ───────────────────────────────────────────

/// Lift `summary`, `provider`, `provider_id` and `status` out of
/// `meta_data` when present.
fn derive_thinking_meta(map: &mut Map<String, Value>) {
    let Some(Value::Object(meta)) = map.get("meta_data").cloned() else {
        return;
    };
    for key in ["summary", "provider", "provider_id"] {
        if let Some(value) = meta.get(key).filter(|v| !v.is_null()) {
            map.insert(key.into(), value.clone());
        }
    }
    if let Some(status) = non_empty_str(meta.get("status")) {
        map.insert("status".into(), Value::String(status.to_string()));
    }
}

/// Derive tool fields from an embedded task execution.
///
/// Fields the execution does not carry are left as the payload has them.
fn derive_tool_data(map: &mut Map<String, Value>) {
    let Some(Value::Object(execution)) = map.get("task_execution").cloned() else {
        return;
    };

    if let Some(status) = non_empty_str(execution.get("status")) {
        map.insert("status".into(), Value::String(status.to_string()));
    }

    let parsed = match execution.get("arguments") {
        Some(Value::String(raw)) => {
            map.insert("arguments".into(), Value::String(raw.clone()));
            serde_json::from_str(raw).ok()
        }
        Some(obj @ Value::Object(_)) => {
            map.insert("arguments".into(), Value::String(obj.to_string()));
            Some(obj.clone())
        }
        _ => None,
    };

    let tool_name = execution
        .get("tool")
        .and_then(|tool| non_empty_str(tool.get("name")))
        .filter(|name| is_valid_tool_name(name));
    if let Some(name) = tool_name {
        map.insert("name".into(), Value::String(name.to_string()));
    }

    for (from, to) in [
        ("content", "result"),
        ("error", "error"),
        ("input", "input"),
        ("finished_at", "finished_at"),
        ("id", "task_execution_id"),
    ] {
        if let Some(value) = execution.get(from).filter(|v| !v.is_null()) {
            map.insert(to.into(), value.clone());
        }
    }

    let parsed = parsed.unwrap_or(Value::Null);
    for key in ["act_now", "act_done", "intent"] {
        let value = non_empty_str(execution.get(key))
            .or_else(|| non_empty_str(parsed.get(format!("__{key}"))));
        if let Some(value) = value {
            map.insert(key.into(), Value::String(value.to_string()));
        }
    }
    let use_intent = execution
        .get("use_intent")
        .and_then(Value::as_bool)
        .or_else(|| parsed.get("__use_intent").and_then(Value::as_bool));
    if let Some(flag) = use_intent {
        map.insert("use_intent".into(), Value::Bool(flag));
    }
}

fn completed_by_status(kind: PartKind, map: &Map<String, Value>) -> bool {
    let status = map.get("status").and_then(Value::as_str);
    match kind {
        PartKind::Tool => matches!(status, Some(status::SUCCESS | status::ERROR)),
        PartKind::Thinking => {
            status == Some(status::COMPLETED) || non_empty_str(map.get("finished_at")).is_some()
        }
        PartKind::Text => false,
    }
}

// ============================================================================
// Part update
// ============================================================================

/// Streaming update addressed to an existing part.
///
/// `delta`/`index` feed the content stream; every other present field is
/// written onto the part.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartUpdate {
    /// Target part
    pub id: String,
    /// Content chunk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<String>,
    /// Chunk position; absent or negative appends directly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    /// New primary position
    #[serde(default, deserialize_with = "finite_number", skip_serializing_if = "Option::is_none")]
    pub order: Option<f64>,
    /// New secondary position
    #[serde(default, deserialize_with = "finite_number", skip_serializing_if = "Option::is_none")]
    pub block_order: Option<f64>,
    /// New part kind
    #[serde(rename = "type", alias = "part_type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<PartKind>,
    /// Replacement text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Replacement arguments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
    /// Tool name (ignored when invalid)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Execution status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Completion time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
    /// Creation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Finished flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_done: Option<bool>,
    /// Streaming flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_streaming: Option<bool>,
    /// Any other field (`result`, `error`, `tool_use_id`, ...)
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl PartUpdate {
    /// Update carrying only a delta.
    pub fn delta(id: impl Into<String>, delta: impl Into<String>, index: Option<i64>) -> Self {
        Self {
            id: id.into(),
            delta: Some(delta.into()),
            index,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_name_validation() {
        assert!(is_valid_tool_name("web_search"));
        assert!(!is_valid_tool_name("Updated"));
        assert!(!is_valid_tool_name(" added "));
        assert!(!is_valid_tool_name("ab"));
    }

    #[test]
    fn test_from_raw_requires_ids() {
        assert_eq!(
            MessagePart::from_raw(json!({"message_id": "m"})),
            Err(PartRejection::MissingId)
        );
        assert_eq!(
            MessagePart::from_raw(json!({"id": "p"})),
            Err(PartRejection::MissingMessageId)
        );
        assert_eq!(MessagePart::from_raw(json!([1])), Err(PartRejection::NotAnObject));
    }

    #[test]
    fn test_from_raw_normalizes_kind_and_order() {
        let part = MessagePart::from_raw(json!({
            "id": "p1", "message_id": "m1", "part_type": "thinking",
            "order": "3", "block_order": 2, "date_creation": "2024-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(part.kind, PartKind::Thinking);
        assert_eq!(part.order, None);
        assert_eq!(part.block_order, Some(2.0));
        assert_eq!(part.created_at.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(part.status.as_deref(), Some(status::IN_PROGRESS));
        assert_eq!(part.text.as_deref(), Some(""));
        assert!(!part.is_done);
        assert!(!part.rest.contains_key("part_type"));
    }

    #[test]
    fn test_from_raw_tool_execution() {
        let part = MessagePart::from_raw(json!({
            "id": "t1", "message_id": "m1", "type": "tool", "name": "updated",
            "task_execution": {
                "id": "exec-1", "status": "success", "content": "42",
                "tool": {"name": "calculator"},
                "arguments": {"x": 1, "__intent": "add numbers"}
            }
        }))
        .unwrap();

        assert_eq!(part.name.as_deref(), Some("calculator"));
        assert_eq!(part.status.as_deref(), Some(status::SUCCESS));
        assert!(part.is_done);
        assert_eq!(part.rest["result"], "42");
        assert_eq!(part.rest["task_execution_id"], "exec-1");
        assert_eq!(part.rest["intent"], "add numbers");
    }

    #[test]
    fn test_invalid_tool_name_falls_back() {
        let part =
            MessagePart::from_raw(json!({"id": "t", "message_id": "m", "type": "tool", "name": "add"}))
                .unwrap();
        assert_eq!(part.name.as_deref(), Some(DEFAULT_TOOL_NAME));
    }

    #[test]
    fn test_from_payload_leaves_absent_fields_unset() {
        let part = MessagePart::from_payload(
            json!({"id": "p", "message_id": "m", "meta_data": {"provider": "x"}}),
            PartKind::Thinking,
        )
        .unwrap();

        assert_eq!(part.kind, PartKind::Thinking);
        assert_eq!(part.text, None);
        assert_eq!(part.status, None);
        assert_eq!(part.rest["provider"], "x");
        assert!(!part.rest.contains_key("summary"));

        let tool = MessagePart::from_payload(
            json!({"id": "t", "message_id": "m", "type": "tool", "task_execution": {"id": "e"}}),
            PartKind::Text,
        )
        .unwrap();
        assert_eq!(tool.name, None);
        assert_eq!(tool.arguments, None);
        assert_eq!(tool.status, None);
    }

    #[test]
    fn test_merge_payload_keeps_streamed_text() {
        let mut part = MessagePart::from_raw(json!({"id": "p", "message_id": "m"})).unwrap();
        part.apply_delta("Hi", Some(0));

        let metadata = MessagePart::from_payload(
            json!({"id": "p", "message_id": "m", "order": 4}),
            part.kind,
        )
        .unwrap();
        part.merge_from(metadata);
        part.apply_delta(" there", Some(1));

        assert_eq!(part.text.as_deref(), Some("Hi there"));
        assert_eq!(part.order, Some(4.0));
    }

    #[test]
    fn test_invalid_name_replaces_invalid_name() {
        let mut part = MessagePart::new("t", "m", PartKind::Tool);
        part.name = Some("add".into());

        let mut incoming = MessagePart::new("t", "m", PartKind::Tool);
        incoming.name = Some("updated".into());
        part.merge_from(incoming);
        assert_eq!(part.name.as_deref(), Some("updated"));

        let mut unnamed = MessagePart::new("u", "m", PartKind::Tool);
        unnamed.merge_name(Some("start".into()));
        assert_eq!(unnamed.name.as_deref(), Some("start"));
    }

    #[test]
    fn test_merge_keeps_stream_state_and_valid_name() {
        let mut part = MessagePart::new("t", "m", PartKind::Tool);
        part.name = Some("web_search".into());
        part.apply_delta("{\"q\":", Some(0));
        part.apply_delta("\"x\"}", Some(2));

        let mut incoming = MessagePart::new("t", "m", PartKind::Tool);
        incoming.name = Some("Updated".into());
        incoming.status = Some("pending".into());
        part.merge_from(incoming);

        assert_eq!(part.name.as_deref(), Some("web_search"));
        assert_eq!(part.status.as_deref(), Some("pending"));
        assert_eq!(part.arguments_stream.last_processed(), 0);
        assert_eq!(part.arguments_stream.pending(), 1);
        assert_eq!(part.update_revision, 2);
    }

    #[test]
    fn test_text_delta_records_chunks() {
        let mut part = MessagePart::new("p", "m", PartKind::Text);
        part.apply_delta("lo", Some(1));
        part.apply_delta("Hel", Some(0));
        part.apply_delta("Hel", Some(0));

        assert_eq!(part.text.as_deref(), Some("Hello"));
        assert_eq!(part.streaming_chunks, vec!["Hel", "lo"]);
        assert_eq!(part.update_revision, 2);
    }

    #[test]
    fn test_tool_delta_extracts_intent_once_complete() {
        let mut part = MessagePart::new("t", "m", PartKind::Tool);
        part.apply_delta("{\"__act_now\": \"Searching\"", None);
        assert!(!part.rest.contains_key("act_now"));
        part.apply_delta(", \"__use_intent\": true}", None);
        assert_eq!(part.rest["act_now"], "Searching");
        assert_eq!(part.rest["use_intent"], true);
    }

    #[test]
    fn test_complete_defaults_status_by_kind() {
        let mut thinking = MessagePart::new("a", "m", PartKind::Thinking);
        thinking.is_streaming = true;
        thinking.complete("2024-05-01T00:00:00Z");
        assert!(thinking.is_done);
        assert!(!thinking.is_streaming);
        assert_eq!(thinking.status.as_deref(), Some(status::COMPLETED));
        assert_eq!(thinking.finished_at.as_deref(), Some("2024-05-01T00:00:00Z"));

        let mut tool = MessagePart::new("b", "m", PartKind::Tool);
        tool.status = Some("pending".into());
        tool.complete("t1");
        assert_eq!(tool.status.as_deref(), Some(status::SUCCESS));

        let mut failed = MessagePart::new("c", "m", PartKind::Tool);
        failed.status = Some(status::ERROR.into());
        failed.finished_at = Some("earlier".into());
        failed.complete("t2");
        assert_eq!(failed.status.as_deref(), Some(status::ERROR));
        assert_eq!(failed.finished_at.as_deref(), Some("earlier"));

        let mut text = MessagePart::new("d", "m", PartKind::Text);
        text.complete("t3");
        assert!(text.is_done);
        assert!(text.finished_at.is_none());
    }

    #[test]
    fn test_serialized_order_is_integral() {
        let part = MessagePart::new("p", "m", PartKind::Text).with_order(2.0, Some(0.5));
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["order"], json!(2));
        assert_eq!(json["block_order"], json!(0.5));
        assert_eq!(json["type"], "text");
    }
}
