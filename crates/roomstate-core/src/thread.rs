//! Thread aggregates
//!
//! A thread carries scalar metadata owned by the server plus three
//! normalized sub-collections (`events`, `media`, `messages`). Incoming
//! payloads overwrite the metadata and fold new items into the
//! sub-collections, so a status or read-state update never discards an
//! already paginated history window.

use crate::collection::{coerce_id, paginate, NormalizedCollection, Page, PaginateOptions};
use crate::errors::{Result, StoreError};
use crate::merge::{merge_collection_slot, MergeDecision};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Normalized sub-collections of a thread.
pub const THREAD_COLLECTIONS: [&str; 3] = ["events", "media", "messages"];

/// A conversation thread with its normalized sub-collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    /// Thread identifier
    #[serde(default)]
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Creation time
    #[serde(default)]
    pub date_creation: Option<String>,
    /// Parent reference (id or embedded object)
    #[serde(default)]
    pub parent: Option<Value>,
    /// Message that started the thread
    #[serde(default)]
    pub starter_message_id: Option<String>,
    /// Server-side status
    #[serde(default)]
    pub status: Option<String>,
    /// Last read timestamp per member id, as sent by the server
    #[serde(default)]
    pub read_state: IndexMap<String, Value>,
    /// Thread events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<NormalizedCollection>,
    /// Attached media
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<NormalizedCollection>,
    /// Message history window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<NormalizedCollection>,
    /// Fields with no dedicated slot (`room_id`, `is_main`, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Scalar fields stored as strings.
const STRING_FIELDS: [&str; 4] = ["name", "date_creation", "starter_message_id", "status"];

impl Thread {
    /// Normalize a thread payload.
    ///
    /// `events`/`media`/`messages` may be page payloads, bare item arrays or
    /// already normalized collections; absent ones stay `None`. A
    /// `read_status.items` list becomes the `read_state` map.
    ///
    /// Loosely typed fields never fail the payload: numeric and boolean
    /// scalars are stringified, anything else unusable is dropped with a
    /// warning. Only a non-object payload is an error.
    pub fn from_raw(raw: Value) -> Result<Self> {
        let Value::Object(mut map) = raw else {
            return Err(StoreError::invalid("thread payload is not an object"));
        };

        match map.get("id").map(|id| (coerce_id(id), id.is_null())) {
            Some((Some(id), _)) => {
                map.insert("id".into(), Value::String(id));
            }
            Some((None, is_null)) => {
                if !is_null {
                    tracing::warn!(id = %map["id"], "ignored unusable thread id");
                }
                map.remove("id");
            }
            None => {}
        }
        for key in STRING_FIELDS {
            coerce_string_field(&mut map, key);
        }

        let mut collections: [Option<NormalizedCollection>; 3] = [None, None, None];
        for (slot, key) in collections.iter_mut().zip(THREAD_COLLECTIONS) {
            *slot = map
                .remove(key)
                .and_then(|value| normalize_collection(key, value));
        }

        let read_status = map.remove("read_status");
        match map.get("read_state") {
            Some(Value::Object(_)) => {}
            Some(other) => {
                tracing::warn!(kind = ?other, "ignored non-object read_state");
                map.remove("read_state");
            }
            None => {
                if let Some(read_state) = read_status.as_ref().map(read_state_from_status) {
                    map.insert("read_state".into(), Value::Object(read_state));
                }
            }
        }

        let mut thread: Thread = serde_json::from_value(Value::Object(map))?;
        let [events, media, messages] = collections;
        thread.events = events;
        thread.media = media;
        thread.messages = messages;
        Ok(thread)
    }
}

/// Stringify numeric and boolean scalars; drop objects and arrays.
fn coerce_string_field(map: &mut Map<String, Value>, key: &str) {
    let coerced = match map.get(key) {
        None | Some(Value::Null | Value::String(_)) => return,
        Some(Value::Number(n)) => Value::String(n.to_string()),
        Some(Value::Bool(b)) => Value::String(b.to_string()),
        Some(other) => {
            tracing::warn!(key, kind = ?other, "dropped non-scalar thread field");
            Value::Null
        }
    };
    map.insert(key.into(), coerced);
}

/// `member_id → timestamp` from `read_status.items`.
///
/// Timestamps are copied verbatim (null included). Items without a usable
/// member id are skipped.
fn read_state_from_status(read_status: &Value) -> Map<String, Value> {
    let items = read_status
        .get("items")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut read_state = Map::new();
    for item in items {
        match item.get("member_id").and_then(coerce_id) {
            Some(member) => {
                let timestamp = item.get("timestamp").cloned().unwrap_or(Value::Null);
                read_state.insert(member, timestamp);
            }
            None => tracing::warn!(?item, "skipped read status without member_id"),
        }
    }
    read_state
}

/// Normalize one sub-collection value; `None` for null or unusable values.
fn normalize_collection(key: &str, value: Value) -> Option<NormalizedCollection> {
    let normalized = value.get("byId").is_some() || value.get("allIds").is_some();
    match value {
        Value::Null => None,
        Value::Array(items) => Some(paginate(Page::from_items(items), &PaginateOptions::default())),
        Value::Object(map) if normalized => Some(normalized_collection(key, map)),
        Value::Object(map) => Some(paginate(page_from_map(map), &PaginateOptions::default())),
        other => {
            tracing::warn!(key, kind = ?other, "ignored non-collection value");
            None
        }
    }
}

/// Read an already normalized collection, stringifying numeric ids.
///
/// A missing or non-array `allIds` is rebuilt from the `byId` keys. Falls
/// back to re-paginating the `byId` entities when the value still does not
/// fit the collection shape.
fn normalized_collection(key: &str, mut map: Map<String, Value>) -> NormalizedCollection {
    if !map.get("byId").is_some_and(Value::is_object) {
        map.insert("byId".into(), Value::Object(Map::new()));
    }
    let all_ids: Vec<Value> = match (map.remove("allIds"), map.get("byId")) {
        (Some(Value::Array(ids)), _) => ids
            .iter()
            .filter_map(coerce_id)
            .map(Value::String)
            .collect(),
        (_, Some(Value::Object(by_id))) => by_id.keys().cloned().map(Value::String).collect(),
        _ => Vec::new(),
    };
    map.insert("allIds".into(), Value::Array(all_ids));
    if let Some(Value::Object(names)) = map.remove("byName") {
        let names: Map<String, Value> = names
            .into_iter()
            .filter_map(|(slug, id)| coerce_id(&id).map(|id| (slug, Value::String(id))))
            .collect();
        map.insert("byName".into(), Value::Object(names));
    }
    if let Some(Value::Object(mut info)) = map.remove("paginationInfo") {
        if !info.get("hasNextPage").is_some_and(Value::is_boolean) {
            info.remove("hasNextPage");
        }
        match info.get("cursor").and_then(coerce_id) {
            Some(cursor) => info.insert("cursor".into(), Value::String(cursor)),
            None => info.remove("cursor"),
        };
        map.insert("paginationInfo".into(), Value::Object(info));
    }

    let by_id = map.get("byId").cloned();
    match serde_json::from_value(Value::Object(map)) {
        Ok(collection) => collection,
        Err(err) => {
            tracing::warn!(key, %err, "re-paginating malformed normalized collection");
            let items = match by_id {
                Some(Value::Object(entities)) => entities.into_iter().map(|(_, e)| e).collect(),
                _ => Vec::new(),
            };
            paginate(Page::from_items(items), &PaginateOptions::default())
        }
    }
}

/// Read a page payload, ignoring cursor fields of the wrong type.
fn page_from_map(mut map: Map<String, Value>) -> Page {
    let items = match map.remove("items") {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };
    Page {
        items,
        has_next_page: map.get("has_next_page").and_then(Value::as_bool),
        next_cursor: map.get("next_cursor").and_then(coerce_id),
    }
}

/// Per-collection decisions taken by [`merge_threads`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadMergeOutcome {
    /// Decision for `events`
    pub events: MergeDecision,
    /// Decision for `media`
    pub media: MergeDecision,
    /// Decision for `messages`
    pub messages: MergeDecision,
}

/// Reconcile `previous` with an incoming payload for the same thread.
///
/// `name`, `date_creation`, `parent`, `starter_message_id`, `status` and
/// `read_state` are overwritten unconditionally. The sub-collections go
/// through the collection merge-or-replace policy, and extra fields are
/// overwritten key by key.
pub fn merge_threads(previous: &mut Thread, incoming: Thread) -> ThreadMergeOutcome {
    let Thread {
        id,
        name,
        date_creation,
        parent,
        starter_message_id,
        status,
        read_state,
        events,
        media,
        messages,
        extra,
    } = incoming;

    if previous.id.is_empty() {
        previous.id = id;
    }
    previous.name = name;
    previous.date_creation = date_creation;
    previous.parent = parent;
    previous.starter_message_id = starter_message_id;
    previous.status = status;
    previous.read_state = read_state;
    previous.extra.extend(extra);

    let outcome = ThreadMergeOutcome {
        events: merge_collection_slot(&mut previous.events, events),
        media: merge_collection_slot(&mut previous.media, media),
        messages: merge_collection_slot(&mut previous.messages, messages),
    };
    tracing::debug!(
        thread = %previous.id,
        events = outcome.events.label(),
        media = outcome.media.label(),
        messages = outcome.messages.label(),
        "merged thread"
    );
    outcome
}
