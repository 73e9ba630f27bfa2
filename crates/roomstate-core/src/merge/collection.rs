//! Merge-or-replace policy for normalized sub-collections
//!
//! An incoming collection is folded into the previous one only when data is
//! already loaded and the incoming side is populated (non-empty `allIds`
//! and `byId`). Otherwise the incoming value replaces the previous one:
//! that is a first hydration or a full reload. An absent incoming value
//! leaves the previous one untouched.

use super::arrays::union_ids_into;
use crate::collection::NormalizedCollection;
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Outcome of a collection merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergeDecision {
    /// Incoming value absent; previous kept as is
    Skip,
    /// Ids unioned and entities overwritten by id
    Merge,
    /// Previous value replaced wholesale
    Replace,
}

impl MergeDecision {
    /// Decide how to combine a previous and an incoming collection.
    #[must_use]
    pub fn decide(previous_present: bool, incoming: Option<IncomingShape>) -> Self {
        match incoming {
            None => Self::Skip,
            Some(shape) if previous_present && shape.is_populated() => Self::Merge,
            Some(_) => Self::Replace,
        }
    }

    /// Lowercase label for logging.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Merge => "merge",
            Self::Replace => "replace",
        }
    }
}

/// Sizes of the incoming collection that drive [`MergeDecision::decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncomingShape {
    /// Number of ids in `allIds`
    pub all_ids: usize,
    /// Number of entries in `byId`
    pub by_id: usize,
}

impl IncomingShape {
    fn is_populated(&self) -> bool {
        self.all_ids > 0 && self.by_id > 0
    }
}

impl<E> NormalizedCollection<E> {
    /// Fold `incoming` into this collection.
    ///
    /// Ids are unioned (existing order first) and same-id entities are
    /// replaced wholesale. Slugs are added, and incoming pagination info
    /// supersedes the stored cursor.
    pub fn absorb(&mut self, incoming: NormalizedCollection<E>) {
        let NormalizedCollection {
            by_id,
            all_ids,
            by_name,
            pagination_info,
        } = incoming;

        union_ids_into(&mut self.all_ids, &all_ids);
        self.by_id.extend(by_id);
        if let Some(names) = by_name {
            self.by_name.get_or_insert_with(IndexMap::new).extend(names);
        }
        if pagination_info.is_some() {
            self.pagination_info = pagination_info;
        }
    }

    fn shape(&self) -> IncomingShape {
        IncomingShape {
            all_ids: self.all_ids.len(),
            by_id: self.by_id.len(),
        }
    }
}

/// Reconcile a typed collection slot (e.g. a thread's `messages`).
pub fn merge_collection_slot<E>(
    previous: &mut Option<NormalizedCollection<E>>,
    current: Option<NormalizedCollection<E>>,
) -> MergeDecision {
    let decision = MergeDecision::decide(
        previous.is_some(),
        current.as_ref().map(NormalizedCollection::shape),
    );

    match (decision, current) {
        (MergeDecision::Merge, Some(current)) => match previous.as_mut() {
            Some(prev) => prev.absorb(current),
            None => *previous = Some(current),
        },
        (MergeDecision::Replace, Some(current)) => *previous = Some(current),
        _ => {}
    }

    decision
}

/// Reconcile the normalized sub-collection `property` of two JSON aggregates.
///
/// `previous` is updated in place. Null, `false`, `0` and `""` count as
/// absent values, matching the loose payloads the client receives.
pub fn merge_collection_property(
    previous: &mut Map<String, Value>,
    current: &Map<String, Value>,
    property: &str,
) -> MergeDecision {
    let incoming = current.get(property).filter(|value| is_present(value));
    let previous_present = previous.get(property).is_some_and(is_present);
    let mut decision = MergeDecision::decide(previous_present, incoming.map(json_shape));

    if decision == MergeDecision::Merge {
        let merged = match (previous.get_mut(property), incoming) {
            (Some(Value::Object(prev)), Some(Value::Object(cur))) => {
                absorb_json(prev, cur);
                true
            }
            _ => false,
        };
        if !merged {
            decision = MergeDecision::Replace;
        }
    }

    if decision == MergeDecision::Replace {
        if let Some(incoming) = incoming {
            previous.insert(property.to_string(), incoming.clone());
        }
    }

    tracing::debug!(property, decision = decision.label(), "collection merge");
    decision
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn json_shape(value: &Value) -> IncomingShape {
    IncomingShape {
        all_ids: value
            .get("allIds")
            .and_then(Value::as_array)
            .map_or(0, Vec::len),
        by_id: value
            .get("byId")
            .and_then(Value::as_object)
            .map_or(0, Map::len),
    }
}

fn absorb_json(prev: &mut Map<String, Value>, cur: &Map<String, Value>) {
    let incoming_ids = cur
        .get("allIds")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let existing_ids = prev
        .get("allIds")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut ids: IndexMap<String, Value> = IndexMap::new();
    for id in existing_ids.iter().chain(incoming_ids) {
        ids.entry(id.to_string()).or_insert_with(|| id.clone());
    }
    prev.insert(
        "allIds".to_string(),
        Value::Array(ids.into_values().collect()),
    );

    let incoming_by_id = cur.get("byId").and_then(Value::as_object);
    match (prev.get_mut("byId"), incoming_by_id) {
        (Some(Value::Object(by_id)), Some(incoming)) => {
            for (id, entity) in incoming {
                by_id.insert(id.clone(), entity.clone());
            }
        }
        (_, Some(incoming)) => {
            prev.insert("byId".to_string(), Value::Object(incoming.clone()));
        }
        (_, None) => {}
    }
}
