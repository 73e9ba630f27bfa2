//! # Normalized Collections
//!
//! Every list the room client keeps (threads, messages, members, tabs,
//! executions, ...) is stored as a normalized collection:
//!
//! ```text
//! { byId: { id → entity }, allIds: [id, ...], byName?: { slug → id }, paginationInfo? }
//! ```
//!
//! `byId` gives O(1) lookup, `allIds` carries the server-determined order.
//! [`paginate`] builds a collection from a REST page payload
//! (`{items, has_next_page, next_cursor}`) without re-sorting it.
//!
//! ## Invariants
//!
//! - every id in `allIds` has an entry in `byId`
//! - no id appears twice in `allIds`
//! - `byId[id]` carries `id` as its own identifier
//! - `byName` slugs are unique (guaranteed by the map) and point at known ids
//!
//! [`NormalizedCollection::check_invariants`] reports every violation.

use crate::slug::{SlugIndex, DEFAULT_DISAMBIGUATOR_LEN};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

/// Field written back onto an entity with its assigned slug.
pub const SLUG_FIELD: &str = "_byName";

// ============================================================================
// Entity
// ============================================================================

/// Anything that can live in a normalized collection.
pub trait Entity {
    /// Identifier of the entity, if it has a usable one.
    fn entity_id(&self) -> Option<String>;

    /// Display name used for slug derivation.
    fn display_name(&self) -> Option<&str> {
        None
    }

    /// Record the slug assigned to this entity.
    fn set_slug(&mut self, _slug: &str) {}
}

/// Read a JSON id: non-empty strings as is, numbers stringified.
pub fn coerce_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl Entity for Value {
    fn entity_id(&self) -> Option<String> {
        self.get("id").and_then(coerce_id)
    }

    fn display_name(&self) -> Option<&str> {
        self.get("name").and_then(Value::as_str)
    }

    fn set_slug(&mut self, slug: &str) {
        if let Some(obj) = self.as_object_mut() {
            obj.insert(SLUG_FIELD.to_string(), Value::String(slug.to_string()));
        }
    }
}

// ============================================================================
// Pagination
// ============================================================================

/// Cursor metadata attached to a collection built from a page payload.
///
/// Only present when the payload carried at least one non-null cursor field.
/// Absence means "unknown", not "no next page".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationInfo {
    /// Whether the server reported more items after this page
    #[serde(rename = "hasNextPage", default)]
    pub has_next_page: Option<bool>,
    /// Opaque cursor for the next page request
    #[serde(default)]
    pub cursor: Option<String>,
}

/// REST-shaped list payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<E = Value> {
    /// Entities in server order
    #[serde(default = "Vec::new")]
    pub items: Vec<E>,
    /// More items available after this page
    #[serde(default)]
    pub has_next_page: Option<bool>,
    /// Cursor for the next page
    #[serde(default)]
    pub next_cursor: Option<String>,
}

impl<E> Default for Page<E> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            has_next_page: None,
            next_cursor: None,
        }
    }
}

impl<E> Page<E> {
    /// Page carrying only items (no cursor fields).
    pub fn from_items(items: Vec<E>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }
}

/// Options for [`paginate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginateOptions {
    /// Build a `byName` slug index
    pub by_name: bool,
    /// Id characters appended to a colliding slug
    pub disambiguator_len: usize,
}

impl Default for PaginateOptions {
    fn default() -> Self {
        Self {
            by_name: false,
            disambiguator_len: DEFAULT_DISAMBIGUATOR_LEN,
        }
    }
}

impl PaginateOptions {
    /// Options with slug indexing enabled.
    pub fn by_name() -> Self {
        Self {
            by_name: true,
            ..Self::default()
        }
    }
}

/// Normalize a page payload into a collection, preserving server order.
///
/// Items without a usable id are skipped. When an id repeats, the entity
/// keeps its first position and takes the last payload.
pub fn paginate<E: Entity>(page: Page<E>, options: &PaginateOptions) -> NormalizedCollection<E> {
    let Page {
        items,
        has_next_page,
        next_cursor,
    } = page;

    let mut collection = NormalizedCollection::with_capacity(items.len());
    let mut skipped = 0usize;
    for item in items {
        match item.entity_id() {
            Some(id) => {
                collection.upsert(id, item);
            }
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::warn!(skipped, "dropped page items without an id");
    }

    if options.by_name {
        let mut index = SlugIndex::with_disambiguator_len(options.disambiguator_len);
        for id in &collection.all_ids {
            let Some(entity) = collection.by_id.get_mut(id) else {
                continue;
            };
            let Some(name) = entity.display_name().map(str::to_owned) else {
                continue;
            };
            let slug = index.assign(id, &name);
            entity.set_slug(&slug);
        }
        collection.by_name = Some(index.into_map());
    }

    if has_next_page.is_some() || next_cursor.is_some() {
        collection.pagination_info = Some(PaginationInfo {
            has_next_page,
            cursor: next_cursor,
        });
    }

    collection
}

/// [`paginate`] over an optional payload; `None` yields an empty collection.
pub fn paginate_opt<E: Entity>(
    page: Option<Page<E>>,
    options: &PaginateOptions,
) -> NormalizedCollection<E> {
    page.map(|page| paginate(page, options)).unwrap_or_default()
}

// ============================================================================
// Normalized Collection
// ============================================================================

/// A list stored as `{byId, allIds[, byName][, paginationInfo]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedCollection<E = Value> {
    /// Entities keyed by id
    #[serde(rename = "byId", default = "IndexMap::new")]
    pub by_id: IndexMap<String, E>,
    /// Ids in display order
    #[serde(rename = "allIds", default)]
    pub all_ids: Vec<String>,
    /// Slug → id index, when slugs were requested
    #[serde(rename = "byName", default, skip_serializing_if = "Option::is_none")]
    pub by_name: Option<IndexMap<String, String>>,
    /// Cursor metadata from the page this collection was built from
    #[serde(
        rename = "paginationInfo",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub pagination_info: Option<PaginationInfo>,
}

impl<E> Default for NormalizedCollection<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> NormalizedCollection<E> {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty collection with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            by_id: IndexMap::with_capacity(capacity),
            all_ids: Vec::with_capacity(capacity),
            by_name: None,
            pagination_info: None,
        }
    }

    // ─── Queries ─────────────────────────────────────────────

    /// Get an entity by id.
    pub fn get(&self, id: &str) -> Option<&E> {
        self.by_id.get(id)
    }

    /// Get a mutable reference to an entity by id.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut E> {
        self.by_id.get_mut(id)
    }

    /// Check if an entity exists.
    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Resolve a slug to its id.
    pub fn id_by_name(&self, slug: &str) -> Option<&str> {
        self.by_name
            .as_ref()
            .and_then(|names| names.get(slug))
            .map(String::as_str)
    }

    /// Number of ids in display order.
    pub fn len(&self) -> usize {
        self.all_ids.len()
    }

    /// Whether the collection has no ids.
    pub fn is_empty(&self) -> bool {
        self.all_ids.is_empty()
    }

    /// Whether both `allIds` and `byId` carry entries.
    ///
    /// Sparse collections (either side empty) are treated as full reloads
    /// by the collection merger.
    pub fn is_populated(&self) -> bool {
        !self.all_ids.is_empty() && !self.by_id.is_empty()
    }

    /// Entities in `allIds` order, skipping ids without an entry.
    pub fn ordered(&self) -> impl Iterator<Item = (&str, &E)> {
        self.all_ids
            .iter()
            .filter_map(|id| self.by_id.get(id).map(|entity| (id.as_str(), entity)))
    }

    // ─── Mutations ───────────────────────────────────────────

    /// Insert or replace an entity, keeping its position if it exists.
    ///
    /// Returns the previous entity, if any.
    pub fn upsert(&mut self, id: String, entity: E) -> Option<E> {
        if let Some(slot) = self.by_id.get_mut(&id) {
            return Some(std::mem::replace(slot, entity));
        }
        if !self.all_ids.contains(&id) {
            self.all_ids.push(id.clone());
        }
        self.by_id.insert(id, entity);
        None
    }
}

impl<E: Entity> NormalizedCollection<E> {
    /// Check every structural invariant, returning all violations.
    pub fn check_invariants(&self) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();
        let mut seen = HashSet::with_capacity(self.all_ids.len());

        for id in &self.all_ids {
            if !seen.insert(id.as_str()) {
                violations.push(InvariantViolation::DuplicateId { id: id.clone() });
            }
            if !self.by_id.contains_key(id) {
                violations.push(InvariantViolation::MissingEntity { id: id.clone() });
            }
        }

        for (key, entity) in &self.by_id {
            match entity.entity_id() {
                Some(actual) if actual == *key => {}
                actual => violations.push(InvariantViolation::IdMismatch {
                    key: key.clone(),
                    actual,
                }),
            }
        }

        if let Some(names) = &self.by_name {
            for (slug, id) in names {
                if !self.by_id.contains_key(id) {
                    violations.push(InvariantViolation::DanglingSlug {
                        slug: slug.clone(),
                        id: id.clone(),
                    });
                }
            }
        }

        violations
    }
}

impl<E: Entity> FromIterator<E> for NormalizedCollection<E> {
    fn from_iter<T: IntoIterator<Item = E>>(iter: T) -> Self {
        let items: Vec<E> = iter.into_iter().collect();
        paginate(Page::from_items(items), &PaginateOptions::default())
    }
}

/// A broken collection invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// An id in `allIds` has no `byId` entry
    MissingEntity {
        /// The dangling id
        id: String,
    },
    /// An id appears more than once in `allIds`
    DuplicateId {
        /// The repeated id
        id: String,
    },
    /// `byId[key]` carries a different (or no) id
    IdMismatch {
        /// Map key
        key: String,
        /// Id found on the entity
        actual: Option<String>,
    },
    /// A slug points at an id with no entity
    DanglingSlug {
        /// The slug
        slug: String,
        /// The id it points at
        id: String,
    },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingEntity { id } => write!(f, "allIds contains '{id}' with no byId entry"),
            Self::DuplicateId { id } => write!(f, "allIds contains '{id}' more than once"),
            Self::IdMismatch { key, actual } => match actual {
                Some(actual) => write!(f, "byId['{key}'] has id '{actual}'"),
                None => write!(f, "byId['{key}'] has no id"),
            },
            Self::DanglingSlug { slug, id } => {
                write!(f, "byName['{slug}'] points at unknown id '{id}'")
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(value: Value) -> Page {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_paginate_preserves_order_without_pagination_info() {
        let collection = paginate(
            page(json!({"items": [{"id": "a"}, {"id": "b"}]})),
            &PaginateOptions::default(),
        );

        assert_eq!(collection.all_ids, vec!["a", "b"]);
        assert_eq!(collection.get("a"), Some(&json!({"id": "a"})));
        assert_eq!(collection.get("b"), Some(&json!({"id": "b"})));
        assert!(collection.pagination_info.is_none());
        assert!(collection.by_name.is_none());

        let serialized = serde_json::to_value(&collection).unwrap();
        assert_eq!(
            serialized,
            json!({"byId": {"a": {"id": "a"}, "b": {"id": "b"}}, "allIds": ["a", "b"]})
        );
    }

    #[test]
    fn test_paginate_does_not_resort() {
        let collection = paginate(
            page(json!({"items": [{"id": "z"}, {"id": "a"}, {"id": "m"}]})),
            &PaginateOptions::default(),
        );
        assert_eq!(collection.all_ids, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_paginate_attaches_pagination_only_when_present() {
        let with_cursor = paginate(
            page(json!({"items": [], "has_next_page": null, "next_cursor": "c1"})),
            &PaginateOptions::default(),
        );
        assert_eq!(
            with_cursor.pagination_info,
            Some(PaginationInfo {
                has_next_page: None,
                cursor: Some("c1".to_string()),
            })
        );

        let explicit_false = paginate(
            page(json!({"items": [], "has_next_page": false})),
            &PaginateOptions::default(),
        );
        assert_eq!(
            explicit_false.pagination_info,
            Some(PaginationInfo {
                has_next_page: Some(false),
                cursor: None,
            })
        );

        let both_null = paginate(
            page(json!({"items": [], "has_next_page": null, "next_cursor": null})),
            &PaginateOptions::default(),
        );
        assert!(both_null.pagination_info.is_none());
    }

    #[test]
    fn test_paginate_slug_collision() {
        let collection = paginate(
            page(json!({"items": [
                {"id": "11111", "name": "Foo"},
                {"id": "22222", "name": "Foo"}
            ]})),
            &PaginateOptions::by_name(),
        );

        assert_eq!(collection.get("11111").unwrap()[SLUG_FIELD], "foo");
        assert_eq!(collection.get("22222").unwrap()[SLUG_FIELD], "foo-22222");
        assert_eq!(collection.id_by_name("foo"), Some("11111"));
        assert_eq!(collection.id_by_name("foo-22222"), Some("22222"));
        assert!(collection.check_invariants().is_empty());
    }

    #[test]
    fn test_paginate_skips_items_without_id() {
        let collection = paginate(
            page(json!({"items": [{"name": "no id"}, {"id": ""}, {"id": 7}]})),
            &PaginateOptions::default(),
        );
        assert_eq!(collection.all_ids, vec!["7"]);
    }

    #[test]
    fn test_paginate_duplicate_ids_keep_first_position_last_payload() {
        let collection = paginate(
            page(json!({"items": [
                {"id": "a", "v": 1},
                {"id": "b"},
                {"id": "a", "v": 2}
            ]})),
            &PaginateOptions::default(),
        );
        assert_eq!(collection.all_ids, vec!["a", "b"]);
        assert_eq!(collection.get("a").unwrap()["v"], 2);
    }

    #[test]
    fn test_paginate_opt_none_is_empty() {
        let collection: NormalizedCollection = paginate_opt(None, &PaginateOptions::default());
        assert!(collection.is_empty());
        assert!(collection.by_id.is_empty());
        assert!(collection.pagination_info.is_none());
    }

    #[test]
    fn test_check_invariants_reports_violations() {
        let mut collection: NormalizedCollection = NormalizedCollection::new();
        collection.upsert("a".to_string(), json!({"id": "a"}));
        collection.all_ids.push("a".to_string());
        collection.all_ids.push("ghost".to_string());
        collection
            .by_id
            .insert("b".to_string(), json!({"id": "not-b"}));

        let violations = collection.check_invariants();
        assert!(violations.contains(&InvariantViolation::DuplicateId { id: "a".into() }));
        assert!(violations.contains(&InvariantViolation::MissingEntity { id: "ghost".into() }));
        assert!(violations.contains(&InvariantViolation::IdMismatch {
            key: "b".into(),
            actual: Some("not-b".into()),
        }));
    }

    #[test]
    fn test_ordered_follows_all_ids() {
        let collection: NormalizedCollection =
            vec![json!({"id": "x"}), json!({"id": "y"})].into_iter().collect();
        let ids: Vec<&str> = collection.ordered().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["x", "y"]);
    }

    #[test]
    fn test_deserialize_tolerates_missing_fields() {
        let collection: NormalizedCollection = serde_json::from_value(json!({})).unwrap();
        assert!(collection.is_empty());
        assert!(!collection.is_populated());
    }
}
