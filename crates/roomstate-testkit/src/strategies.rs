//! Property test strategies for roomstate types
//!
//! Ids are drawn from a small alphabet so that generated collections and
//! part maps collide often, which is where merge and ordering bugs live.

use indexmap::IndexMap;
use proptest::prelude::*;
use roomstate_core::parts::{MessagePart, PartKind};
use roomstate_core::NormalizedCollection;
use serde_json::{json, Map, Value};

// Re-export proptest for convenience
pub use proptest;

/// Short ids with frequent collisions.
pub fn arb_id() -> impl Strategy<Value = String> {
    "[a-f][0-9]?"
}

/// Optional ordering key, occasionally non-finite.
pub fn arb_order_key() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        3 => (0u8..5).prop_map(|n| Some(f64::from(n))),
        1 => Just(None),
        1 => Just(Some(f64::NAN)),
        1 => Just(Some(f64::INFINITY)),
    ]
}

/// Optional creation timestamp, sometimes unparsable.
pub fn arb_created_at() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        (1u32..28).prop_map(|day| Some(format!("2024-01-{day:02}T00:00:00Z"))),
        Just(Some("not a date".to_string())),
        Just(None),
    ]
}

/// A text part with arbitrary ordering keys.
pub fn arb_part() -> impl Strategy<Value = MessagePart> {
    (arb_id(), arb_order_key(), arb_order_key(), arb_created_at()).prop_map(
        |(id, order, block_order, created_at)| {
            let mut part = MessagePart::new(id, "m", PartKind::Text);
            // bypass set_order so non-finite keys reach the comparator
            part.order = order;
            part.block_order = block_order;
            part.created_at = created_at;
            part
        },
    )
}

/// Parts keyed by id.
pub fn arb_part_map() -> impl Strategy<Value = IndexMap<String, MessagePart>> {
    prop::collection::vec(arb_part(), 0..12)
        .prop_map(|parts| parts.into_iter().map(|p| (p.id.clone(), p)).collect())
}

/// Small JSON entity carrying `id`.
pub fn arb_entity() -> impl Strategy<Value = Value> {
    (arb_id(), any::<u8>(), prop::option::of("[a-z ]{0,8}"))
        .prop_map(|(id, version, name)| match name {
            Some(name) => json!({"id": id, "v": version, "name": name}),
            None => json!({"id": id, "v": version}),
        })
}

/// Page items, duplicates and all.
pub fn arb_items() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec(arb_entity(), 0..10)
}

/// Normalized collection built from arbitrary items.
pub fn arb_collection() -> impl Strategy<Value = NormalizedCollection> {
    arb_items().prop_map(|items| items.into_iter().collect())
}

/// Arbitrary JSON value of bounded depth.
pub fn arb_json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        "[a-z]{0,4}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-d]", inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

/// Nested JSON object of bounded depth.
pub fn arb_json_object() -> impl Strategy<Value = Value> {
    prop::collection::btree_map("[a-d]", arb_json_value(), 0..4)
        .prop_map(|map| Value::Object(map.into_iter().collect()))
}

/// Id-like value as servers send them: strings, numbers, or junk.
fn arb_loose_id() -> impl Strategy<Value = Value> {
    prop_oneof![
        3 => arb_id().prop_map(Value::String),
        2 => any::<u16>().prop_map(|n| json!(n)),
        1 => arb_json_value(),
    ]
}

/// Sub-collection payload: page, bare array, normalized shape, or junk.
fn arb_thread_collection() -> impl Strategy<Value = Value> {
    prop_oneof![
        arb_items().prop_map(Value::Array),
        (arb_items(), prop::option::of(any::<bool>()), arb_json_value()).prop_map(
            |(items, has_next_page, next_cursor)| {
                json!({"items": items, "has_next_page": has_next_page, "next_cursor": next_cursor})
            }
        ),
        (
            prop::collection::vec(arb_loose_id(), 0..4),
            prop::collection::btree_map(arb_id(), arb_entity(), 0..4),
            arb_json_value(),
        )
            .prop_map(|(all_ids, by_id, pagination_info)| {
                json!({"byId": by_id, "allIds": all_ids, "paginationInfo": pagination_info})
            }),
        arb_json_value(),
    ]
}

/// Loosely typed thread payload.
///
/// Every known thread field is either absent, well-formed, or an
/// arbitrary JSON value.
pub fn arb_thread_payload() -> impl Strategy<Value = Value> {
    let read_item = (arb_loose_id(), arb_json_value())
        .prop_map(|(member_id, timestamp)| json!({"member_id": member_id, "timestamp": timestamp}));
    let read_status = prop_oneof![
        prop::collection::vec(read_item, 0..4).prop_map(|items| json!({"items": items})),
        arb_json_value(),
    ];
    let scalar = prop_oneof![
        "[a-z]{1,6}".prop_map(Value::String),
        arb_json_value(),
    ];

    (
        prop::option::of(arb_loose_id()),
        prop::collection::vec(prop::option::of(scalar), 4),
        prop::option::of(read_status),
        prop::option::of(arb_json_value()),
        prop::collection::vec(prop::option::of(arb_thread_collection()), 3),
        prop::collection::btree_map("[a-d]", arb_json_value(), 0..4),
    )
        .prop_map(|(id, scalars, read_status, read_state, collections, extra)| {
            let mut map: Map<String, Value> = extra.into_iter().collect();
            let fields = ["name", "date_creation", "starter_message_id", "status"];
            let named = fields.into_iter().zip(scalars);
            let subs = ["events", "media", "messages"].into_iter().zip(collections);
            for (key, value) in named.chain(subs) {
                if let Some(value) = value {
                    map.insert(key.into(), value);
                }
            }
            for (key, value) in [("id", id), ("read_status", read_status), ("read_state", read_state)] {
                if let Some(value) = value {
                    map.insert(key.into(), value);
                }
            }
            Value::Object(map)
        })
}
