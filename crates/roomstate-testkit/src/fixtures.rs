//! JSON fixtures for room state, threads, pages and parts

use roomstate_core::parts::{MessagePart, PartKind};
use serde_json::{json, Value};

/// Empty `{byId, allIds}` collection.
pub fn empty_collection() -> Value {
    json!({"byId": {}, "allIds": []})
}

/// Collection holding `{id}` entities for `ids`, in order.
pub fn collection_of(ids: &[&str]) -> Value {
    let by_id: serde_json::Map<String, Value> = ids
        .iter()
        .map(|id| ((*id).to_string(), json!({"id": id})))
        .collect();
    json!({"byId": by_id, "allIds": ids})
}

/// REST page payload with `{id}` items.
pub fn page_of(ids: &[&str], has_next_page: Option<bool>, next_cursor: Option<&str>) -> Value {
    let items: Vec<Value> = ids.iter().map(|id| json!({"id": id})).collect();
    json!({"items": items, "has_next_page": has_next_page, "next_cursor": next_cursor})
}

/// Raw thread payload with a message page.
pub fn thread_payload(id: &str, message_ids: &[&str]) -> Value {
    json!({
        "id": id,
        "name": format!("thread {id}"),
        "status": "running",
        "room_id": "room-1",
        "messages": page_of(message_ids, Some(false), None),
        "read_status": {"items": [{"member_id": "member-1", "timestamp": "2024-03-01T10:00:00Z"}]}
    })
}

/// Room state that passes the default shape validator without warnings.
pub fn well_formed_room_state() -> Value {
    let flags = json!({"room": true, "mainThread": true, "allThreads": false, "userRooms": true});
    json!({
        "room": {"id": "room-1", "name": "General"},
        "userRooms": [],
        "userRoomsPagination": {},
        "searchRooms": {},
        "account": null,
        "roomContext": null,
        "authorization_requests": [],
        "messages": collection_of(&["m1"]),
        "messagesContent": {},
        "messagesExecutions": {},
        "executions": empty_collection(),
        "messageParts": {"byId": {}, "allIds": [], "byMessageId": {}},
        "threads": collection_of(&["t1"]),
        "mainThread": "t1",
        "thread": {"drawer": {}, "main": {}, "respond": {}},
        "temporaryThread": null,
        "members": empty_collection(),
        "me": null,
        "tabs": empty_collection(),
        "voiceConversations": {},
        "activationLifecycles": {},
        "responseLifecycles": {},
        "runningResponses": {},
        "drawerOpen": false,
        "isRealtimeCall": false,
        "contextMenu": null,
        "uploadProgress": null,
        "isUploading": false,
        "initialized": flags.clone(),
        "loading": flags
    })
}

/// Text part with the given ordering keys.
pub fn text_part(id: &str, message_id: &str, order: Option<f64>, block_order: Option<f64>) -> MessagePart {
    let mut part = MessagePart::new(id, message_id, PartKind::Text);
    part.set_order(order, block_order);
    part
}
