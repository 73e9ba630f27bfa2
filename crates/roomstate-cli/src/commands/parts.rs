//! `roomstate sort-parts`

use anyhow::{bail, Result};
use roomstate_core::MessagePartsState;
use serde_json::{Map, Value};
use std::path::Path;

/// Raw part payloads from a part array, a `messageParts` state, or a room
/// state carrying `messageParts`.
fn raw_parts(input: Value) -> Result<Vec<Value>> {
    match input {
        Value::Array(parts) => Ok(parts),
        Value::Object(mut map) => {
            if let Some(Value::Object(inner)) = map.remove("messageParts") {
                map = inner;
            }
            match map.remove("byId") {
                Some(Value::Object(by_id)) => Ok(by_id.into_iter().map(|(_, part)| part).collect()),
                _ => bail!("Expected a messageParts state with a byId object"),
            }
        }
        other => bail!("Expected a part array or a messageParts state, got {other}"),
    }
}

/// Rebuild the part store and print ordered part ids per message.
pub fn run(path: &Path, message: Option<&str>) -> Result<String> {
    let parts = raw_parts(crate::read_json(path)?)?;
    let total = parts.len();

    let mut store = MessagePartsState::new();
    let accepted = store.upsert_parts(parts);
    if accepted < total {
        tracing::warn!(rejected = total - accepted, "some parts were rejected");
    }

    let ordered: Map<String, Value> = match message {
        Some(id) => std::iter::once((id.to_string(), store.part_ids_for_message(id).into())).collect(),
        None => store
            .by_message_id
            .iter()
            .map(|(id, ids)| (id.clone(), ids.iter().map(String::as_str).collect()))
            .collect(),
    };
    crate::to_pretty(&ordered)
}
