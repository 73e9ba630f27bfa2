//! `roomstate merge`, `merge-collection` and `merge-thread`

use anyhow::{bail, Result};
use roomstate_core::{
    deep_merge, merge_collection_property, merge_thread_sequenced, merge_threads, ArrayPolicy,
    StoreConfig, Thread,
};
use serde_json::{json, Map, Value};
use std::path::Path;

/// Deep-merge `source` into `target`.
///
/// `arrays` overrides `merge.array_policy` from the configuration.
pub fn run(
    target: &Path,
    source: &Path,
    arrays: Option<ArrayPolicy>,
    config: &StoreConfig,
) -> Result<String> {
    let policy = arrays.unwrap_or(config.merge.array_policy);
    let mut merged = crate::read_json(target)?;
    let source = crate::read_json(source)?;

    deep_merge(&mut merged, &source, policy);
    tracing::info!(%policy, "deep merge applied");
    crate::to_pretty(&merged)
}

fn read_object(path: &Path) -> Result<Map<String, Value>> {
    match crate::read_json(path)? {
        Value::Object(map) => Ok(map),
        other => bail!("{} must hold a JSON object, got {other}", path.display()),
    }
}

/// Merge-or-replace one collection-valued property of two state objects.
pub fn run_collection(previous: &Path, current: &Path, property: &str) -> Result<String> {
    let mut state = read_object(previous)?;
    let current = read_object(current)?;

    let decision = merge_collection_property(&mut state, &current, property);
    crate::to_pretty(&json!({
        "decision": decision.label(),
        "state": state,
    }))
}

/// Merge an incoming thread payload into a previous one.
///
/// With `sequence` (previous, incoming) and `staleness.enabled`, an incoming
/// payload older than the previous one is ignored.
pub fn run_thread(
    previous: &Path,
    incoming: &Path,
    sequence: Option<(u64, u64)>,
    config: &StoreConfig,
) -> Result<String> {
    let mut thread = Thread::from_raw(crate::read_json(previous)?)?;
    let incoming = Thread::from_raw(crate::read_json(incoming)?)?;

    let outcome = match sequence {
        Some((applied, next)) => {
            let mut guard = config.sequence_guard();
            guard.admit(&thread.id, applied);
            merge_thread_sequenced(&mut guard, &mut thread, incoming, next)
        }
        None => Some(merge_threads(&mut thread, incoming)),
    };

    let outcome = outcome.map(|outcome| {
        json!({
            "events": outcome.events.label(),
            "media": outcome.media.label(),
            "messages": outcome.messages.label(),
        })
    });
    crate::to_pretty(&json!({
        "stale": outcome.is_none(),
        "outcome": outcome,
        "thread": thread,
    }))
}
