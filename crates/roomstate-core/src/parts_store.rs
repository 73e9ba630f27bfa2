//! # Message Parts Store
//!
//! Normalized storage for every message part in a room:
//!
//! ```text
//! { byId: { partId → part }, allIds: [partId, ...], byMessageId: { messageId → [partId, ...] } }
//! ```
//!
//! Each `byMessageId` list is kept sorted with [`compare_parts`], so a
//! message renders its parts by walking its list. Upserts merge into
//! existing parts instead of replacing them, keeping stream cursors and
//! streamed content alive while REST payloads and deltas interleave. Kind
//! defaults are only filled on first insert.
//!
//! Parts are never removed here; deleting a message's parts is done by the
//! host outside this store.
//!
//! [`compare_parts`]: crate::ordering::compare_parts

use crate::collection::coerce_id;
use crate::ordering::compare_parts;
use crate::parts::{MessagePart, PartRejection, PartUpdate};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What an upsert did with a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartChange {
    /// First time this id was seen
    Inserted,
    /// Merged into an existing part
    Updated,
}

/// Normalized message part storage with a per-message ordered index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessagePartsState {
    /// Parts keyed by id
    #[serde(rename = "byId", default)]
    pub by_id: IndexMap<String, MessagePart>,
    /// Part ids in insertion order
    #[serde(rename = "allIds", default)]
    pub all_ids: IndexSet<String>,
    /// Sorted part ids per message
    #[serde(rename = "byMessageId", default)]
    pub by_message_id: IndexMap<String, IndexSet<String>>,
}

impl MessagePartsState {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Queries ─────────────────────────────────────────────

    /// Get a part by id.
    pub fn get(&self, id: &str) -> Option<&MessagePart> {
        self.by_id.get(id)
    }

    /// Number of stored parts.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether the store holds no parts.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Parts of `message_id` in display order.
    pub fn parts_for_message(&self, message_id: &str) -> Vec<&MessagePart> {
        self.by_message_id
            .get(message_id)
            .map(|ids| ids.iter().filter_map(|id| self.by_id.get(id)).collect())
            .unwrap_or_default()
    }

    /// Sorted part ids of `message_id`.
    pub fn part_ids_for_message(&self, message_id: &str) -> Vec<&str> {
        self.by_message_id
            .get(message_id)
            .map(|ids| ids.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    // ─── Upserts ─────────────────────────────────────────────

    /// Normalize and insert or merge one raw part payload.
    ///
    /// A payload for a stored part only overwrites the fields it carries.
    pub fn upsert_part(&mut self, raw: Value) -> Result<PartChange, PartRejection> {
        let part = self.normalize_or_log(raw)?;
        Ok(self.upsert(part))
    }

    /// Insert or merge an already normalized part.
    pub fn upsert(&mut self, part: MessagePart) -> PartChange {
        let (change, message_id, needs_sort) = self.upsert_unsorted(part);
        if needs_sort {
            self.resort(&message_id);
        }
        change
    }

    /// Upsert a batch of raw parts, sorting each affected message once.
    ///
    /// Returns the number of parts accepted.
    pub fn upsert_parts(&mut self, batch: impl IntoIterator<Item = Value>) -> usize {
        let mut affected = IndexSet::new();
        let mut accepted = 0usize;

        for raw in batch {
            let Ok(part) = self.normalize_or_log(raw) else {
                continue;
            };
            let (_, message_id, _) = self.upsert_unsorted(part);
            affected.insert(message_id);
            accepted += 1;
        }

        for message_id in &affected {
            self.resort(message_id);
        }
        tracing::debug!(accepted, messages = affected.len(), "batch upsert");
        accepted
    }

    /// Insert or merge without sorting.
    ///
    /// Returns the change, the part's message id, and whether that
    /// message's index needs sorting.
    fn upsert_unsorted(&mut self, part: MessagePart) -> (PartChange, String, bool) {
        let id = part.id.clone();

        let Some(existing) = self.by_id.get_mut(&id) else {
            let message_id = part.message_id.clone();
            self.by_id.insert(id.clone(), part);
            self.all_ids.insert(id.clone());
            let added = self
                .by_message_id
                .entry(message_id.clone())
                .or_default()
                .insert(id);
            return (PartChange::Inserted, message_id, added);
        };

        let previous_key = sort_key(existing);
        let previous_message = existing.message_id.clone();
        existing.merge_from(part);
        let key_changed = previous_key != sort_key(existing);
        let message_id = existing.message_id.clone();

        let moved = previous_message != message_id;
        if moved {
            if let Some(old) = self.by_message_id.get_mut(&previous_message) {
                old.shift_remove(&id);
            }
            self.by_message_id
                .entry(message_id.clone())
                .or_default()
                .insert(id);
            tracing::debug!(from = %previous_message, to = %message_id, "moved part between messages");
        }

        (PartChange::Updated, message_id, key_changed || moved)
    }

    // ─── Updates ─────────────────────────────────────────────

    /// Apply a streaming update to an existing part.
    ///
    /// The delta (if any) is fed first, then explicit fields are written.
    /// Returns `false` when the part is unknown.
    pub fn update_part(&mut self, update: &PartUpdate) -> bool {
        let Some(part) = self.by_id.get_mut(&update.id) else {
            tracing::warn!(part = %update.id, "update for unknown message part");
            return false;
        };

        if let Some(delta) = update.delta.as_deref() {
            let outcome = part.apply_delta(delta, update.index);
            tracing::trace!(part = %update.id, ?outcome, "applied delta");
        }

        let previous_key = sort_key(part);
        part.apply_updates(update);
        if previous_key != sort_key(part) {
            let message_id = part.message_id.clone();
            self.resort(&message_id);
        }
        true
    }

    /// Mark a part finished, applying any final updates first.
    ///
    /// `finished_at` is stamped onto thinking and tool parts that have no
    /// completion time yet. Returns `false` when the part is unknown.
    pub fn complete_part(
        &mut self,
        id: &str,
        updates: Option<&PartUpdate>,
        finished_at: &str,
    ) -> bool {
        let Some(part) = self.by_id.get_mut(id) else {
            return false;
        };

        let previous_key = sort_key(part);
        if let Some(updates) = updates {
            part.apply_updates(updates);
        }
        part.complete(finished_at);

        if previous_key != sort_key(part) {
            let message_id = part.message_id.clone();
            self.resort(&message_id);
        }
        true
    }

    /// Overwrite a part's ordering keys and resort its message.
    ///
    /// `block_order` is left untouched when `None`.
    pub fn set_part_order(&mut self, id: &str, order: f64, block_order: Option<f64>) -> bool {
        let Some(part) = self.by_id.get_mut(id) else {
            return false;
        };
        part.set_order(Some(order), block_order.or(part.block_order));
        let message_id = part.message_id.clone();
        self.resort(&message_id);
        true
    }

    fn resort(&mut self, message_id: &str) {
        let by_id = &self.by_id;
        if let Some(ids) = self.by_message_id.get_mut(message_id) {
            if ids.len() > 1 {
                ids.sort_by(|a, b| compare_parts(a, b, by_id));
                tracing::trace!(message = %message_id, count = ids.len(), "sorted part ids");
            }
        }
    }

    /// Normalize a payload; defaults are filled only for unknown parts,
    /// and a payload without a type keeps the stored part's kind.
    fn normalize_or_log(&self, raw: Value) -> Result<MessagePart, PartRejection> {
        let stored = raw
            .get("id")
            .and_then(coerce_id)
            .and_then(|id| self.by_id.get(&id))
            .map(|part| part.kind);

        let mut part = MessagePart::from_payload(raw, stored.unwrap_or_default())
            .map_err(|rejection| {
                tracing::warn!(%rejection, "dropped invalid message part");
                rejection
            })?;
        if stored.is_none() {
            part.fill_defaults();
        }
        Ok(part)
    }
}

/// Fields [`compare_parts`](crate::ordering::compare_parts) reads.
fn sort_key(part: &MessagePart) -> (Option<f64>, Option<f64>, Option<String>) {
    (part.order, part.block_order, part.created_at.clone())
}
