//! Total order over message parts
//!
//! Parts sort by `order`, then `block_order` (both missing → last), then
//! creation time (unparsable → epoch 0), then byte-wise id. The id step
//! makes the order total: two distinct parts never compare equal, so the
//! sorted sequence does not depend on the order fragments arrived in.

use crate::parts::MessagePart;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use std::cmp::Ordering;

/// An operand of [`compare_parts`]: either an id to resolve or a part.
#[derive(Debug, Clone, Copy)]
pub enum PartRef<'a> {
    /// Id looked up in the part map
    Id(&'a str),
    /// Part already resolved by the caller
    Part(&'a MessagePart),
}

impl<'a> From<&'a str> for PartRef<'a> {
    fn from(id: &'a str) -> Self {
        Self::Id(id)
    }
}

impl<'a> From<&'a String> for PartRef<'a> {
    fn from(id: &'a String) -> Self {
        Self::Id(id.as_str())
    }
}

impl<'a> From<&'a MessagePart> for PartRef<'a> {
    fn from(part: &'a MessagePart) -> Self {
        Self::Part(part)
    }
}

/// Sort key extracted from one operand.
#[derive(Debug, Clone, Copy)]
struct OrderKey<'a> {
    order: f64,
    block_order: f64,
    created_ms: i64,
    id: &'a str,
}

impl<'a> OrderKey<'a> {
    fn resolve(operand: PartRef<'a>, by_id: &'a IndexMap<String, MessagePart>) -> Self {
        match operand {
            PartRef::Part(part) => Self::of(part),
            PartRef::Id(id) => match by_id.get(id) {
                Some(part) => Self::of(part),
                // unknown ids still tiebreak on their own id
                None => Self {
                    order: f64::INFINITY,
                    block_order: f64::INFINITY,
                    created_ms: 0,
                    id,
                },
            },
        }
    }

    fn of(part: &'a MessagePart) -> Self {
        Self {
            order: position(part.order),
            block_order: position(part.block_order),
            created_ms: part.created_at.as_deref().map_or(0, parse_timestamp_ms),
            id: &part.id,
        }
    }
}

fn position(value: Option<f64>) -> f64 {
    value.filter(|n| n.is_finite()).unwrap_or(f64::INFINITY)
}

/// Parse an ISO-8601 timestamp to epoch milliseconds; `0` when unparsable.
///
/// Accepts RFC 3339, naive date-times (read as UTC) and bare dates.
pub fn parse_timestamp_ms(raw: &str) -> i64 {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.timestamp_millis();
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return naive.and_utc().timestamp_millis();
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map_or(0, |naive| naive.and_utc().timestamp_millis())
}

/// Compare two parts, resolving ids through `by_id`.
pub fn compare_parts<'a>(
    a: impl Into<PartRef<'a>>,
    b: impl Into<PartRef<'a>>,
    by_id: &'a IndexMap<String, MessagePart>,
) -> Ordering {
    let a = OrderKey::resolve(a.into(), by_id);
    let b = OrderKey::resolve(b.into(), by_id);

    a.order
        .partial_cmp(&b.order)
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            a.block_order
                .partial_cmp(&b.block_order)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.created_ms.cmp(&b.created_ms))
        .then_with(|| a.id.cmp(b.id))
}

/// Sort a list of part ids in place.
pub fn sort_part_ids(ids: &mut [String], by_id: &IndexMap<String, MessagePart>) {
    ids.sort_by(|a, b| compare_parts(a, b, by_id));
    tracing::trace!(count = ids.len(), "sorted part ids");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parts::PartKind;

    fn part(id: &str, order: Option<f64>) -> MessagePart {
        let mut part = MessagePart::new(id, "m", PartKind::Text);
        part.order = order;
        part
    }

    fn map(parts: Vec<MessagePart>) -> IndexMap<String, MessagePart> {
        parts.into_iter().map(|p| (p.id.clone(), p)).collect()
    }

    #[test]
    fn test_equal_order_tiebreaks_on_id() {
        let by_id = map(vec![part("x", Some(1.0)), part("y", Some(1.0))]);
        assert_eq!(compare_parts("x", "y", &by_id), Ordering::Less);
        assert_eq!(compare_parts("y", "x", &by_id), Ordering::Greater);
        assert_eq!(compare_parts("x", "x", &by_id), Ordering::Equal);
    }

    #[test]
    fn test_missing_order_sorts_last() {
        let by_id = map(vec![part("a", None), part("b", Some(100.0))]);
        assert_eq!(compare_parts("a", "b", &by_id), Ordering::Greater);
    }

    #[test]
    fn test_block_order_breaks_order_ties() {
        let mut first = part("z", Some(1.0));
        first.block_order = Some(0.0);
        let mut second = part("a", Some(1.0));
        second.block_order = Some(1.0);
        let by_id = map(vec![first, second]);
        assert_eq!(compare_parts("z", "a", &by_id), Ordering::Less);
    }

    #[test]
    fn test_created_at_then_unparsable_first() {
        let mut early = part("b", None);
        early.created_at = Some("2024-01-01T00:00:00Z".into());
        let mut late = part("a", None);
        late.created_at = Some("2024-01-02T00:00:00Z".into());
        let mut garbage = part("c", None);
        garbage.created_at = Some("yesterday".into());
        let by_id = map(vec![early, late, garbage]);

        assert_eq!(compare_parts("b", "a", &by_id), Ordering::Less);
        assert_eq!(compare_parts("c", "b", &by_id), Ordering::Less);
    }

    #[test]
    fn test_resolved_and_unresolved_operands() {
        let by_id = map(vec![part("p", Some(1.0))]);
        let resolved = part("q", Some(0.0));
        assert_eq!(compare_parts(&resolved, "p", &by_id), Ordering::Less);
        // unknown id sorts after any ordered part
        assert_eq!(compare_parts("ghost", "p", &by_id), Ordering::Greater);
        assert_ne!(compare_parts("ghost", "ghost2", &by_id), Ordering::Equal);
    }

    #[test]
    fn test_timestamp_formats() {
        assert_eq!(parse_timestamp_ms("1970-01-01T00:00:01Z"), 1000);
        assert_eq!(parse_timestamp_ms("1970-01-01T00:00:01.5"), 1500);
        assert_eq!(parse_timestamp_ms("1970-01-02"), 86_400_000);
        assert_eq!(parse_timestamp_ms(""), 0);
    }

    #[test]
    fn test_sort_part_ids() {
        let by_id = map(vec![part("c", None), part("b", Some(2.0)), part("a", Some(2.0))]);
        let mut ids = vec!["c".to_string(), "b".to_string(), "a".to_string()];
        sort_part_ids(&mut ids, &by_id);
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
