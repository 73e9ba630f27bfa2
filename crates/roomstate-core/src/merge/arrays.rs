//! Deduplicating array union

use indexmap::IndexSet;
use std::hash::Hash;

/// Union two slices with set semantics, preserving first-seen order.
///
/// The result holds every distinct element of `a` in order, followed by the
/// elements of `b` not already present. Duplicates inside `a` collapse too.
pub fn merge_arrays<T>(a: &[T], b: &[T]) -> Vec<T>
where
    T: Eq + Hash + Clone,
{
    let mut seen: IndexSet<T> = IndexSet::with_capacity(a.len() + b.len());
    seen.extend(a.iter().cloned());
    seen.extend(b.iter().cloned());
    seen.into_iter().collect()
}

/// Append the ids of `incoming` missing from `ids`, in place.
///
/// Equivalent to `*ids = merge_arrays(ids, incoming)`.
pub fn union_ids_into(ids: &mut Vec<String>, incoming: &[String]) {
    *ids = merge_arrays(ids, incoming);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_arrays_dedup_union() {
        assert_eq!(merge_arrays(&[1, 2], &[2, 3]), vec![1, 2, 3]);
    }

    #[test]
    fn test_merge_arrays_keeps_left_order() {
        assert_eq!(merge_arrays(&["c", "a"], &["b", "a", "d"]), vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn test_merge_arrays_collapses_left_duplicates() {
        assert_eq!(merge_arrays(&[1, 1, 2], &[]), vec![1, 2]);
    }

    #[test]
    fn test_union_ids_into() {
        let mut ids = vec!["1".to_string()];
        union_ids_into(&mut ids, &["2".to_string(), "1".to_string()]);
        assert_eq!(ids, vec!["1", "2"]);
    }
}
