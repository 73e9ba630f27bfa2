//! Merge primitives
//!
//! - [`deep_merge`]: recursive JSON object merge with an explicit array policy
//! - [`merge_arrays`]: deduplicating, order-preserving union
//! - [`merge_collection_property`] / [`merge_collection_slot`]: merge-or-replace
//!   for normalized sub-collections

mod arrays;
mod collection;
mod deep;

pub use arrays::{merge_arrays, union_ids_into};
pub use collection::{
    merge_collection_property, merge_collection_slot, IncomingShape, MergeDecision,
};
pub use deep::{deep_merge, ArrayPolicy};
