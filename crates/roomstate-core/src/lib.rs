//! Roomstate Core - Normalized Entity Store and Streaming-Merge Engine
//!
//! Folds heterogeneous room payloads (REST pages, partial thread updates,
//! token-level stream deltas) into one deduplicated, deterministically
//! ordered in-memory state, and checks that state's shape at runtime.
//!
//! # Components
//!
//! ## Collections
//! - `NormalizedCollection`: `{byId, allIds[, byName][, paginationInfo]}`
//! - `paginate`: REST page → collection, server order preserved, optional slugs
//!
//! ## Merging
//! - `deep_merge`: recursive object merge with an explicit `ArrayPolicy`
//! - `merge_arrays`: order-preserving deduplicating union
//! - `merge_collection_property` / `merge_collection_slot`: merge-or-replace
//! - `merge_threads`: thread metadata overwrite + sub-collection merge
//!
//! ## Message parts
//! - `compare_parts`: total order (`order`, `block_order`, `created_at`, id)
//! - `StreamCursor`: indexed delta reassembly
//! - `MessagePartsState`: per-message sorted part index
//!
//! ## Validation
//! - `StateShapeValidator`: declarative runtime shape table and report
//!
//! Every operation is synchronous and owns no I/O; the host serializes calls.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

// === Core Modules ===

/// Unified error handling
pub mod errors;

/// URL-safe slug derivation
pub mod slug;

/// Normalized collections and pagination
pub mod collection;

/// Deep, array and collection merges
pub mod merge;

/// Thread aggregates and the thread merger
pub mod thread;

/// Message part model and normalization
pub mod parts;

/// Ordered delta reassembly
pub mod streaming;

/// Part ordering
pub mod ordering;

/// Message parts store
pub mod parts_store;

/// Runtime state-shape validation
pub mod validate;

/// Sequence-based staleness guard
pub mod staleness;

/// Layered configuration
pub mod config;

// === Re-exports ===

pub use collection::{
    paginate, paginate_opt, Entity, InvariantViolation, NormalizedCollection, Page,
    PaginateOptions, PaginationInfo,
};
pub use config::{LayeredConfig, StoreConfig};
pub use errors::{Result, StoreError};
pub use merge::{
    deep_merge, merge_arrays, merge_collection_property, merge_collection_slot, ArrayPolicy,
    MergeDecision,
};
pub use ordering::{compare_parts, sort_part_ids, PartRef};
pub use parts::{MessagePart, PartKind, PartRejection, PartUpdate};
pub use parts_store::{MessagePartsState, PartChange};
pub use slug::{slugify, SlugIndex};
pub use staleness::{merge_thread_sequenced, Admission, SequenceGuard};
pub use streaming::{DeltaOutcome, StreamCursor};
pub use thread::{merge_threads, Thread, ThreadMergeOutcome};
pub use validate::{
    get_safe_property, has_valid_property, StateShapeValidator, ValidationMode, ValidationReport,
};
