//! Ordered assembly of streamed content deltas
//!
//! Streaming transports may deliver chunks out of order or more than once.
//! A [`StreamCursor`] tracks the last contiguous chunk index appended to a
//! content field and buffers anything that arrives early. Chunks without an
//! index are appended as they come.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What happened to a delta handed to [`StreamCursor::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaOutcome {
    /// Appended to the content, together with `consumed - 1` buffered chunks
    Appended {
        /// Number of chunks appended (including this one)
        consumed: usize,
    },
    /// Held until the chunks before it arrive
    Buffered,
    /// Duplicate or already-consumed index
    Dropped,
}

impl DeltaOutcome {
    /// Whether the delta was kept (appended or buffered).
    #[must_use]
    pub fn accepted(&self) -> bool {
        !matches!(self, Self::Dropped)
    }
}

/// Reorder buffer for one streamed content field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamCursor {
    /// Highest index appended so far, `-1` before the first chunk
    #[serde(rename = "lastProcessedIndex", default = "initial_index")]
    last_processed: i64,
    /// Chunks received ahead of `last_processed + 1`
    #[serde(rename = "deltaBuffer", default)]
    buffer: BTreeMap<i64, String>,
}

fn initial_index() -> i64 {
    -1
}

impl Default for StreamCursor {
    fn default() -> Self {
        Self {
            last_processed: initial_index(),
            buffer: BTreeMap::new(),
        }
    }
}

impl StreamCursor {
    /// Highest contiguous index appended, `-1` if none.
    pub fn last_processed(&self) -> i64 {
        self.last_processed
    }

    /// Number of chunks waiting for a gap to fill.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the cursor has never seen an indexed chunk.
    pub fn is_fresh(&self) -> bool {
        self.last_processed < 0 && self.buffer.is_empty()
    }

    /// Feed one delta into `content`.
    ///
    /// A negative or missing `index` appends immediately. Otherwise the
    /// chunk is buffered and every consecutive chunk starting at
    /// `last_processed + 1` is appended in order. `on_chunk` sees each
    /// appended chunk.
    pub fn push(
        &mut self,
        content: &mut String,
        delta: &str,
        index: Option<i64>,
        mut on_chunk: impl FnMut(&str),
    ) -> DeltaOutcome {
        let Some(index) = index.filter(|i| *i >= 0) else {
            content.push_str(delta);
            on_chunk(delta);
            return DeltaOutcome::Appended { consumed: 1 };
        };

        if index <= self.last_processed || self.buffer.contains_key(&index) {
            tracing::trace!(index, last = self.last_processed, "dropped duplicate delta");
            return DeltaOutcome::Dropped;
        }
        self.buffer.insert(index, delta.to_string());

        let mut consumed = 0usize;
        while let Some(chunk) = self.buffer.remove(&(self.last_processed + 1)) {
            content.push_str(&chunk);
            on_chunk(&chunk);
            self.last_processed += 1;
            consumed += 1;
        }

        if consumed == 0 {
            DeltaOutcome::Buffered
        } else {
            DeltaOutcome::Appended { consumed }
        }
    }
}
