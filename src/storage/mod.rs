//! Storage Module
//!
//! Persistent storage layer built from immutable sorted segments.
//!
//! ## Responsibilities
//! - Flush memtables into new segments
//! - Maintain the sparse index and membership filter over flushed keys
//! - Point lookups: filter → sparse index → newest-first segment search
//! - Explicit two-way compaction (merge)
//!
//! ## File Format
//! ```text
//! ┌────────────────────────────────────────┐
//! │ <key hex>,<value json>\n               │
//! │ <key hex>,<value json>\n               │
//! │ ... strictly ascending by raw key      │
//! └────────────────────────────────────────┘
//! ```
//! A segment carries no header or footer; its bounds and record count are
//! tracked in [`SegmentMeta`] and persisted with the engine snapshot.

mod segment;
mod index;
mod merge;
mod manager;

pub use segment::{SegmentBuilder, SegmentIterator, SegmentLine, SegmentMeta, SegmentReader};
pub use index::{IndexEntry, SparseIndex};
pub use merge::merge_segments;
pub use manager::{next_segment_name, SegmentStore};
