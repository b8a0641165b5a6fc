//! Segment Module
//!
//! A segment is an immutable file of records sorted by key, named
//! `<basename>-<n>`. It is written once by a flush or a merge and only
//! ever removed by a merge.

mod builder;
mod iterator;
mod reader;

use serde::{Deserialize, Serialize};

pub use builder::SegmentBuilder;
pub use iterator::{SegmentIterator, SegmentLine};
pub use reader::SegmentReader;

// =============================================================================
// Segment Metadata
// =============================================================================

/// What the store remembers about a flushed segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentMeta {
    /// File name inside the segments directory
    pub name: String,
    /// Smallest key (for range filtering)
    pub first_key: Vec<u8>,
    /// Largest key (for range filtering)
    pub last_key: Vec<u8>,
    /// Number of records in the file
    pub record_count: u64,
    /// File size in bytes
    pub size_bytes: u64,
}

impl SegmentMeta {
    /// Quick check if a key might be in this segment (range check)
    /// Returns false if key is definitely outside [first_key, last_key]
    pub fn might_contain(&self, key: &[u8]) -> bool {
        self.record_count > 0
            && key >= self.first_key.as_slice()
            && key <= self.last_key.as_slice()
    }
}
