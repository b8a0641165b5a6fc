//! Sparse Index
//!
//! Maps a sampled subset of flushed keys to the segment and byte offset of
//! their record. A lookup takes the floor entry for the wanted key and scans
//! forward from there. Values are never stored here.

use serde::{Deserialize, Serialize};

use crate::memtable::RedBlackTree;

/// Location of a sampled record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub segment: String,
    pub offset: u64,
}

#[derive(Debug, Clone, Default)]
pub struct SparseIndex {
    tree: RedBlackTree<IndexEntry>,
}

impl SparseIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted `(key, entry)` pairs
    pub fn from_entries(entries: impl IntoIterator<Item = (Vec<u8>, IndexEntry)>) -> Self {
        let mut index = Self::new();
        for (key, entry) in entries {
            index.tree.insert(key, entry);
        }
        index
    }

    /// Record a sample. A later sample of the same key replaces the earlier one.
    pub fn insert(&mut self, key: Vec<u8>, segment: &str, offset: u64) {
        self.tree.insert(
            key,
            IndexEntry {
                segment: segment.to_string(),
                offset,
            },
        );
    }

    /// Greatest sampled key `<= key`
    pub fn floor(&self, key: &[u8]) -> Option<(&[u8], &IndexEntry)> {
        self.tree.floor(key)
    }

    pub fn get(&self, key: &[u8]) -> Option<&IndexEntry> {
        self.tree.get(key)
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Ascending `(key, entry)` pairs, as persisted in the snapshot
    pub fn entries(&self) -> Vec<(Vec<u8>, IndexEntry)> {
        self.tree
            .iter()
            .map(|(key, entry)| (key.to_vec(), entry.clone()))
            .collect()
    }
}
