//! MemTable implementation
//!
//! Red-black tree of [`Value`]s plus a running byte footprint.

use crate::error::Result;
use crate::value::{record_size, Value};

use super::tree::{Iter, RedBlackTree};

/// In-memory table for recent writes
///
/// The footprint counts `key.len() + json(value).len()` for every live key.
/// Overwrites adjust it by the size difference, so it always equals the sum
/// over the current contents.
#[derive(Debug, Default)]
pub struct MemTable {
    tree: RedBlackTree<Value>,
    total_bytes: usize,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value by key
    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        self.tree.get(key)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.tree.contains_key(key)
    }

    /// Insert or overwrite a key. Returns `true` if the key was new.
    pub fn put(&mut self, key: Vec<u8>, value: Value) -> Result<bool> {
        let new_size = record_size(&key, &value)?;
        let key_len = key.len();

        match self.tree.insert(key, value) {
            Some(old) => {
                let old_size = key_len + old.serialized_len()?;
                self.total_bytes = self.total_bytes + new_size - old_size;
                Ok(false)
            }
            None => {
                self.total_bytes += new_size;
                Ok(true)
            }
        }
    }

    /// Remove a key, releasing its share of the footprint
    pub fn remove(&mut self, key: &[u8]) -> Result<Option<Value>> {
        match self.tree.remove(key) {
            Some(old) => {
                self.total_bytes -= key.len() + old.serialized_len()?;
                Ok(Some(old))
            }
            None => Ok(None),
        }
    }

    /// Exact byte footprint of the current contents
    pub fn size(&self) -> usize {
        self.total_bytes
    }

    /// Number of distinct keys
    pub fn entry_count(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Entries in ascending key order (for flush)
    pub fn iter(&self) -> Iter<'_, Value> {
        self.tree.iter()
    }

    /// Verify the underlying tree's structural invariants
    pub fn check_invariants(&self) -> Result<()> {
        self.tree.check_invariants()
    }
}
