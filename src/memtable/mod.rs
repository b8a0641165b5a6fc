//! MemTable Module
//!
//! In-memory data structure for recent writes.
//!
//! ## Responsibilities
//! - Hold every write not yet flushed to a segment
//! - Track the exact byte footprint for flush triggers
//! - Ordered iteration for segment creation
//!
//! ## Data Structure Choice
//! A red-black tree over an index arena (`tree`): ordered keys with
//! guaranteed O(log n) lookups, and the same structure doubles as the
//! sparse index's floor-lookup table.

mod table;
pub mod tree;

pub use table::MemTable;
pub use tree::RedBlackTree;
