//! Membership Filter Module
//!
//! Probabilistic "definitely absent / possibly present" answers for keys
//! that live in flushed segments. Memtable-only keys are never added.

mod counting;

pub use counting::CountingBloomFilter;
