//! Counting bloom filter
//!
//! Sizing for `n` expected items at target false-positive rate `p`:
//!
//! ```text
//! m = ceil(-n * ln(p) / ln(2)^2)     counters
//! k = round((m / n) * ln(2))         hash functions
//! ```
//!
//! Counter `i` for a key is `xxh3_64_with_seed(key, i) mod m`, for
//! `i in 0..k`. Counters saturate instead of wrapping and are never
//! decremented, so a key once added always checks true.

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::error::{LsmError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountingBloomFilter {
    counters: Vec<u8>,
    expected_items: usize,
    false_positive_rate: f64,
    hash_count: u32,
}

impl CountingBloomFilter {
    /// Create an empty filter sized for `expected_items` at `false_positive_rate`
    pub fn new(expected_items: usize, false_positive_rate: f64) -> Result<Self> {
        if expected_items == 0 {
            return Err(LsmError::Config("expected_items must be > 0".to_string()));
        }
        if !(false_positive_rate > 0.0 && false_positive_rate < 1.0) {
            return Err(LsmError::Config(format!(
                "false_positive_rate must be in (0, 1), got {}",
                false_positive_rate
            )));
        }

        let n = expected_items as f64;
        let ln2 = std::f64::consts::LN_2;
        let m = (-n * false_positive_rate.ln() / (ln2 * ln2)).ceil().max(1.0);
        let k = ((m / n) * ln2).round().max(1.0);

        Ok(Self {
            counters: vec![0; m as usize],
            expected_items,
            false_positive_rate,
            hash_count: k as u32,
        })
    }

    /// Record a key
    pub fn add(&mut self, key: &[u8]) {
        for seed in 0..self.hash_count {
            let slot = self.slot(key, seed);
            self.counters[slot] = self.counters[slot].saturating_add(1);
        }
    }

    /// `false` means the key was definitely never added
    pub fn check(&self, key: &[u8]) -> bool {
        (0..self.hash_count).all(|seed| self.counters[self.slot(key, seed)] != 0)
    }

    /// Number of counters (`m`)
    pub fn size(&self) -> usize {
        self.counters.len()
    }

    /// Number of hash functions (`k`)
    pub fn hash_count(&self) -> u32 {
        self.hash_count
    }

    pub fn expected_items(&self) -> usize {
        self.expected_items
    }

    pub fn false_positive_rate(&self) -> f64 {
        self.false_positive_rate
    }

    /// True when no key has been added since construction
    pub fn is_empty(&self) -> bool {
        self.counters.iter().all(|&c| c == 0)
    }

    /// Whether the state could have come from [`CountingBloomFilter::new`]
    pub fn is_well_formed(&self) -> bool {
        !self.counters.is_empty() && self.hash_count > 0 && self.expected_items > 0
    }

    fn slot(&self, key: &[u8], seed: u32) -> usize {
        (xxh3_64_with_seed(key, u64::from(seed)) % self.counters.len() as u64) as usize
    }
}
