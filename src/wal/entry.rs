//! WAL Entry definitions
//!
//! One entry per accepted `set`.

use crate::error::Result;
use crate::value::{decode_record, encode_record, Value};

/// A single entry in the WAL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalEntry {
    pub key: Vec<u8>,
    pub value: Value,
}

impl WalEntry {
    pub fn new(key: Vec<u8>, value: Value) -> Self {
        Self { key, value }
    }

    /// Encode as one newline-terminated line
    pub fn encode(&self) -> Result<String> {
        encode_record(&self.key, &self.value)
    }

    /// Decode a line produced by [`WalEntry::encode`]
    pub fn decode(line: &str) -> Result<Self> {
        let (key, value) = decode_record(line, "wal")?;
        Ok(Self { key, value })
    }
}
