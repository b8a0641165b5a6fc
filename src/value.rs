//! Values and the record line codec
//!
//! Segments and the WAL share one text encoding, one record per line:
//!
//! ```text
//! <key as hex>,<value as JSON>\n
//! ```
//!
//! The JSON object is the closed [`Value`] record; its `payload` field is
//! hex-encoded. Hex keys preserve byte order, so a segment sorted by raw key
//! is also sorted line by line.

use serde::{Deserialize, Serialize};

use crate::error::{LsmError, Result};

/// A stored value. Opaque to the engine beyond size accounting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Value {
    pub content_type: String,
    pub encoding: String,
    #[serde(with = "hex")]
    pub payload: Vec<u8>,
}

impl Value {
    pub fn new(
        content_type: impl Into<String>,
        encoding: impl Into<String>,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            content_type: content_type.into(),
            encoding: encoding.into(),
            payload: payload.into(),
        }
    }

    /// Serialize to the JSON form stored on disk
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Length of the JSON form, used for memtable size accounting
    pub fn serialized_len(&self) -> Result<usize> {
        Ok(self.to_json()?.len())
    }
}

/// Bytes a `(key, value)` pair contributes to the memtable footprint
pub fn record_size(key: &[u8], value: &Value) -> Result<usize> {
    Ok(key.len() + value.serialized_len()?)
}

/// Encode a record as one newline-terminated line
pub fn encode_record(key: &[u8], value: &Value) -> Result<String> {
    Ok(format!("{},{}\n", hex::encode(key), value.to_json()?))
}

/// Decode a full line. `source` names the file for error reporting.
pub fn decode_record(line: &str, source: &str) -> Result<(Vec<u8>, Value)> {
    let (key_hex, json) = split_line(line, source)?;
    let key = decode_hex_key(key_hex, source)?;
    let value: Value = serde_json::from_str(json.trim())
        .map_err(|e| LsmError::corruption(source, format!("bad value JSON: {}", e)))?;
    Ok((key, value))
}

/// Decode only the key of a line, leaving the value untouched
pub fn decode_key(line: &str, source: &str) -> Result<Vec<u8>> {
    let (key_hex, _) = split_line(line, source)?;
    decode_hex_key(key_hex, source)
}

fn split_line<'a>(line: &'a str, source: &str) -> Result<(&'a str, &'a str)> {
    let line = line.trim_end_matches(&['\n', '\r'][..]);
    line.split_once(',').ok_or_else(|| {
        LsmError::corruption(source, format!("missing key separator in line {:?}", line))
    })
}

fn decode_hex_key(key_hex: &str, source: &str) -> Result<Vec<u8>> {
    hex::decode(key_hex.trim())
        .map_err(|e| LsmError::corruption(source, format!("bad key hex {:?}: {}", key_hex, e)))
}
