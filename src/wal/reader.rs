//! WAL Reader
//!
//! Splits a WAL file into lines, keeping track of byte offsets so recovery
//! can cut a torn tail.

use std::fs;
use std::path::Path;

use crate::error::Result;

use super::WalEntry;

/// One line of the log, decoded or not
#[derive(Debug)]
pub enum WalLine {
    /// A complete, decodable line
    Entry(WalEntry),
    /// A complete line that does not decode
    Corrupt { offset: u64, reason: String },
    /// Trailing bytes with no terminating newline (interrupted append)
    Torn { offset: u64 },
}

/// Reads entries from the WAL file
pub struct WalReader {
    data: Vec<u8>,
    position: usize,
}

impl WalReader {
    /// Load a WAL file for reading. A missing file reads as empty.
    pub fn open(path: &Path) -> Result<Self> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { data, position: 0 })
    }

    /// Total bytes in the file when it was opened
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Iterator for WalReader {
    type Item = WalLine;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.data.len() {
            return None;
        }
        let start = self.position;
        let rest = &self.data[start..];

        let end = match rest.iter().position(|&b| b == b'\n') {
            Some(i) => start + i + 1,
            None => {
                self.position = self.data.len();
                return Some(WalLine::Torn {
                    offset: start as u64,
                });
            }
        };
        self.position = end;

        let decoded = std::str::from_utf8(&self.data[start..end])
            .map_err(|e| e.to_string())
            .and_then(|line| WalEntry::decode(line).map_err(|e| e.to_string()));

        Some(match decoded {
            Ok(entry) => WalLine::Entry(entry),
            Err(reason) => WalLine::Corrupt {
                offset: start as u64,
                reason,
            },
        })
    }
}
