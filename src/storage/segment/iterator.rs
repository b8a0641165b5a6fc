//! Segment Iterator
//!
//! Sequential iteration over all records in a segment.

use std::fs::File;
use std::io::{BufRead, BufReader};

use crate::error::{LsmError, Result};
use crate::value::{decode_key, decode_record, Value};

/// A raw segment line with its decoded key
#[derive(Debug, Clone)]
pub struct SegmentLine {
    /// Byte offset of the line within the segment
    pub offset: u64,
    pub key: Vec<u8>,
    /// The line as stored, including the trailing newline
    pub line: String,
}

impl SegmentLine {
    /// Decode the value half of the line
    pub fn value(&self, source: &str) -> Result<Value> {
        decode_record(&self.line, source).map(|(_, value)| value)
    }
}

/// Iterator over segment records in sorted key order
pub struct SegmentIterator {
    reader: BufReader<File>,
    source: String,
    offset: u64,
}

impl SegmentIterator {
    pub(super) fn new(file: File, name: &str) -> Self {
        Self {
            reader: BufReader::new(file),
            source: format!("segment {}", name),
            offset: 0,
        }
    }
}

impl Iterator for SegmentIterator {
    type Item = Result<SegmentLine>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = String::new();
        let read = match self.reader.read_line(&mut line) {
            Ok(0) => return None,
            Ok(n) => n as u64,
            Err(e) => return Some(Err(LsmError::Io(e))),
        };

        if !line.ends_with('\n') {
            return Some(Err(LsmError::corruption(
                self.source.as_str(),
                format!("unterminated record at offset {}", self.offset),
            )));
        }

        let offset = self.offset;
        self.offset += read;

        Some(decode_key(&line, &self.source).map(|key| SegmentLine { offset, key, line }))
    }
}
