//! Segment Builder
//!
//! Writes sorted records to a new segment file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{LsmError, Result};
use crate::value::{encode_record, Value};

use super::SegmentMeta;

/// Builder for creating new segments from sorted records
pub struct SegmentBuilder {
    /// Segment name recorded in the metadata
    name: String,
    /// Output file path
    path: PathBuf,
    /// Buffered writer for performance
    writer: BufWriter<File>,
    /// Number of records written
    record_count: u64,
    /// Current write position (start of the next record)
    current_offset: u64,
    /// Track first/last keys for metadata and ordering checks
    first_key: Option<Vec<u8>>,
    last_key: Option<Vec<u8>>,
}

impl SegmentBuilder {
    /// Create (or truncate) the file at `path`
    pub fn new(path: &Path, name: &str) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            record_count: 0,
            current_offset: 0,
            first_key: None,
            last_key: None,
        })
    }

    /// Add a record (must be called in strictly ascending key order).
    ///
    /// Returns the byte offset where the record starts.
    pub fn add(&mut self, key: &[u8], value: &Value) -> Result<u64> {
        let line = encode_record(key, value)?;
        self.add_line(key, &line)
    }

    /// Add an already-encoded line for `key`, as read from another segment
    pub fn add_line(&mut self, key: &[u8], line: &str) -> Result<u64> {
        if let Some(last) = &self.last_key {
            if key <= last.as_slice() {
                return Err(LsmError::InvariantViolation(format!(
                    "segment {}: key {:02x?} written after {:02x?}",
                    self.name, key, last
                )));
            }
        }

        let offset = self.current_offset;
        self.writer.write_all(line.as_bytes())?;
        let mut written = line.len() as u64;
        if !line.ends_with('\n') {
            self.writer.write_all(b"\n")?;
            written += 1;
        }

        if self.first_key.is_none() {
            self.first_key = Some(key.to_vec());
        }
        self.last_key = Some(key.to_vec());
        self.current_offset += written;
        self.record_count += 1;

        Ok(offset)
    }

    /// Flush, fsync and return the segment's metadata
    pub fn finish(mut self) -> Result<SegmentMeta> {
        self.writer.flush()?;
        let file = self
            .writer
            .into_inner()
            .map_err(|e| LsmError::Io(e.into_error()))?;
        file.sync_all()?;

        tracing::trace!(segment = %self.name, path = %self.path.display(), "Segment written");

        Ok(SegmentMeta {
            name: self.name,
            first_key: self.first_key.unwrap_or_default(),
            last_key: self.last_key.unwrap_or_default(),
            record_count: self.record_count,
            size_bytes: self.current_offset,
        })
    }
}
