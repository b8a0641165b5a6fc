//! Segment Reader
//!
//! Point lookups over one segment file: a forward scan from a known offset
//! (sparse index hit) and a halving search over line boundaries.

use std::cmp::Ordering;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::value::{decode_key, decode_record, Value};

use super::iterator::SegmentIterator;

/// Reader for a single segment file
pub struct SegmentReader {
    name: String,
    path: PathBuf,
    source: String,
}

impl SegmentReader {
    /// Open a segment for reading. Fails if the file does not exist.
    pub fn open(path: &Path, name: &str) -> Result<Self> {
        fs::metadata(path)?;
        Ok(Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            source: format!("segment {}", name),
        })
    }

    /// Scan forward from `offset` until `key` is found or a larger key
    /// proves it is not in this segment.
    ///
    /// An offset that does not start a line (a sparse index entry older than
    /// the file) also yields `Ok(None)`, leaving the caller to search.
    pub fn scan_from(&self, offset: u64, key: &[u8]) -> Result<Option<Value>> {
        let mut file = File::open(&self.path)?;
        if offset > 0 {
            let mut prev = [0u8; 1];
            file.seek(SeekFrom::Start(offset - 1))?;
            if file.read(&mut prev)? != 1 || prev[0] != b'\n' {
                tracing::debug!(segment = %self.name, offset, "Offset is not a line start");
                return Ok(None);
            }
        }
        let mut reader = BufReader::new(file);
        let mut line = String::new();

        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }

            let line_key = decode_key(&line, &self.source)?;
            match line_key.as_slice().cmp(key) {
                Ordering::Less => continue,
                Ordering::Equal => {
                    let (_, value) = decode_record(&line, &self.source)?;
                    return Ok(Some(value));
                }
                Ordering::Greater => return Ok(None),
            }
        }
    }

    /// Halving search over the segment's lines
    pub fn search(&self, key: &[u8]) -> Result<Option<Value>> {
        let contents = fs::read_to_string(&self.path)?;
        let lines: Vec<&str> = contents.lines().filter(|l| !l.is_empty()).collect();

        let mut lo = 0;
        let mut hi = lines.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let mid_key = decode_key(lines[mid], &self.source)?;
            match mid_key.as_slice().cmp(key) {
                Ordering::Equal => {
                    let (_, value) = decode_record(lines[mid], &self.source)?;
                    return Ok(Some(value));
                }
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
            }
        }
        Ok(None)
    }

    /// Create an iterator over all records
    pub fn iter(&self) -> Result<SegmentIterator> {
        let file = File::open(&self.path)?;
        Ok(SegmentIterator::new(file, &self.name))
    }
}
