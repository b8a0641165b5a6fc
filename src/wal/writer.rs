//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;

use super::WalEntry;

/// Writes entries to the WAL file
///
/// Bound to one memtable generation: `reset` starts the next one.
pub struct WalWriter {
    /// Location of the log
    path: PathBuf,
    /// Opened in append mode
    file: File,
    /// Entries appended since open or the last reset
    entries_written: u64,
}

impl WalWriter {
    /// Open or create a WAL file, keeping any existing content
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            entries_written: 0,
        })
    }

    /// Append an entry and force it to stable storage
    pub fn append(&mut self, entry: &WalEntry) -> Result<()> {
        let line = entry.encode()?;
        self.file.write_all(line.as_bytes())?;
        self.file.sync_data()?;
        self.entries_written += 1;
        Ok(())
    }

    /// Truncate the log to empty.
    ///
    /// Only call once the matching memtable is durable in a segment,
    /// otherwise replay would lose those records.
    pub fn reset(&mut self) -> Result<()> {
        self.file.set_len(0)?;
        self.file.sync_all()?;
        tracing::debug!(path = %self.path.display(), entries = self.entries_written, "WAL reset");
        self.entries_written = 0;
        Ok(())
    }

    pub fn entries_written(&self) -> u64 {
        self.entries_written
    }
}
