//! Engine Snapshot
//!
//! Everything needed to reopen the engine besides the WAL: the segment list,
//! the name the next flush writes to, the membership filter and the sparse
//! index. Rewritten after every flush and merge.
//!
//! ## File Format
//! ```text
//! ┌───────────────┬──────────────────────────────────┐
//! │ CRC32 (4, LE) │ bincode(EngineSnapshot)          │
//! └───────────────┴──────────────────────────────────┘
//! ```
//!
//! Saves go to a temporary file which is fsynced and then renamed over the
//! previous snapshot, so a crash leaves either the old or the new one.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LsmError, Result};
use crate::filter::CountingBloomFilter;
use crate::storage::{IndexEntry, SegmentMeta};

/// Name of the snapshot file within the segments directory
pub const SNAPSHOT_FILENAME: &str = "database_state";

/// Temporary file used during atomic snapshot writes
const SNAPSHOT_TMP_FILENAME: &str = "database_state.tmp";

const CRC_SIZE: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub current_segment_name: String,
    /// Ordered oldest → newest
    pub segments: Vec<SegmentMeta>,
    pub filter_state: CountingBloomFilter,
    pub sparse_index: Vec<(Vec<u8>, IndexEntry)>,
}

impl EngineSnapshot {
    /// Load the snapshot at `path`, or `None` if there is none yet
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if data.len() < CRC_SIZE {
            return Err(LsmError::corruption(
                "snapshot",
                format!("file is {} bytes, too short for a checksum", data.len()),
            ));
        }

        let (crc_bytes, body) = data.split_at(CRC_SIZE);
        let stored = u32::from_le_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);
        let actual = crc32fast::hash(body);
        if stored != actual {
            return Err(LsmError::corruption(
                "snapshot",
                format!("checksum mismatch: stored {:#010x}, computed {:#010x}", stored, actual),
            ));
        }

        let snapshot: EngineSnapshot = bincode::deserialize(body)
            .map_err(|e| LsmError::corruption("snapshot", e.to_string()))?;

        if !snapshot.filter_state.is_well_formed() {
            return Err(LsmError::corruption("snapshot", "malformed filter state"));
        }

        Ok(Some(snapshot))
    }

    /// Atomically replace the snapshot at `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        let body = bincode::serialize(self)?;
        let crc = crc32fast::hash(&body);
        let tmp_path = path.with_file_name(SNAPSHOT_TMP_FILENAME);

        {
            let mut f = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            f.write_all(&crc.to_le_bytes())?;
            f.write_all(&body)?;
            f.sync_all()?;
        }

        fs::rename(&tmp_path, path)?;

        tracing::debug!(
            path = %path.display(),
            segments = self.segments.len(),
            index_entries = self.sparse_index.len(),
            "Saved engine snapshot"
        );
        Ok(())
    }
}
