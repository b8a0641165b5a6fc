//! WAL Recovery
//!
//! Handles crash recovery by replaying the WAL.

use std::fs::OpenOptions;
use std::path::Path;

use crate::error::Result;

use super::{WalEntry, WalLine, WalReader};

/// Handles WAL recovery after crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Number of corrupted lines skipped
    pub entries_corrupted: u64,

    /// Length of the log up to the end of its last good entry, or of the
    /// whole log when nothing at the end needs cutting
    pub valid_bytes: u64,

    /// Whether a torn or corrupt tail was cut off
    pub was_truncated: bool,
}

impl WalRecovery {
    /// Recover entries from a WAL file
    ///
    /// This will:
    /// 1. Read all complete lines in order
    /// 2. Skip (and count) lines that do not decode
    /// 3. Truncate a partial write, or undecodable lines, at the end
    /// 4. Return all valid entries in order
    pub fn recover(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult)> {
        let (entries, result) = Self::scan(path)?;

        if result.was_truncated {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(result.valid_bytes)?;
            file.sync_all()?;
            tracing::warn!(
                path = %path.display(),
                valid_bytes = result.valid_bytes,
                "Truncated torn WAL tail"
            );
        }

        Ok((entries, result))
    }

    /// Verify integrity of a WAL file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        Self::scan(path).map(|(_, result)| result)
    }

    fn scan(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult)> {
        let reader = WalReader::open(path)?;
        let len = reader.len();
        let mut entries = Vec::new();
        let mut result = RecoveryResult::default();
        // Start of the corrupt run since the last good entry, if any
        let mut corrupt_run: Option<u64> = None;

        for line in reader {
            match line {
                WalLine::Entry(entry) => {
                    entries.push(entry);
                    result.entries_recovered += 1;
                    corrupt_run = None;
                }
                WalLine::Corrupt { offset, reason } => {
                    tracing::warn!(offset, %reason, "Skipping corrupt WAL line");
                    result.entries_corrupted += 1;
                    corrupt_run.get_or_insert(offset);
                }
                WalLine::Torn { offset } => {
                    result.was_truncated = true;
                    corrupt_run.get_or_insert(offset);
                }
            }
        }

        // Corrupt lines at the very end are an interrupted append, not history
        match corrupt_run {
            Some(offset) => {
                result.was_truncated = true;
                result.valid_bytes = offset;
            }
            None => result.valid_bytes = len,
        }

        Ok((entries, result))
    }
}
