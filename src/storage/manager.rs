//! Segment Store
//!
//! Manages the segment files and the structures that describe them.
//!
//! ## Responsibilities
//! - Flush a memtable into the current segment and rotate the name
//! - Keep the sparse index and membership filter in step with flushes
//! - Point lookups over flushed data
//! - Merge two adjacent segments, rebuild the index and persist the result
//!
//! ## Lookup Order
//! 1. Membership filter: a negative answer is final
//! 2. Sparse index floor entry: scan forward inside that segment
//! 3. Every segment newest → oldest, halving search inside each
//!
//! Step 2's hit is only returned when no newer segment's key range covers
//! the key; otherwise step 3 decides, so the newest record always wins.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{LsmError, Result};
use crate::filter::CountingBloomFilter;
use crate::memtable::MemTable;
use crate::snapshot::EngineSnapshot;
use crate::value::Value;

use super::index::SparseIndex;
use super::merge::merge_segments;
use super::segment::{SegmentBuilder, SegmentMeta, SegmentReader};

/// Owns everything about flushed data
pub struct SegmentStore {
    /// Directory where segments are stored
    dir: PathBuf,

    /// Flushed segments, ordered oldest → newest
    segments: Vec<SegmentMeta>,

    /// Name the next flush writes to
    current_segment: String,

    /// Sampled key → (segment, offset)
    index: SparseIndex,

    /// Covers every key in `segments`
    filter: CountingBloomFilter,

    /// Records between two sparse index samples
    sparsity: usize,
}

impl SegmentStore {
    /// Start with no segments; the first flush writes `<basename>-1`
    pub fn new(
        dir: &Path,
        segment_basename: &str,
        sparsity: usize,
        filter: CountingBloomFilter,
    ) -> Self {
        Self {
            dir: dir.to_path_buf(),
            segments: Vec::new(),
            current_segment: format!("{}-1", segment_basename),
            index: SparseIndex::new(),
            filter,
            sparsity: sparsity.max(1),
        }
    }

    /// Restore from a persisted snapshot. Every listed segment must exist.
    pub fn from_snapshot(dir: &Path, snapshot: EngineSnapshot, sparsity: usize) -> Result<Self> {
        for meta in &snapshot.segments {
            let path = dir.join(&meta.name);
            if !path.is_file() {
                return Err(LsmError::corruption(
                    "snapshot",
                    format!("segment {} is listed but {} is missing", meta.name, path.display()),
                ));
            }
        }
        next_segment_name(&snapshot.current_segment_name)?;

        Ok(Self {
            dir: dir.to_path_buf(),
            segments: snapshot.segments,
            current_segment: snapshot.current_segment_name,
            index: SparseIndex::from_entries(snapshot.sparse_index),
            filter: snapshot.filter_state,
            sparsity: sparsity.max(1),
        })
    }

    /// Capture the persistent state
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            current_segment_name: self.current_segment.clone(),
            segments: self.segments.clone(),
            filter_state: self.filter.clone(),
            sparse_index: self.index.entries(),
        }
    }

    // =========================================================================
    // Flush
    // =========================================================================

    /// Write the memtable to the current segment and move on to the next name.
    ///
    /// Every key goes into the filter; every `sparsity`-th record (starting
    /// with the first) goes into the sparse index.
    pub fn flush(&mut self, memtable: &MemTable) -> Result<SegmentMeta> {
        if memtable.is_empty() {
            return Err(LsmError::InvariantViolation(
                "cannot flush an empty memtable".to_string(),
            ));
        }

        let name = self.current_segment.clone();
        let next_name = next_segment_name(&name)?;
        let path = self.segment_path(&name);

        let mut builder = SegmentBuilder::new(&path, &name)?;
        let mut samples = Vec::new();
        for (i, (key, value)) in memtable.iter().enumerate() {
            let offset = builder.add(key, value)?;
            if i % self.sparsity == 0 {
                samples.push((key.to_vec(), offset));
            }
            self.filter.add(key);
        }
        let meta = builder.finish()?;

        // The file is durable; publish it
        for (key, offset) in samples {
            self.index.insert(key, &name, offset);
        }
        self.segments.push(meta.clone());
        self.current_segment = next_name;

        tracing::info!(
            segment = %meta.name,
            records = meta.record_count,
            bytes = meta.size_bytes,
            "Flushed memtable to segment"
        );

        Ok(meta)
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Look a key up in flushed data. `Ok(None)` means not found.
    pub fn get(&self, key: &[u8]) -> Result<Option<Value>> {
        if !self.filter.check(key) {
            tracing::debug!(key = %hex::encode(key), "Filter rejected key");
            return Ok(None);
        }

        if let Some(value) = self.get_via_index(key)? {
            return Ok(Some(value));
        }

        self.search_all(key)
    }

    /// Sparse index path: floor entry, then a forward scan in its segment
    fn get_via_index(&self, key: &[u8]) -> Result<Option<Value>> {
        let entry = match self.index.floor(key) {
            Some((_, entry)) => entry,
            None => return Ok(None),
        };
        let pos = match self.position(&entry.segment) {
            Some(pos) => pos,
            None => return Ok(None),
        };

        let meta = &self.segments[pos];
        if !meta.might_contain(key) {
            return Ok(None);
        }

        let reader = SegmentReader::open(&self.segment_path(&meta.name), &meta.name)?;
        let value = match reader.scan_from(entry.offset, key)? {
            Some(value) => value,
            None => return Ok(None),
        };

        if self.segments[pos + 1..].iter().any(|s| s.might_contain(key)) {
            // A newer segment may shadow this record
            return Ok(None);
        }

        tracing::debug!(key = %hex::encode(key), segment = %meta.name, "Found via sparse index");
        Ok(Some(value))
    }

    /// Search every segment newest → oldest; the first match wins
    fn search_all(&self, key: &[u8]) -> Result<Option<Value>> {
        for meta in self.segments.iter().rev() {
            // Skip segment if key is outside its range
            if !meta.might_contain(key) {
                continue;
            }

            let reader = SegmentReader::open(&self.segment_path(&meta.name), &meta.name)?;
            if let Some(value) = reader.search(key)? {
                tracing::debug!(key = %hex::encode(key), segment = %meta.name, "Found via segment search");
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    // =========================================================================
    // Compaction
    // =========================================================================

    /// Merge `newer` into `older`. They must be adjacent, `older` first.
    ///
    /// The result replaces `older`'s file and keeps its name and position.
    /// The sparse index is rebuilt and the snapshot saved to `snapshot_path`
    /// before `newer`'s file is deleted, so a snapshot on disk never lists a
    /// file that is gone.
    pub fn merge(
        &mut self,
        older: &str,
        newer: &str,
        snapshot_path: &Path,
    ) -> Result<SegmentMeta> {
        let pa = self
            .position(older)
            .ok_or_else(|| LsmError::UnknownSegment(older.to_string()))?;
        let pb = self
            .position(newer)
            .ok_or_else(|| LsmError::UnknownSegment(newer.to_string()))?;
        if pb != pa + 1 {
            return Err(LsmError::Compaction(format!(
                "{} must directly follow {} in the segment list",
                newer, older
            )));
        }

        let path_a = self.segment_path(older);
        let path_b = self.segment_path(newer);
        let tmp_path = self.dir.join(format!("{}.merge.tmp", older));

        let reader_a = SegmentReader::open(&path_a, older)?;
        let reader_b = SegmentReader::open(&path_b, newer)?;
        let meta = match merge_segments(&reader_a, &reader_b, &tmp_path, older) {
            Ok(meta) => meta,
            Err(e) => {
                let _ = fs::remove_file(&tmp_path);
                return Err(e);
            }
        };

        // From here until the snapshot is saved, the old snapshot still
        // describes a readable directory: `newer` holds every record it did
        fs::rename(&tmp_path, &path_a)?;

        self.segments[pa] = meta.clone();
        self.segments.remove(pb);
        self.repopulate_index()?;
        self.snapshot().save(snapshot_path)?;

        // Unlisted now; a leftover file is ignored on open
        if let Err(e) = fs::remove_file(&path_b) {
            tracing::warn!(segment = %newer, error = %e, "Failed to delete merged segment file");
        }

        tracing::info!(
            into = %older,
            removed = %newer,
            records = meta.record_count,
            "Merged segments"
        );

        Ok(meta)
    }

    // =========================================================================
    // Rebuilds
    // =========================================================================

    /// Discard the sparse index and rebuild it from every segment
    pub fn repopulate_index(&mut self) -> Result<()> {
        let mut index = SparseIndex::new();
        for meta in &self.segments {
            let reader = SegmentReader::open(&self.segment_path(&meta.name), &meta.name)?;
            for (i, line) in reader.iter()?.enumerate() {
                let line = line?;
                if i % self.sparsity == 0 {
                    index.insert(line.key, &meta.name, line.offset);
                }
            }
        }

        tracing::info!(entries = index.len(), "Rebuilt sparse index");
        self.index = index;
        Ok(())
    }

    /// Add every flushed key to the current filter
    pub fn repopulate_filter(&mut self) -> Result<()> {
        let mut keys = 0u64;
        for meta in &self.segments {
            let reader = SegmentReader::open(&self.segment_path(&meta.name), &meta.name)?;
            for line in reader.iter()? {
                self.filter.add(&line?.key);
                keys += 1;
            }
        }

        tracing::info!(keys, "Repopulated membership filter");
        Ok(())
    }

    /// Swap in an empty filter with new parameters. Flushed keys are no
    /// longer covered until [`SegmentStore::repopulate_filter`] runs.
    pub fn reset_filter(&mut self, expected_items: usize, false_positive_rate: f64) -> Result<()> {
        self.filter = CountingBloomFilter::new(expected_items, false_positive_rate)?;
        Ok(())
    }

    /// Change the sampling interval used by later flushes and rebuilds
    pub fn set_sparsity(&mut self, sparsity: usize) {
        self.sparsity = sparsity.max(1);
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn segments(&self) -> &[SegmentMeta] {
        &self.segments
    }

    pub fn current_segment(&self) -> &str {
        &self.current_segment
    }

    pub fn index(&self) -> &SparseIndex {
        &self.index
    }

    pub fn filter(&self) -> &CountingBloomFilter {
        &self.filter
    }

    pub fn sparsity(&self) -> usize {
        self.sparsity
    }

    /// Path of a segment by name
    pub fn segment_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.segments.iter().position(|s| s.name == name)
    }
}

/// `segment-7` → `segment-8`
pub fn next_segment_name(name: &str) -> Result<String> {
    let (base, number) = name.rsplit_once('-').ok_or_else(|| {
        LsmError::corruption("segment name", format!("{:?} has no numeric suffix", name))
    })?;
    let number: u64 = number.parse().map_err(|_| {
        LsmError::corruption("segment name", format!("{:?} has no numeric suffix", name))
    })?;
    Ok(format!("{}-{}", base, number + 1))
}
