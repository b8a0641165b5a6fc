//! Engine Module
//!
//! The core storage engine that coordinates all components.
//!
//! ## Responsibilities
//! - Coordinate WAL, MemTable and the segment store
//! - Own the flush-and-rotate transition
//! - Persist the snapshot after every flush and merge
//! - Replay the WAL on startup

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::config::Config;
use crate::error::{LsmError, Result};
use crate::filter::CountingBloomFilter;
use crate::memtable::MemTable;
use crate::snapshot::{EngineSnapshot, SNAPSHOT_FILENAME};
use crate::storage::{SegmentMeta, SegmentStore};
use crate::value::{record_size, Value};
use crate::wal::{WalEntry, WalRecovery, WalWriter};

/// The main storage engine
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader
///
/// All state sits behind one `RwLock`:
/// - **Writes** (set/flush/merge/rebuilds) hold the write lock for the whole
///   operation, so "check threshold → flush-and-rotate → WAL append →
///   memtable insert" is never interleaved with another writer.
/// - **Reads** (get) share the read lock. Segment files are immutable, and a
///   merge (which replaces files) holds the write lock, so no reader scans a
///   file while it is being swapped.
pub struct Engine {
    /// Engine configuration (as opened)
    config: Config,

    /// Path of the snapshot file
    snapshot_path: PathBuf,

    /// Path of the WAL file
    wal_path: PathBuf,

    state: RwLock<EngineState>,
}

struct EngineState {
    /// Pending writes, mirrored exactly by `wal`
    memtable: MemTable,

    /// Write-ahead log for the current memtable generation
    wal: WalWriter,

    /// Flushed segments, sparse index and filter
    store: SegmentStore,

    /// Flush threshold in bytes
    threshold: usize,

    sparsity_factor: usize,
}

impl EngineState {
    fn sparsity(&self) -> usize {
        (self.threshold / self.sparsity_factor).max(1)
    }

    /// Write the memtable to a new segment, persist the snapshot, then start
    /// a fresh memtable/WAL generation. No-op on an empty memtable.
    fn flush_and_rotate(&mut self, snapshot_path: &Path) -> Result<Option<SegmentMeta>> {
        if self.memtable.is_empty() {
            return Ok(None);
        }

        let meta = self.store.flush(&self.memtable)?;
        self.store.snapshot().save(snapshot_path)?;

        // The records are durable in the segment; only now may the WAL forget them
        self.wal.reset()?;
        self.memtable = MemTable::new();

        Ok(Some(meta))
    }
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Validate config and create the segments directory
    /// 2. Load the snapshot, or create and persist an empty one
    /// 3. Replay the WAL into a fresh memtable
    /// 4. Ready to serve requests
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        // Step 1: Create data directory if it doesn't exist
        fs::create_dir_all(&config.segments_dir)?;
        let snapshot_path = config.segments_dir.join(SNAPSHOT_FILENAME);
        let wal_path = config.segments_dir.join(&config.wal_basename);

        // Step 2: Snapshot
        let store = match EngineSnapshot::load(&snapshot_path)? {
            Some(snapshot) => {
                tracing::info!(
                    segments = snapshot.segments.len(),
                    current = %snapshot.current_segment_name,
                    "Loaded engine snapshot"
                );
                SegmentStore::from_snapshot(&config.segments_dir, snapshot, config.sparsity())?
            }
            None => {
                let filter = CountingBloomFilter::new(
                    config.filter_expected_items,
                    config.filter_false_positive_rate,
                )?;
                let store = SegmentStore::new(
                    &config.segments_dir,
                    &config.segment_basename,
                    config.sparsity(),
                    filter,
                );
                store.snapshot().save(&snapshot_path)?;
                tracing::info!(dir = %config.segments_dir.display(), "Initialized empty engine");
                store
            }
        };

        // Step 3: Replay the WAL. Later records for a key overwrite earlier ones.
        let (entries, recovery) = WalRecovery::recover(&wal_path)?;
        let mut memtable = MemTable::new();
        for entry in entries {
            memtable.put(entry.key, entry.value)?;
        }
        if recovery.entries_recovered > 0 || recovery.entries_corrupted > 0 {
            tracing::info!(
                recovered = recovery.entries_recovered,
                corrupted = recovery.entries_corrupted,
                truncated = recovery.was_truncated,
                keys = memtable.entry_count(),
                "WAL replayed"
            );
        }

        let wal = WalWriter::open(&wal_path)?;

        Ok(Self {
            snapshot_path,
            wal_path,
            state: RwLock::new(EngineState {
                memtable,
                wal,
                store,
                threshold: config.flush_threshold,
                sparsity_factor: config.sparsity_factor,
            }),
            config,
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified segments directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().segments_dir(path).build())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get a value by key
    ///
    /// Search order:
    /// 1. MemTable (freshest data)
    /// 2. Membership filter (negative = not found)
    /// 3. Sparse index floor entry + forward scan
    /// 4. Every segment, newest to oldest
    ///
    /// `Ok(None)` means not found; I/O and corruption failures are errors.
    pub fn get(&self, key: &[u8]) -> Result<Option<Value>> {
        let state = self.state.read();

        if let Some(value) = state.memtable.get(key) {
            tracing::debug!(key = %hex::encode(key), "Found in memtable");
            return Ok(Some(value.clone()));
        }

        state.store.get(key)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Set a key. Returns `false` on any internal failure, which is logged.
    pub fn set(&self, key: &[u8], value: Value) -> bool {
        match self.try_set(key, value) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(key = %hex::encode(key), error = %e, "set failed");
                false
            }
        }
    }

    /// Set a key, reporting failures as errors
    ///
    /// Steps:
    /// 1. Existing key: WAL append, overwrite in place (never flushes)
    /// 2. New key that would push the memtable past the threshold:
    ///    flush-and-rotate first
    /// 3. WAL append (durable once this returns)
    /// 4. MemTable insert
    pub fn try_set(&self, key: &[u8], value: Value) -> Result<()> {
        let mut state = self.state.write();
        let entry = WalEntry::new(key.to_vec(), value);

        if !state.memtable.contains_key(key) {
            let additional = record_size(key, &entry.value)?;
            if state.memtable.size() + additional > state.threshold {
                state.flush_and_rotate(&self.snapshot_path)?;
            }
        }

        state.wal.append(&entry)?;
        state.memtable.put(entry.key, entry.value)?;
        Ok(())
    }

    /// Flush memtable to a segment regardless of its size
    ///
    /// Returns the new segment, or `None` if the memtable was empty.
    pub fn flush(&self) -> Result<Option<SegmentMeta>> {
        let mut state = self.state.write();
        state.flush_and_rotate(&self.snapshot_path)
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Merge segment `newer` into `older` and persist the result
    pub fn merge(&self, older: &str, newer: &str) -> Result<SegmentMeta> {
        let mut state = self.state.write();
        state.store.merge(older, newer, &self.snapshot_path)
    }

    /// Rebuild the sparse index from every segment and persist it
    pub fn repopulate_index(&self) -> Result<()> {
        let mut state = self.state.write();
        state.store.repopulate_index()?;
        state.store.snapshot().save(&self.snapshot_path)
    }

    /// Re-add every flushed key to the filter and persist it
    pub fn repopulate_filter(&self) -> Result<()> {
        let mut state = self.state.write();
        state.store.repopulate_filter()?;
        state.store.snapshot().save(&self.snapshot_path)
    }

    /// Change the flush threshold (also changes the sampling interval)
    pub fn set_threshold(&self, bytes: usize) -> Result<()> {
        if bytes == 0 {
            return Err(LsmError::Config("flush_threshold must be > 0".to_string()));
        }
        let mut state = self.state.write();
        state.threshold = bytes;
        let sparsity = state.sparsity();
        state.store.set_sparsity(sparsity);
        Ok(())
    }

    /// Change the sparsity factor used by later flushes and index rebuilds
    pub fn set_sparsity_factor(&self, factor: usize) -> Result<()> {
        if factor == 0 {
            return Err(LsmError::Config("sparsity_factor must be > 0".to_string()));
        }
        let mut state = self.state.write();
        state.sparsity_factor = factor;
        let sparsity = state.sparsity();
        state.store.set_sparsity(sparsity);
        Ok(())
    }

    /// Replace the filter with an empty one sized for `items`.
    ///
    /// Flushed keys read as absent until [`Engine::repopulate_filter`] runs.
    pub fn set_filter_expected_items(&self, items: usize) -> Result<()> {
        let mut state = self.state.write();
        let rate = state.store.filter().false_positive_rate();
        state.store.reset_filter(items, rate)
    }

    /// Replace the filter with an empty one targeting `rate`.
    ///
    /// Flushed keys read as absent until [`Engine::repopulate_filter`] runs.
    pub fn set_filter_false_positive_rate(&self, rate: f64) -> Result<()> {
        let mut state = self.state.write();
        let items = state.store.filter().expected_items();
        state.store.reset_filter(items, rate)
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the segments directory path
    pub fn segments_dir(&self) -> &Path {
        &self.config.segments_dir
    }

    pub fn wal_path(&self) -> &Path {
        &self.wal_path
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Flushed segments, oldest first
    pub fn segments(&self) -> Vec<SegmentMeta> {
        self.state.read().store.segments().to_vec()
    }

    /// Names of flushed segments, oldest first
    pub fn segment_names(&self) -> Vec<String> {
        self.state
            .read()
            .store
            .segments()
            .iter()
            .map(|s| s.name.clone())
            .collect()
    }

    /// Name the next flush will write to
    pub fn current_segment_name(&self) -> String {
        self.state.read().store.current_segment().to_string()
    }

    /// Current memtable footprint in bytes
    pub fn memtable_bytes(&self) -> usize {
        self.state.read().memtable.size()
    }

    /// Get the memtable entry count
    pub fn memtable_len(&self) -> usize {
        self.state.read().memtable.entry_count()
    }

    pub fn sparse_index_len(&self) -> usize {
        self.state.read().store.index().len()
    }

    /// Ask the membership filter about a key
    pub fn filter_check(&self, key: &[u8]) -> bool {
        self.state.read().store.filter().check(key)
    }

    pub fn threshold(&self) -> usize {
        self.state.read().threshold
    }

    pub fn sparsity(&self) -> usize {
        self.state.read().store.sparsity()
    }

    /// Verify the memtable's red-black invariants
    pub fn check_invariants(&self) -> Result<()> {
        self.state.read().memtable.check_invariants()
    }

    /// Get the configuration the engine was opened with
    pub fn config(&self) -> &Config {
        &self.config
    }
}
