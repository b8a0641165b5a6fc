//! Engine Tests
//!
//! Tests verify:
//! - set/get through memtable and segments
//! - Flush trigger at the byte threshold
//! - Overwrites never trigger a flush
//! - Merge and rebuilds through the engine
//! - Runtime reconfiguration
//! - Concurrent readers

use std::fs;
use std::sync::Arc;
use std::thread;

use lsmkv::value::record_size;
use lsmkv::{Config, Engine, LsmError, Value};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn text(s: &str) -> Value {
    Value::new("text/plain", "utf-8", s.as_bytes().to_vec())
}

fn key(i: usize) -> Vec<u8> {
    format!("key{:04}", i).into_bytes()
}

fn open(dir: &TempDir, threshold: usize) -> Engine {
    let config = Config::builder()
        .segments_dir(dir.path())
        .flush_threshold(threshold)
        .sparsity_factor(4)
        .filter_expected_items(1000)
        .filter_false_positive_rate(0.01)
        .build();
    Engine::open(config).unwrap()
}

fn wal_len(engine: &Engine) -> u64 {
    fs::metadata(engine.wal_path()).unwrap().len()
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_open_creates_directory_and_snapshot() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("nested").join("data");

    let engine = Engine::open(Config::builder().segments_dir(&dir).build()).unwrap();

    assert!(dir.is_dir());
    assert!(engine.snapshot_path().is_file());
    assert!(engine.wal_path().is_file());
    assert_eq!(engine.current_segment_name(), "segment-1");
    assert!(engine.segments().is_empty());
}

#[test]
fn test_open_path_uses_defaults() {
    let temp = TempDir::new().unwrap();

    let engine = Engine::open_path(temp.path()).unwrap();

    assert_eq!(engine.segments_dir(), temp.path());
    assert_eq!(engine.threshold(), 1_000_000);
    assert_eq!(engine.sparsity(), 10_000);
    assert_eq!(engine.wal_path(), temp.path().join("wal.log"));
    assert_eq!(engine.snapshot_path(), temp.path().join("database_state"));
    assert_eq!(engine.config().segment_basename, "segment");
}

#[test]
fn test_open_rejects_invalid_config() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder()
        .segments_dir(temp.path())
        .flush_threshold(0)
        .build();

    assert!(matches!(Engine::open(config), Err(LsmError::Config(_))));
}

#[test]
fn test_get_from_memtable_before_flush() {
    let temp = TempDir::new().unwrap();
    let engine = open(&temp, 1_000_000);
    let value = Value::new("text/plain", "utf-8", vec![0xDE, 0xAD, 0xBE, 0xEF]);

    assert!(engine.set(&[0x01], value.clone()));

    assert_eq!(engine.get(&[0x01]).unwrap(), Some(value));
    assert!(engine.segments().is_empty());
}

#[test]
fn test_get_missing_key() {
    let temp = TempDir::new().unwrap();
    let engine = open(&temp, 1_000_000);

    assert_eq!(engine.get(b"nope").unwrap(), None);
}

#[test]
fn test_latest_write_wins_in_memtable() {
    let temp = TempDir::new().unwrap();
    let engine = open(&temp, 1_000_000);

    engine.set(b"k", text("one"));
    engine.set(b"k", text("two"));

    assert_eq!(engine.get(b"k").unwrap(), Some(text("two")));
    assert_eq!(engine.memtable_len(), 1);
}

#[test]
fn test_empty_key_and_payload() {
    let temp = TempDir::new().unwrap();
    let engine = open(&temp, 1_000_000);
    let empty = Value::new("", "", Vec::new());

    assert!(engine.set(b"", empty.clone()));
    engine.flush().unwrap();

    assert_eq!(engine.get(b"").unwrap(), Some(empty));
}

// =============================================================================
// Flush Trigger Tests
// =============================================================================

#[test]
fn test_three_small_records_cause_exactly_one_flush() {
    let temp = TempDir::new().unwrap();
    let size = record_size(b"k1", &text("v")).unwrap();
    // Room for two records but not three
    let engine = open(&temp, size * 2 + size / 2);

    engine.set(b"k1", text("v"));
    engine.set(b"k2", text("v"));
    assert!(engine.segments().is_empty());

    engine.set(b"k3", text("v"));

    assert_eq!(engine.segment_names(), vec!["segment-1".to_string()]);
    assert_eq!(engine.segments()[0].record_count, 2);
    let segment_files = fs::read_dir(temp.path())
        .unwrap()
        .filter(|e| {
            e.as_ref()
                .unwrap()
                .file_name()
                .to_string_lossy()
                .starts_with("segment-")
        })
        .count();
    assert_eq!(segment_files, 1);

    // The WAL was cleared by the flush and now holds only k3
    let wal = fs::read_to_string(engine.wal_path()).unwrap();
    assert_eq!(wal.lines().count(), 1);
    assert!(wal.starts_with(&hex::encode(b"k3")));
    assert_eq!(engine.memtable_len(), 1);

    for k in [&b"k1"[..], b"k2", b"k3"] {
        assert_eq!(engine.get(k).unwrap(), Some(text("v")));
    }
}

#[test]
fn test_threshold_boundary_is_inclusive() {
    let temp = TempDir::new().unwrap();
    let size = record_size(b"k1", &text("v")).unwrap();
    let engine = open(&temp, size * 2);

    engine.set(b"k1", text("v"));
    engine.set(b"k2", text("v"));

    // Exactly at the threshold: no flush yet
    assert!(engine.segments().is_empty());
    assert_eq!(engine.memtable_bytes(), size * 2);

    engine.set(b"k3", text("v"));
    assert_eq!(engine.segments().len(), 1);
}

#[test]
fn test_overwrite_never_flushes() {
    let temp = TempDir::new().unwrap();
    let size = record_size(b"k1", &text("v")).unwrap();
    let engine = open(&temp, size * 2);

    engine.set(b"k1", text("v"));
    engine.set(b"k2", text("v"));
    // Growing an existing key past the threshold does not flush
    engine.set(b"k2", text("a considerably longer value"));

    assert!(engine.segments().is_empty());
    assert!(engine.memtable_bytes() > engine.threshold());
}

#[test]
fn test_oversized_record_on_empty_memtable() {
    let temp = TempDir::new().unwrap();
    let engine = open(&temp, 10);

    assert!(engine.set(b"big", text("far larger than ten bytes")));
    assert!(engine.segments().is_empty());

    assert!(engine.set(b"next", text("x")));
    assert_eq!(engine.segments().len(), 1);
    assert_eq!(engine.get(b"big").unwrap(), Some(text("far larger than ten bytes")));
}

#[test]
fn test_flush_on_demand() {
    let temp = TempDir::new().unwrap();
    let engine = open(&temp, 1_000_000);

    assert!(engine.flush().unwrap().is_none());

    engine.set(b"a", text("1"));
    engine.set(b"b", text("2"));
    let meta = engine.flush().unwrap().unwrap();

    assert_eq!(meta.name, "segment-1");
    assert_eq!(meta.record_count, 2);
    assert_eq!(wal_len(&engine), 0);
    assert_eq!(engine.memtable_len(), 0);
    assert_eq!(engine.memtable_bytes(), 0);
    assert_eq!(engine.current_segment_name(), "segment-2");
    assert_eq!(engine.get(b"a").unwrap(), Some(text("1")));
}

// =============================================================================
// Read Path Tests
// =============================================================================

#[test]
fn test_memtable_shadows_segments() {
    let temp = TempDir::new().unwrap();
    let engine = open(&temp, 1_000_000);

    engine.set(b"k", text("old"));
    engine.flush().unwrap();
    engine.set(b"k", text("new"));

    assert_eq!(engine.get(b"k").unwrap(), Some(text("new")));
}

#[test]
fn test_many_flushes_every_key_readable() {
    let temp = TempDir::new().unwrap();
    let size = record_size(&key(0), &text("value-0000")).unwrap();
    let engine = open(&temp, size * 7);

    for i in 0..100 {
        assert!(engine.set(&key(i), text(&format!("value-{:04}", i))));
    }
    // Rewrite some keys so older segments hold stale values
    for i in (0..100).step_by(3) {
        assert!(engine.set(&key(i), text(&format!("fresh-{:04}", i))));
    }

    assert!(engine.segments().len() > 10);
    for i in 0..100 {
        let expected = if i % 3 == 0 {
            format!("fresh-{:04}", i)
        } else {
            format!("value-{:04}", i)
        };
        assert_eq!(engine.get(&key(i)).unwrap(), Some(text(&expected)), "key {}", i);
    }
    engine.check_invariants().unwrap();
}

#[test]
fn test_filter_covers_flushed_keys_only() {
    let temp = TempDir::new().unwrap();
    let engine = open(&temp, 1_000_000);

    engine.set(b"flushed", text("1"));
    engine.flush().unwrap();
    for i in 0..20 {
        engine.set(&key(i), text("2"));
    }

    assert!(engine.filter_check(b"flushed"));
    // At a 1% target, twenty unflushed keys cannot all be false positives
    assert!((0..20).any(|i| !engine.filter_check(&key(i))));
    assert_eq!(engine.get(&key(3)).unwrap(), Some(text("2")));
}

// =============================================================================
// Merge Tests
// =============================================================================

#[test]
fn test_merge_through_engine() {
    let temp = TempDir::new().unwrap();
    let engine = open(&temp, 1_000_000);

    engine.set(&[0xAA], text("v1"));
    engine.flush().unwrap();
    engine.set(&[0xAA], text("v2"));
    engine.set(&[0xBB], text("b"));
    engine.flush().unwrap();

    let meta = engine.merge("segment-1", "segment-2").unwrap();

    assert_eq!(meta.record_count, 2);
    assert_eq!(engine.segment_names(), vec!["segment-1".to_string()]);
    assert!(!temp.path().join("segment-2").exists());
    assert_eq!(engine.get(&[0xAA]).unwrap(), Some(text("v2")));
    assert_eq!(engine.get(&[0xBB]).unwrap(), Some(text("b")));

    // Next flush keeps counting from where it was
    engine.set(b"c", text("c"));
    assert_eq!(engine.flush().unwrap().unwrap().name, "segment-3");
}

#[test]
fn test_merge_errors_leave_state_untouched() {
    let temp = TempDir::new().unwrap();
    let engine = open(&temp, 1_000_000);
    engine.set(b"a", text("1"));
    engine.flush().unwrap();

    assert!(matches!(
        engine.merge("segment-1", "segment-5"),
        Err(LsmError::UnknownSegment(_))
    ));
    assert_eq!(engine.segment_names(), vec!["segment-1".to_string()]);
    assert_eq!(engine.get(b"a").unwrap(), Some(text("1")));
}

// =============================================================================
// Reconfiguration Tests
// =============================================================================

#[test]
fn test_set_threshold_changes_sparsity() {
    let temp = TempDir::new().unwrap();
    let engine = open(&temp, 400);
    assert_eq!(engine.sparsity(), 100);

    engine.set_threshold(40).unwrap();
    assert_eq!(engine.threshold(), 40);
    assert_eq!(engine.sparsity(), 10);

    engine.set_sparsity_factor(40).unwrap();
    assert_eq!(engine.sparsity(), 1);

    assert!(matches!(engine.set_threshold(0), Err(LsmError::Config(_))));
    assert!(matches!(engine.set_sparsity_factor(0), Err(LsmError::Config(_))));
}

#[test]
fn test_repopulate_index_after_sparsity_change() {
    let temp = TempDir::new().unwrap();
    let engine = open(&temp, 1_000_000);
    for i in 0..20 {
        engine.set(&key(i), text("v"));
    }
    engine.flush().unwrap();
    let before = engine.sparse_index_len();

    engine.set_sparsity_factor(1_000_000).unwrap();
    engine.repopulate_index().unwrap();

    assert_eq!(before, 1);
    assert_eq!(engine.sparse_index_len(), 20);
    assert_eq!(engine.get(&key(17)).unwrap(), Some(text("v")));
}

#[test]
fn test_filter_reconfiguration_requires_repopulate() {
    let temp = TempDir::new().unwrap();
    let engine = open(&temp, 1_000_000);
    engine.set(b"a", text("1"));
    engine.flush().unwrap();

    engine.set_filter_false_positive_rate(0.001).unwrap();
    assert!(!engine.filter_check(b"a"));
    assert_eq!(engine.get(b"a").unwrap(), None);

    engine.repopulate_filter().unwrap();
    assert!(engine.filter_check(b"a"));
    assert_eq!(engine.get(b"a").unwrap(), Some(text("1")));

    engine.set_filter_expected_items(50).unwrap();
    assert!(!engine.filter_check(b"a"));
    assert!(matches!(
        engine.set_filter_false_positive_rate(1.5),
        Err(LsmError::Config(_))
    ));
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_set_reports_failure_as_false() {
    let temp = TempDir::new().unwrap();
    let size = record_size(b"a", &text("1")).unwrap();
    let engine = open(&temp, size);
    engine.set(b"a", text("1"));

    // A directory in place of the next segment file makes the flush fail
    fs::create_dir(temp.path().join("segment-1")).unwrap();

    assert!(!engine.set(b"b", text("2")));
    assert!(matches!(engine.try_set(b"b", text("2")), Err(LsmError::Io(_))));
    // Nothing was lost or half-applied
    assert_eq!(engine.get(b"a").unwrap(), Some(text("1")));
    assert_eq!(engine.get(b"b").unwrap(), None);
    assert!(engine.segments().is_empty());
}

#[test]
fn test_missing_segment_on_index_path_is_error() {
    let temp = TempDir::new().unwrap();
    let engine = open(&temp, 1_000_000);
    for i in 0..10 {
        engine.set(&key(i), text("v"));
    }
    engine.flush().unwrap();

    fs::remove_file(temp.path().join("segment-1")).unwrap();

    // Sparse index points at the missing file
    assert!(matches!(engine.get(&key(5)), Err(LsmError::Io(_))));
}

#[test]
fn test_missing_segment_on_full_search_is_error() {
    let temp = TempDir::new().unwrap();
    let engine = open(&temp, 1_000_000);
    for i in (0..20).step_by(2) {
        engine.set(&key(i), text("even"));
    }
    engine.flush().unwrap();
    for i in (1..20).step_by(2) {
        engine.set(&key(i), text("odd"));
    }
    engine.flush().unwrap();

    fs::remove_file(temp.path().join("segment-1")).unwrap();

    // floor(key4) is key1 in segment-2, which does not hold key4, so the
    // lookup falls through to searching segment-1
    assert_eq!(engine.get(&key(5)).unwrap(), Some(text("odd")));
    assert!(matches!(engine.get(&key(4)), Err(LsmError::Io(_))));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_readers_and_writer() {
    let temp = TempDir::new().unwrap();
    let size = record_size(&key(0), &text("v")).unwrap();
    let engine = Arc::new(open(&temp, size * 10));
    for i in 0..50 {
        engine.set(&key(i), text("v"));
    }

    let writer = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for i in 50..150 {
                assert!(engine.set(&key(i), text("v")));
            }
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..50 {
                    assert_eq!(engine.get(&key(i)).unwrap(), Some(text("v")));
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }
    for i in 0..150 {
        assert_eq!(engine.get(&key(i)).unwrap(), Some(text("v")));
    }
}
