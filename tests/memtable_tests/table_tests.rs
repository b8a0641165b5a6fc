//! MemTable Tests
//!
//! Tests verify:
//! - Basic put/get operations
//! - Exact size tracking across inserts, overwrites and removals
//! - Sorted iteration

use lsmkv::memtable::MemTable;
use lsmkv::value::record_size;
use lsmkv::Value;

fn text(s: &str) -> Value {
    Value::new("text/plain", "utf-8", s.as_bytes().to_vec())
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_new_memtable_is_empty() {
    let memtable = MemTable::new();
    assert_eq!(memtable.entry_count(), 0);
    assert_eq!(memtable.size(), 0);
    assert!(memtable.is_empty());
}

#[test]
fn test_put_and_get() {
    let mut memtable = MemTable::new();

    assert!(memtable.put(b"key1".to_vec(), text("value1")).unwrap());

    assert_eq!(memtable.get(b"key1"), Some(&text("value1")));
    assert!(memtable.get(b"nonexistent").is_none());
}

#[test]
fn test_put_overwrites_existing() {
    let mut memtable = MemTable::new();

    memtable.put(b"key1".to_vec(), text("a")).unwrap();
    let was_new = memtable.put(b"key1".to_vec(), text("b")).unwrap();

    assert!(!was_new);
    assert_eq!(memtable.entry_count(), 1);
    assert_eq!(memtable.get(b"key1"), Some(&text("b")));
}

// =============================================================================
// Size Tracking Tests
// =============================================================================

#[test]
fn test_size_is_key_plus_json() {
    let mut memtable = MemTable::new();
    let v1 = text("value1");
    let v2 = text("v2");

    memtable.put(b"k1".to_vec(), v1.clone()).unwrap();
    memtable.put(b"key2".to_vec(), v2.clone()).unwrap();

    let expected = record_size(b"k1", &v1).unwrap() + record_size(b"key2", &v2).unwrap();
    assert_eq!(memtable.size(), expected);
}

#[test]
fn test_overwrite_adjusts_size_by_delta() {
    let mut memtable = MemTable::new();
    let small = text("x");
    let large = text("a much longer value than before");

    memtable.put(b"k".to_vec(), small.clone()).unwrap();
    memtable.put(b"k".to_vec(), large.clone()).unwrap();
    assert_eq!(memtable.size(), record_size(b"k", &large).unwrap());

    memtable.put(b"k".to_vec(), small.clone()).unwrap();
    assert_eq!(memtable.size(), record_size(b"k", &small).unwrap());
}

#[test]
fn test_remove_releases_size() {
    let mut memtable = MemTable::new();
    memtable.put(b"a".to_vec(), text("1")).unwrap();
    memtable.put(b"b".to_vec(), text("2")).unwrap();

    let removed = memtable.remove(b"a").unwrap();

    assert_eq!(removed, Some(text("1")));
    assert_eq!(memtable.size(), record_size(b"b", &text("2")).unwrap());
    assert_eq!(memtable.remove(b"a").unwrap(), None);
    memtable.check_invariants().unwrap();
}

// =============================================================================
// Iteration Tests
// =============================================================================

#[test]
fn test_iter_sorted_order() {
    let mut memtable = MemTable::new();
    for key in [&b"zebra"[..], b"apple", b"mango", b"banana"] {
        memtable.put(key.to_vec(), text("v")).unwrap();
    }

    let keys: Vec<&[u8]> = memtable.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec![&b"apple"[..], b"banana", b"mango", b"zebra"]);
}

#[test]
fn test_many_inserts_keep_invariants() {
    let mut memtable = MemTable::new();
    for i in (0u32..500).rev() {
        memtable.put(i.to_be_bytes().to_vec(), text(&i.to_string())).unwrap();
    }
    memtable.check_invariants().unwrap();
    assert_eq!(memtable.entry_count(), 500);
}
