//! Counting Bloom Filter Tests
//!
//! These tests verify:
//! - Sizing from expected items and target rate
//! - No false negatives
//! - Observed false-positive rate near the target
//! - Parameter validation

use lsmkv::filter::CountingBloomFilter;
use lsmkv::LsmError;

#[test]
fn test_sizing_formula() {
    let filter = CountingBloomFilter::new(1000, 0.01).unwrap();

    // m = ceil(-1000 * ln(0.01) / ln(2)^2) = 9586, k = round(9.586 * ln 2) = 7
    assert_eq!(filter.size(), 9586);
    assert_eq!(filter.hash_count(), 7);
    assert_eq!(filter.expected_items(), 1000);
    assert_eq!(filter.false_positive_rate(), 0.01);
}

#[test]
fn test_tiny_filter_has_at_least_one_hash() {
    let filter = CountingBloomFilter::new(1, 0.9).unwrap();
    assert!(filter.size() >= 1);
    assert!(filter.hash_count() >= 1);
}

#[test]
fn test_new_filter_is_empty() {
    let filter = CountingBloomFilter::new(100, 0.1).unwrap();
    assert!(filter.is_empty());
    assert!(!filter.check(b"anything"));
}

#[test]
fn test_no_false_negatives() {
    let mut filter = CountingBloomFilter::new(1000, 0.01).unwrap();
    for i in 0u32..1000 {
        filter.add(format!("key-{}", i).as_bytes());
    }

    for i in 0u32..1000 {
        assert!(filter.check(format!("key-{}", i).as_bytes()), "lost key-{}", i);
    }
}

#[test]
fn test_false_positive_rate_within_tolerance() {
    let mut filter = CountingBloomFilter::new(1000, 0.01).unwrap();
    for i in 0u32..1000 {
        filter.add(format!("present-{}", i).as_bytes());
    }

    let probes = 10_000;
    let false_positives = (0..probes)
        .filter(|i| filter.check(format!("absent-{}", i).as_bytes()))
        .count();
    let rate = false_positives as f64 / probes as f64;

    assert!(rate < 0.03, "false positive rate {} too high", rate);
}

#[test]
fn test_counters_saturate() {
    let mut filter = CountingBloomFilter::new(10, 0.1).unwrap();
    for _ in 0..1000 {
        filter.add(b"hot");
    }
    assert!(filter.check(b"hot"));
}

#[test]
fn test_clone_is_independent() {
    let mut filter = CountingBloomFilter::new(100, 0.05).unwrap();
    filter.add(b"a");
    let snapshot = filter.clone();
    filter.add(b"b");

    assert!(snapshot.check(b"a"));
    assert_ne!(snapshot, filter);
}

#[test]
fn test_invalid_parameters() {
    assert!(matches!(CountingBloomFilter::new(0, 0.1), Err(LsmError::Config(_))));
    assert!(matches!(CountingBloomFilter::new(10, 0.0), Err(LsmError::Config(_))));
    assert!(matches!(CountingBloomFilter::new(10, 1.0), Err(LsmError::Config(_))));
    assert!(matches!(CountingBloomFilter::new(10, f64::NAN), Err(LsmError::Config(_))));
}
