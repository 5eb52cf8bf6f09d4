//! Correctness tests for the bucket table contract.

use std::collections::HashSet;

use multivalue_hashtable::{
    HostBucketTable, HostDevice, MultiValueTable, Status, TableError, EMPTY_KEY, TOMBSTONE_KEY,
};
use rand::Rng;

const BUDGET: u64 = 1 << 30;

fn device() -> HostDevice {
    HostDevice::new(0, BUDGET).expect("host device")
}

/// Generate N unique random keys (no duplicates, no sentinels).
fn unique_keys(n: usize) -> Vec<u32> {
    let mut rng = rand::thread_rng();
    let mut keys = HashSet::with_capacity(n);
    while keys.len() < n {
        let k: u32 = rng.gen();
        if k != EMPTY_KEY && k != TOMBSTONE_KEY {
            keys.insert(k);
        }
    }
    keys.into_iter().collect()
}

/// Retrieve `keys` and return the value list of each key, sorted.
fn lookup<T: MultiValueTable<HostDevice>>(table: &T, keys: &[u32]) -> Vec<Vec<u32>> {
    let mut begin = vec![0usize; keys.len()];
    let mut end = vec![0usize; keys.len()];
    let mut out = vec![0u32; keys.len() * T::BUCKET_WIDTH];
    table
        .retrieve(keys, &mut begin, &mut end, &mut out)
        .expect("retrieve");
    (0..keys.len())
        .map(|i| {
            let mut vals = out[begin[i]..end[i]].to_vec();
            vals.sort_unstable();
            vals
        })
        .collect()
}

// ─── Every unique key is found with its value ──

fn test_unique_keys_found<T: MultiValueTable<HostDevice>>() {
    let n = 10_000;
    let keys = unique_keys(n);
    let values: Vec<u32> = (0..n as u32).collect();

    let table = T::new(&device(), n * 2).unwrap();
    table.insert(&keys, &values).unwrap();
    let found = lookup(&table, &keys);

    for i in 0..n {
        assert_eq!(
            found[i],
            vec![values[i]],
            "W={}: key {} -> expected [{}], got {:?}",
            T::BUCKET_WIDTH,
            keys[i],
            values[i],
            found[i]
        );
    }
    assert!(table.pop_status().is_empty());
}

#[test]
fn w1_unique_keys_found() {
    test_unique_keys_found::<HostBucketTable<1>>();
}

#[test]
fn w4_unique_keys_found() {
    test_unique_keys_found::<HostBucketTable<4>>();
}

#[test]
fn w8_unique_keys_found() {
    test_unique_keys_found::<HostBucketTable<8>>();
}

// ─── Duplicates fill the bucket, then overflow ──

#[test]
fn w4_duplicates_accumulate() {
    let table = HostBucketTable::<4>::new(&device(), 64).unwrap();
    table.insert(&[5, 5, 5, 9], &[1, 2, 3, 4]).unwrap();

    assert_eq!(lookup(&table, &[5, 9]), vec![vec![1, 2, 3], vec![4]]);
    assert!(table.pop_status().is_empty());
}

#[test]
fn w2_excess_duplicates_dropped() {
    let table = HostBucketTable::<2>::new(&device(), 64).unwrap();
    table.insert(&[5, 5, 5, 5], &[1, 2, 3, 4]).unwrap();

    let found = lookup(&table, &[5]);
    assert_eq!(found[0].len(), 2, "bucket holds exactly W values");
    assert!(table.pop_status().contains(Status::BUCKET_OVERFLOW));
    assert!(table.pop_status().is_empty(), "pop_status clears on read");

    assert_eq!(table.key_load_factor(), 1.0 / 64.0);
    assert_eq!(table.value_load_factor(), 2.0 / 128.0);
}

// ─── Capacity exhaustion is a status, not an error ──

#[test]
fn w1_capacity_exceeded_sets_status() {
    let table = HostBucketTable::<1>::new(&device(), 8).unwrap();
    let keys: Vec<u32> = (1..=16).collect();
    table.insert(&keys, &keys).unwrap();

    assert!(table.pop_status().contains(Status::PROBING_LENGTH_EXCEEDED));
    assert_eq!(table.key_load_factor(), 1.0);
}

// ─── Reserved keys are rejected ──

#[test]
fn reserved_keys_rejected() {
    let table = HostBucketTable::<1>::new(&device(), 16).unwrap();
    table.insert(&[EMPTY_KEY, TOMBSTONE_KEY, 3], &[1, 2, 3]).unwrap();

    assert!(table.pop_status().contains(Status::INVALID_KEY));
    assert_eq!(table.key_load_factor(), 1.0 / 16.0);
}

// ─── Missing keys produce empty ranges ──

#[test]
fn missing_keys_empty_range() {
    let table = HostBucketTable::<4>::new(&device(), 64).unwrap();
    table.insert(&[1, 2, 3], &[10, 20, 30]).unwrap();

    let found = lookup(&table, &[4, 2, 5]);
    assert!(found[0].is_empty());
    assert_eq!(found[1], vec![20]);
    assert!(found[2].is_empty());
    assert!(table.pop_status().contains(Status::KEY_NOT_FOUND));
}

// ─── Retrieve offsets form a compressed list ──

#[test]
fn retrieve_offsets_are_contiguous() {
    let table = HostBucketTable::<8>::new(&device(), 64).unwrap();
    let keys = [1u32, 1, 2, 3, 3, 3];
    table.insert(&keys, &[0, 1, 2, 3, 4, 5]).unwrap();

    let query = [3u32, 1, 2];
    let mut begin = [0usize; 3];
    let mut end = [0usize; 3];
    let mut out = [0u32; 6];
    let total = table.retrieve(&query, &mut begin, &mut end, &mut out).unwrap();

    assert_eq!(total, 6);
    assert_eq!(begin, [0, 3, 5]);
    assert_eq!(end, [3, 5, 6]);
}

#[test]
fn retrieve_small_output_sets_index_overflow() {
    let table = HostBucketTable::<4>::new(&device(), 64).unwrap();
    table.insert(&[1, 1, 2, 2], &[1, 2, 3, 4]).unwrap();

    let mut begin = [0usize; 2];
    let mut end = [0usize; 2];
    let mut out = [0u32; 3];
    let total = table
        .retrieve(&[1, 2], &mut begin, &mut end, &mut out)
        .unwrap();

    assert_eq!(total, 4);
    assert_eq!(end, [2, 4]);
    assert!(table.pop_status().contains(Status::INDEX_OVERFLOW));
}

#[test]
fn retrieve_rejects_short_offset_buffers() {
    let table = HostBucketTable::<1>::new(&device(), 16).unwrap();
    let mut begin = [0usize; 1];
    let mut end = [0usize; 2];
    let mut out = [0u32; 2];
    let result = table.retrieve(&[1, 2], &mut begin, &mut end, &mut out);
    assert!(matches!(result, Err(TableError::LengthMismatch { .. })));
}

#[test]
fn insert_rejects_length_mismatch() {
    let table = HostBucketTable::<1>::new(&device(), 16).unwrap();
    let result = table.insert(&[1, 2, 3], &[1]);
    assert!(matches!(
        result,
        Err(TableError::LengthMismatch { keys: 3, values: 1 })
    ));
}

// ─── Distinct key extraction ──

#[test]
fn retrieve_all_keys_returns_distinct_set() {
    let table = HostBucketTable::<2>::new(&device(), 128).unwrap();
    let keys: Vec<u32> = (0..100).map(|i| i % 25 + 1).collect();
    table.insert(&keys, &keys).unwrap();

    let mut out = vec![0u32; 100];
    let n = table.retrieve_all_keys(&mut out);
    let mut realized = out[..n].to_vec();
    realized.sort_unstable();

    assert_eq!(realized, (1..=25).collect::<Vec<u32>>());
}

#[test]
fn retrieve_all_keys_truncates_to_buffer() {
    let table = HostBucketTable::<1>::new(&device(), 64).unwrap();
    let keys: Vec<u32> = (1..=10).collect();
    table.insert(&keys, &keys).unwrap();

    let mut out = [0u32; 4];
    assert_eq!(table.retrieve_all_keys(&mut out), 4);
    assert!(table.pop_status().contains(Status::INDEX_OVERFLOW));
}

// ─── Init resets the table ──

fn test_init<T: MultiValueTable<HostDevice>>() {
    let keys = vec![1u32, 2, 3];
    let values = vec![10u32, 20, 30];

    let table = T::new(&device(), 64).unwrap();
    table.insert(&keys, &values).unwrap();
    assert_eq!(table.key_load_factor(), 3.0 / 64.0);

    table.init();
    assert_eq!(table.key_load_factor(), 0.0);
    assert_eq!(table.value_load_factor(), 0.0);
    assert!(lookup(&table, &keys).iter().all(|v| v.is_empty()));
}

#[test]
fn w1_init() {
    test_init::<HostBucketTable<1>>();
}

#[test]
fn w8_init() {
    test_init::<HostBucketTable<8>>();
}

// A refilled bucket reports only the values inserted since init.
fn test_reinsert_after_init<T: MultiValueTable<HostDevice>>() {
    let full = vec![1u32; T::BUCKET_WIDTH];
    let old: Vec<u32> = (100..100 + T::BUCKET_WIDTH as u32).collect();

    let table = T::new(&device(), 16).unwrap();
    table.insert(&full, &old).unwrap();
    assert_eq!(lookup(&table, &[1]), vec![old]);

    table.init();
    table.insert(&[1], &[7]).unwrap();
    assert_eq!(lookup(&table, &[1]), vec![vec![7]]);
    assert!(table.pop_status().is_empty());
}

#[test]
fn w1_reinsert_after_init() {
    test_reinsert_after_init::<HostBucketTable<1>>();
}

#[test]
fn w8_reinsert_after_init() {
    test_reinsert_after_init::<HostBucketTable<8>>();
}

// ─── Introspection ──

#[test]
fn densities_follow_stored_bytes() {
    let table = HostBucketTable::<2>::new(&device(), 10).unwrap();
    // 3 keys, 5 stored values (one duplicate dropped).
    table
        .insert(&[1, 1, 1, 2, 2, 3], &[0, 1, 2, 3, 4, 5])
        .unwrap();

    let bytes = table.bytes_total() as f64;
    assert_eq!(table.bytes_total(), 10 * 16);
    assert_eq!(table.value_capacity(), 20);
    assert!((table.storage_density() - (3.0 * 4.0 + 5.0 * 4.0) / bytes).abs() < 1e-12);
    assert!((table.relative_storage_density() - 5.0 * 8.0 / bytes).abs() < 1e-12);
}

// ─── Large-scale test ──

#[test]
fn w8_large_scale_duplicate_groups() {
    let distinct = 50_000u32;
    let keys: Vec<u32> = (0..distinct * 8).map(|i| i % distinct + 1).collect();
    let values: Vec<u32> = (0..keys.len() as u32).collect();

    let table = HostBucketTable::<8>::new(&device(), distinct as usize * 2).unwrap();
    table.insert(&keys, &values).unwrap();

    assert!(table.pop_status().is_empty(), "groups of 8 fit one bucket");
    assert_eq!(table.key_load_factor(), 0.5);
    assert_eq!(table.value_load_factor(), 0.5);

    let sample: Vec<u32> = (1..=distinct).step_by(997).collect();
    for (key, vals) in sample.iter().zip(lookup(&table, &sample)) {
        let expected: Vec<u32> = (0..8).map(|j| key - 1 + j * distinct).collect();
        assert_eq!(vals, expected, "key {key}");
    }
}
