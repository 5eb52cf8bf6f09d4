//! Capacity planner: key-slot count for a dataset size, load factor and bucket width.
//!
//! A bucket of `w` values shares one key, so a wide table spends fewer bytes
//! per stored value than a single-value one. The correction factor
//! `(k + v) / (k + v * w)` scales the naive `size / load` slot count so that
//! every width gets the same byte budget per stored value.

use multivalue_hashtable::{Device, MultiValueTable};

/// `(key_bytes + value_bytes) / (key_bytes + value_bytes * bucket_width)`.
pub fn correction_factor(key_bytes: usize, value_bytes: usize, bucket_width: usize) -> f64 {
    (key_bytes + value_bytes) as f64 / (key_bytes + value_bytes * bucket_width) as f64
}

/// Unrounded slot count: `size * factor / load`.
pub fn raw_capacity(
    size: usize,
    load: f64,
    key_bytes: usize,
    value_bytes: usize,
    bucket_width: usize,
) -> f64 {
    size as f64 * correction_factor(key_bytes, value_bytes, bucket_width) / load
}

/// Slot count to construct the table with; at least one slot.
pub fn plan_capacity(
    size: usize,
    load: f64,
    key_bytes: usize,
    value_bytes: usize,
    bucket_width: usize,
) -> usize {
    (raw_capacity(size, load, key_bytes, value_bytes, bucket_width).ceil() as usize).max(1)
}

/// [`plan_capacity`] using the element sizes and width of table type `T`.
pub fn plan_for<T, D>(size: usize, load: f64) -> usize
where
    T: MultiValueTable<D>,
    D: Device,
{
    plan_capacity(size, load, T::KEY_BYTES, T::VALUE_BYTES, T::BUCKET_WIDTH)
}
