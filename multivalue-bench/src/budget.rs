//! Memory budget validator: decides up front whether the worst-case sweep
//! point fits in the device's free memory.
//!
//! The check runs once per sweep, at the largest dataset size and the smallest
//! load factor. Every other point needs no more memory than that one, so a
//! pass admits the whole sweep and a failure rejects it outright.

use std::mem::size_of;

use multivalue_hashtable::{Device, MultiValueTable};

use crate::capacity;
use crate::error::BenchError;

/// Safety multiplier applied to the estimated footprint.
pub const DEFAULT_HEADROOM: f64 = 1.1;

/// Bytes of one retrieve offset (begin or end).
pub const OFFSET_BYTES: u64 = size_of::<usize>() as u64;

/// Device bytes for one sweep point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footprint {
    /// What the table reserves at the capacity planned for the point.
    pub table_bytes: u64,
    /// Input, output and offset staging buffers for `size` elements.
    pub staging_bytes: u64,
}

impl Footprint {
    /// Footprint of table type `T` at `(size, load)`.
    ///
    /// The table part is the table's own raw footprint at the planned capacity,
    /// so key, value and any per-slot bookkeeping are all counted.
    pub fn for_table<T, D>(size: usize, load: f64) -> Self
    where
        T: MultiValueTable<D>,
        D: Device,
    {
        let slots = capacity::plan_for::<T, D>(size, load);
        Self {
            table_bytes: T::required_bytes(slots),
            staging_bytes: staging_bytes(T::KEY_BYTES, T::VALUE_BYTES, size),
        }
    }

    pub fn total(&self) -> u64 {
        self.table_bytes + self.staging_bytes
    }

    /// Total scaled by `headroom`, rounded up.
    pub fn with_headroom(&self, headroom: f64) -> u64 {
        (self.total() as f64 * headroom).ceil() as u64
    }
}

/// Staging buffers for `size` elements.
///
/// Input keys and values, the realized key set, the retrieved values, and a
/// begin/end offset pair per queried key.
pub fn staging_bytes(key_bytes: usize, value_bytes: usize, size: usize) -> u64 {
    let size = size as u64;
    let inputs = size * (key_bytes + value_bytes) as u64;
    let outputs = size * (key_bytes + value_bytes) as u64;
    let offsets = size * 2 * OFFSET_BYTES;
    inputs + outputs + offsets
}

/// Bytes required, with headroom, to run table type `T` at the given point.
pub fn required_bytes<T, D>(size: usize, load: f64, headroom: f64) -> u64
where
    T: MultiValueTable<D>,
    D: Device,
{
    Footprint::for_table::<T, D>(size, load).with_headroom(headroom)
}

/// Whether `required` bytes fit in the device's currently free memory.
pub fn fits<D: Device>(device: &D, required: u64) -> bool {
    required <= device.free_memory()
}

/// [`fits`] as a pre-flight check for the worst-case point `(size, load)`.
/// Returns `required` on success.
pub fn check<D: Device>(
    device: &D,
    required: u64,
    size: usize,
    load: f64,
) -> Result<u64, BenchError> {
    let free = device.free_memory();

    tracing::info!(
        device = device.id(),
        size,
        load,
        required,
        free,
        "memory budget check"
    );

    if fits(device, required) {
        Ok(required)
    } else {
        Err(BenchError::InsufficientMemory {
            required,
            free,
            size,
            load,
        })
    }
}
