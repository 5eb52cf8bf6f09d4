//! Multi-value bucket table: construct, init, insert, retrieve, introspection.

use std::mem::size_of;
use std::sync::atomic::{AtomicU32, Ordering};

use rayon::prelude::*;

use crate::device::{Device, HostDevice, MemoryReservation};
use crate::error::TableError;
use crate::hash::Probe;
use crate::status::{Status, StatusWord};

/// Sentinel marking an unoccupied slot. Never a valid key.
pub const EMPTY_KEY: u32 = 0;
/// Sentinel reserved for deleted slots. Never a valid key.
pub const TOMBSTONE_KEY: u32 = u32::MAX;

/// Bulk interface every table configuration exposes to the harness.
///
/// Bulk operations take `&self`: the table lives in device memory and its
/// lanes synchronize through atomics, not through Rust borrows.
pub trait MultiValueTable<D: Device>: Sized + Send + Sync {
    /// Values stored per key slot.
    const BUCKET_WIDTH: usize;
    /// Size of one key element in bytes.
    const KEY_BYTES: usize;
    /// Size of one value element in bytes.
    const VALUE_BYTES: usize;

    /// Device bytes a table constructed with `capacity` slots reserves.
    ///
    /// Equal to `bytes_total()` of that table, so callers can budget before
    /// allocating.
    fn required_bytes(capacity: usize) -> u64;

    /// Allocate a table with `capacity` key slots on `device`.
    fn new(device: &D, capacity: usize) -> Result<Self, TableError>;

    /// Reset to empty, discarding all entries and pending status.
    fn init(&self);

    /// Insert `keys[i] -> values[i]` for every `i`.
    ///
    /// Duplicates accumulate into the key's bucket; values beyond the bucket
    /// width are dropped and raise [`Status::BUCKET_OVERFLOW`].
    fn insert(&self, keys: &[u32], values: &[u32]) -> Result<(), TableError>;

    /// Write the distinct stored keys into `out`. Returns how many were written.
    fn retrieve_all_keys(&self, out: &mut [u32]) -> usize;

    /// Look up every key; values of `keys[i]` land in `out[begin[i]..end[i]]`.
    ///
    /// Returns the total number of values found.
    fn retrieve(
        &self,
        keys: &[u32],
        begin: &mut [usize],
        end: &mut [usize],
        out: &mut [u32],
    ) -> Result<usize, TableError>;

    /// Number of key slots.
    fn capacity(&self) -> usize;

    /// Number of value cells (`capacity * BUCKET_WIDTH`).
    fn value_capacity(&self) -> usize;

    /// Occupied key slots / key slots.
    fn key_load_factor(&self) -> f64;

    /// Stored values / value cells.
    fn value_load_factor(&self) -> f64;

    /// Bytes of live keys and values / total bytes.
    fn storage_density(&self) -> f64;

    /// Bytes a single-value table would need for the stored pairs / total bytes.
    fn relative_storage_density(&self) -> f64;

    /// Device memory held by the table.
    fn bytes_total(&self) -> u64;

    /// Drain the status flags raised since the previous call.
    fn pop_status(&self) -> Status;
}

/// One slot per distinct key, each with a bucket of `W` value cells.
pub struct BucketTable<D: Device, const W: usize> {
    device: D,
    capacity: usize,
    keys: Vec<AtomicU32>,
    fill: Vec<AtomicU32>,
    values: Vec<AtomicU32>,
    status: StatusWord,
    _reservation: MemoryReservation,
}

/// Bucket table running on the host device.
pub type HostBucketTable<const W: usize> = BucketTable<HostDevice, W>;

const KEY_BYTES: usize = size_of::<u32>();
const VALUE_BYTES: usize = size_of::<u32>();
const FILL_BYTES: usize = size_of::<u32>();

#[inline]
fn is_reserved(key: u32) -> bool {
    key == EMPTY_KEY || key == TOMBSTONE_KEY
}

impl<D: Device + Clone, const W: usize> BucketTable<D, W> {
    const NONZERO_WIDTH: () = assert!(W > 0, "bucket width must be at least 1");

    /// Bytes per slot: key, fill counter and `W` value cells.
    pub const SLOT_BYTES: usize = KEY_BYTES + FILL_BYTES + W * VALUE_BYTES;

    /// Device bytes a table with `capacity` slots occupies.
    pub fn bytes_for(capacity: usize) -> u64 {
        capacity.max(1) as u64 * Self::SLOT_BYTES as u64
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    fn atomic_vec(device: &D, len: usize, init: u32) -> Vec<AtomicU32> {
        device.launch(|| (0..len).into_par_iter().map(|_| AtomicU32::new(init)).collect())
    }

    fn insert_one(&self, key: u32, value: u32) {
        if is_reserved(key) {
            self.status.raise(Status::INVALID_KEY);
            return;
        }
        let Some(slot) = self.acquire_slot(key) else {
            self.status.raise(Status::PROBING_LENGTH_EXCEEDED);
            return;
        };
        let idx = self.fill[slot].fetch_add(1, Ordering::AcqRel) as usize;
        if idx < W {
            self.values[slot * W + idx].store(value, Ordering::Relaxed);
        } else {
            self.status.raise(Status::BUCKET_OVERFLOW);
        }
    }

    /// Find the key's slot, claiming an empty one if the key is new.
    fn acquire_slot(&self, key: u32) -> Option<usize> {
        for slot in Probe::new(key, self.capacity) {
            let current = self.keys[slot].load(Ordering::Acquire);
            if current == key {
                return Some(slot);
            }
            if current == EMPTY_KEY {
                match self.keys[slot].compare_exchange(
                    EMPTY_KEY,
                    key,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                ) {
                    Ok(_) => return Some(slot),
                    Err(actual) if actual == key => return Some(slot),
                    Err(_) => continue,
                }
            }
        }
        None
    }

    fn find_slot(&self, key: u32) -> Option<usize> {
        for slot in Probe::new(key, self.capacity) {
            match self.keys[slot].load(Ordering::Acquire) {
                k if k == key => return Some(slot),
                EMPTY_KEY => return None,
                _ => {}
            }
        }
        None
    }

    #[inline]
    fn stored_in(&self, slot: usize) -> usize {
        (self.fill[slot].load(Ordering::Acquire) as usize).min(W)
    }

    fn gather(&self, key: u32) -> (usize, [u32; W]) {
        let mut bucket = [0u32; W];
        if is_reserved(key) {
            self.status.raise(Status::INVALID_KEY);
            return (0, bucket);
        }
        match self.find_slot(key) {
            Some(slot) => {
                let n = self.stored_in(slot);
                for (i, v) in bucket[..n].iter_mut().enumerate() {
                    *v = self.values[slot * W + i].load(Ordering::Relaxed);
                }
                (n, bucket)
            }
            None => {
                self.status.raise(Status::KEY_NOT_FOUND);
                (0, bucket)
            }
        }
    }

    fn occupied_slots(&self) -> usize {
        self.device.launch(|| {
            self.keys
                .par_iter()
                .filter(|k| k.load(Ordering::Relaxed) != EMPTY_KEY)
                .count()
        })
    }

    fn stored_values(&self) -> usize {
        self.device.launch(|| {
            self.fill
                .par_iter()
                .map(|f| (f.load(Ordering::Relaxed) as usize).min(W))
                .sum::<usize>()
        })
    }
}

impl<D: Device + Clone, const W: usize> MultiValueTable<D> for BucketTable<D, W> {
    const BUCKET_WIDTH: usize = W;
    const KEY_BYTES: usize = KEY_BYTES;
    const VALUE_BYTES: usize = VALUE_BYTES;

    fn required_bytes(capacity: usize) -> u64 {
        Self::bytes_for(capacity)
    }

    fn new(device: &D, capacity: usize) -> Result<Self, TableError> {
        let () = Self::NONZERO_WIDTH;
        let capacity = capacity.max(1);
        let reservation = device.reserve(Self::bytes_for(capacity))?;

        let keys = Self::atomic_vec(device, capacity, EMPTY_KEY);
        let fill = Self::atomic_vec(device, capacity, 0);
        let values = Self::atomic_vec(device, capacity * W, 0);

        tracing::trace!(
            capacity,
            bucket_width = W,
            bytes = reservation.bytes(),
            "bucket table allocated"
        );

        Ok(Self {
            device: device.clone(),
            capacity,
            keys,
            fill,
            values,
            status: StatusWord::default(),
            _reservation: reservation,
        })
    }

    fn init(&self) {
        // Value cells keep stale data; reads never look past a slot's fill count.
        self.device.launch(|| {
            self.keys
                .par_iter()
                .for_each(|k| k.store(EMPTY_KEY, Ordering::Relaxed));
            self.fill.par_iter().for_each(|f| f.store(0, Ordering::Relaxed));
        });
        self.status.clear();
    }

    fn insert(&self, keys: &[u32], values: &[u32]) -> Result<(), TableError> {
        if keys.len() != values.len() {
            return Err(TableError::LengthMismatch {
                keys: keys.len(),
                values: values.len(),
            });
        }
        self.device.launch(|| {
            keys.par_iter()
                .zip(values.par_iter())
                .for_each(|(&k, &v)| self.insert_one(k, v));
        });
        Ok(())
    }

    fn retrieve_all_keys(&self, out: &mut [u32]) -> usize {
        let found: Vec<u32> = self.device.launch(|| {
            self.keys
                .par_iter()
                .map(|k| k.load(Ordering::Relaxed))
                .filter(|&k| k != EMPTY_KEY)
                .collect()
        });
        let n = found.len().min(out.len());
        out[..n].copy_from_slice(&found[..n]);
        if found.len() > out.len() {
            self.status.raise(Status::INDEX_OVERFLOW);
        }
        n
    }

    fn retrieve(
        &self,
        keys: &[u32],
        begin: &mut [usize],
        end: &mut [usize],
        out: &mut [u32],
    ) -> Result<usize, TableError> {
        let n = keys.len();
        if begin.len() < n || end.len() < n {
            return Err(TableError::LengthMismatch {
                keys: n,
                values: begin.len().min(end.len()),
            });
        }

        let buckets: Vec<(usize, [u32; W])> =
            self.device.launch(|| keys.par_iter().map(|&k| self.gather(k)).collect());

        let mut offset = 0;
        for (i, (count, _)) in buckets.iter().enumerate() {
            begin[i] = offset;
            offset += count;
            end[i] = offset;
        }

        // Offsets are monotone, so the keys whose values fit form a prefix.
        let fitting = end[..n].partition_point(|&e| e <= out.len());
        if fitting < n {
            self.status.raise(Status::INDEX_OVERFLOW);
        }

        let mut chunks: Vec<&mut [u32]> = Vec::with_capacity(fitting);
        let mut rest: &mut [u32] = out;
        for (count, _) in &buckets[..fitting] {
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(*count);
            chunks.push(head);
            rest = tail;
        }
        self.device.launch(|| {
            chunks
                .into_par_iter()
                .zip(buckets[..fitting].par_iter())
                .for_each(|(dst, (count, bucket))| dst.copy_from_slice(&bucket[..*count]));
        });

        Ok(offset)
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn value_capacity(&self) -> usize {
        self.capacity * W
    }

    fn key_load_factor(&self) -> f64 {
        self.occupied_slots() as f64 / self.capacity as f64
    }

    fn value_load_factor(&self) -> f64 {
        self.stored_values() as f64 / self.value_capacity() as f64
    }

    fn storage_density(&self) -> f64 {
        let live = self.occupied_slots() * KEY_BYTES + self.stored_values() * VALUE_BYTES;
        live as f64 / self.bytes_total() as f64
    }

    fn relative_storage_density(&self) -> f64 {
        let single_value = self.stored_values() * (KEY_BYTES + VALUE_BYTES);
        single_value as f64 / self.bytes_total() as f64
    }

    fn bytes_total(&self) -> u64 {
        Self::bytes_for(self.capacity)
    }

    fn pop_status(&self) -> Status {
        self.status.take()
    }
}
