//! Device context: bulk launches, memory accounting, event timestamps.
//!
//! Nothing here is process-global. A [`Device`] handle is passed to every
//! table and every measurement, so tests can substitute a device that reports
//! synthetic free memory or scripted timestamps.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::TableError;

/// Execution and memory context for bulk table operations.
pub trait Device: Send + Sync {
    /// Ordinal of this device.
    fn id(&self) -> usize;

    /// Human-readable device name.
    fn name(&self) -> String;

    /// Total memory the device exposes, in bytes.
    fn total_memory(&self) -> u64;

    /// Memory currently free for new allocations, in bytes.
    fn free_memory(&self) -> u64;

    /// Account `bytes` of device memory. Released when the reservation drops.
    fn reserve(&self, bytes: u64) -> Result<MemoryReservation, TableError>;

    /// Run one bulk parallel operation and block until it has drained.
    fn launch<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send;

    /// Record a timestamp marker in the device's stream.
    fn record_event(&self) -> DeviceEvent;

    /// Wait until all previously launched work has completed.
    fn synchronize(&self);

    /// Milliseconds between two recorded events. Never negative.
    fn elapsed_ms(&self, start: &DeviceEvent, stop: &DeviceEvent) -> f64 {
        stop.nanos_since(start) as f64 / 1_000_000.0
    }
}

/// A timestamp marker, in nanoseconds since the device's epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DeviceEvent {
    nanos: u64,
}

impl DeviceEvent {
    pub fn from_nanos(nanos: u64) -> Self {
        Self { nanos }
    }

    pub fn nanos(&self) -> u64 {
        self.nanos
    }

    /// Nanoseconds from `earlier` to `self`, saturating at zero.
    pub fn nanos_since(&self, earlier: &DeviceEvent) -> u64 {
        self.nanos.saturating_sub(earlier.nanos)
    }
}

// ─── Memory accounting ──────────────────────────────────────────

/// Fixed-size memory budget with live allocation tracking.
///
/// Cloning shares the same accounting.
#[derive(Debug, Clone)]
pub struct MemoryPool {
    budget: u64,
    allocated: Arc<AtomicU64>,
}

impl MemoryPool {
    pub fn new(budget: u64) -> Self {
        Self {
            budget,
            allocated: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }

    pub fn allocated(&self) -> u64 {
        self.allocated.load(Ordering::Acquire)
    }

    pub fn free(&self) -> u64 {
        self.budget.saturating_sub(self.allocated())
    }

    /// Reserve `bytes`, failing if the budget would be exceeded.
    pub fn reserve(&self, bytes: u64) -> Result<MemoryReservation, TableError> {
        let mut current = self.allocated.load(Ordering::Acquire);
        loop {
            let next = current
                .checked_add(bytes)
                .filter(|&n| n <= self.budget)
                .ok_or(TableError::OutOfMemory {
                    requested: bytes,
                    free: self.budget.saturating_sub(current),
                })?;
            match self.allocated.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    return Ok(MemoryReservation {
                        bytes,
                        allocated: Arc::clone(&self.allocated),
                    })
                }
                Err(actual) => current = actual,
            }
        }
    }
}

/// Bytes held against a [`MemoryPool`]; returned on drop.
#[derive(Debug)]
pub struct MemoryReservation {
    bytes: u64,
    allocated: Arc<AtomicU64>,
}

impl MemoryReservation {
    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

impl Drop for MemoryReservation {
    fn drop(&mut self) {
        self.allocated.fetch_sub(self.bytes, Ordering::AcqRel);
    }
}

// ─── Host device ────────────────────────────────────────────────

/// Host-resident device: a dedicated rayon pool plus an accounted memory budget.
///
/// Cheap to clone; clones share the pool, the budget and the epoch.
#[derive(Clone)]
pub struct HostDevice {
    id: usize,
    pool: Arc<ThreadPool>,
    memory: MemoryPool,
    epoch: Instant,
}

impl HostDevice {
    /// Start device `id` with `memory_budget` bytes of accountable memory.
    pub fn new(id: usize, memory_budget: u64) -> Result<Self, TableError> {
        let pool = ThreadPoolBuilder::new()
            .thread_name(move |lane| format!("device{id}-lane{lane}"))
            .build()
            .map_err(|e| TableError::DeviceInit {
                id,
                reason: e.to_string(),
            })?;

        tracing::debug!(
            device = id,
            lanes = pool.current_num_threads(),
            memory_budget,
            "host device started"
        );

        Ok(Self {
            id,
            pool: Arc::new(pool),
            memory: MemoryPool::new(memory_budget),
            epoch: Instant::now(),
        })
    }

    /// Number of parallel execution lanes.
    pub fn lanes(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn memory(&self) -> &MemoryPool {
        &self.memory
    }
}

impl std::fmt::Debug for HostDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostDevice")
            .field("id", &self.id)
            .field("lanes", &self.lanes())
            .field("memory", &self.memory)
            .finish()
    }
}

impl Device for HostDevice {
    fn id(&self) -> usize {
        self.id
    }

    fn name(&self) -> String {
        format!("host{} ({} lanes)", self.id, self.lanes())
    }

    fn total_memory(&self) -> u64 {
        self.memory.budget()
    }

    fn free_memory(&self) -> u64 {
        self.memory.free()
    }

    fn reserve(&self, bytes: u64) -> Result<MemoryReservation, TableError> {
        self.memory.reserve(bytes)
    }

    fn launch<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }

    fn record_event(&self) -> DeviceEvent {
        DeviceEvent::from_nanos(self.epoch.elapsed().as_nanos() as u64)
    }

    // `launch` only returns once the pool has drained the operation.
    fn synchronize(&self) {}
}
