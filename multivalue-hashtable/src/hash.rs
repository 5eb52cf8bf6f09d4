//! Key hashing and the probing sequence over slot indices.

/// MurmurHash3 32-bit finalizer.
#[inline]
pub fn murmur3_fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

/// Linear probing sequence starting at the key's home slot.
///
/// Visits every slot of a table with `capacity` slots exactly once.
#[derive(Debug, Clone)]
pub struct Probe {
    next: usize,
    capacity: usize,
    remaining: usize,
}

impl Probe {
    pub fn new(key: u32, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            next: murmur3_fmix32(key) as usize % capacity,
            capacity,
            remaining: capacity,
        }
    }
}

impl Iterator for Probe {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let slot = self.next;
        self.next += 1;
        if self.next == self.capacity {
            self.next = 0;
        }
        Some(slot)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}
