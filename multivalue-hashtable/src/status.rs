//! Status flags accumulated by bulk table operations.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Serialize, Serializer};

/// Bit set of conditions raised since the last `pop_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Status(u32);

impl Status {
    pub const NONE: Status = Status(0);
    /// A value was dropped because its key's bucket was already full.
    pub const BUCKET_OVERFLOW: Status = Status(1 << 0);
    /// No free slot was found within the probing bound.
    pub const PROBING_LENGTH_EXCEEDED: Status = Status(1 << 1);
    /// A key equal to a reserved sentinel was submitted.
    pub const INVALID_KEY: Status = Status(1 << 2);
    /// A queried key is not stored in the table.
    pub const KEY_NOT_FOUND: Status = Status(1 << 3);
    /// An output buffer was too small for the result.
    pub const INDEX_OVERFLOW: Status = Status(1 << 4);

    const NAMES: [(Status, &'static str); 5] = [
        (Status::BUCKET_OVERFLOW, "bucket_overflow"),
        (Status::PROBING_LENGTH_EXCEEDED, "probing_length_exceeded"),
        (Status::INVALID_KEY, "invalid_key"),
        (Status::KEY_NOT_FOUND, "key_not_found"),
        (Status::INDEX_OVERFLOW, "index_overflow"),
    ];

    pub const fn from_bits(bits: u32) -> Self {
        Status(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Status) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Status {
    type Output = Status;

    fn bitor(self, rhs: Status) -> Status {
        Status(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for Status {
    fn bitor_assign(&mut self, rhs: Status) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }
        let mut first = true;
        for (flag, name) in Self::NAMES {
            if self.contains(flag) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        let unknown = self.0 & !Self::NAMES.iter().fold(0, |acc, (s, _)| acc | s.0);
        if unknown != 0 {
            if !first {
                write!(f, "|")?;
            }
            write!(f, "{unknown:#x}")?;
        }
        Ok(())
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Atomic status word shared by all lanes of a bulk operation.
#[derive(Debug, Default)]
pub(crate) struct StatusWord(AtomicU32);

impl StatusWord {
    pub(crate) fn raise(&self, status: Status) {
        self.0.fetch_or(status.bits(), Ordering::Relaxed);
    }

    pub(crate) fn take(&self) -> Status {
        Status(self.0.swap(0, Ordering::AcqRel))
    }

    pub(crate) fn clear(&self) {
        self.0.store(0, Ordering::Release);
    }
}
