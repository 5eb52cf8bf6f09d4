//! Lock-free multi-value hash table driven through an explicit device context.
//!
//! Every key owns one slot holding a fixed-width bucket of values. The bucket
//! width is a const generic, so each width is its own monomorphised layout:
//! - **W = 1**: one value per key, duplicates beyond the first are dropped
//! - **W = 8**: up to eight values per key stored contiguously
//!
//! Bulk operations are dispatched onto a [`Device`]. [`HostDevice`] runs them on
//! a dedicated rayon pool and accounts every table allocation against a fixed
//! memory budget, so callers can ask how much "device" memory is free.
//!
//! # Quick Start
//!
//! ```no_run
//! use multivalue_hashtable::{BucketTable, HostDevice, MultiValueTable};
//!
//! let device = HostDevice::new(0, 1 << 30).unwrap();
//! let table = BucketTable::<HostDevice, 4>::new(&device, 1024).unwrap();
//!
//! let keys = vec![7u32, 7, 7, 9];
//! let values = vec![1u32, 2, 3, 4];
//! table.insert(&keys, &values).unwrap();
//!
//! let mut begin = vec![0usize; 1];
//! let mut end = vec![0usize; 1];
//! let mut out = vec![0u32; 4];
//! table.retrieve(&[7], &mut begin, &mut end, &mut out).unwrap();
//! assert_eq!(end[0] - begin[0], 3);
//! ```

pub mod device;
pub mod error;
pub mod hash;
pub mod status;
pub mod table;

pub use device::{Device, DeviceEvent, HostDevice, MemoryPool, MemoryReservation};
pub use error::TableError;
pub use status::Status;
pub use table::{BucketTable, HostBucketTable, MultiValueTable, EMPTY_KEY, TOMBSTONE_KEY};
