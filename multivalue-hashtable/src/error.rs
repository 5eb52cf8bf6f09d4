/// Errors raised by table construction and bulk operations.
///
/// Per-entry problems (full buckets, reserved keys, missing keys) are not
/// errors: they are accumulated as [`crate::Status`] flags on the table.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("out of device memory: requested {requested} bytes, {free} bytes free")]
    OutOfMemory { requested: u64, free: u64 },
    #[error("failed to start device {id}: {reason}")]
    DeviceInit { id: usize, reason: String },
    #[error("length mismatch: keys={keys}, values={values}")]
    LengthMismatch { keys: usize, values: usize },
}
