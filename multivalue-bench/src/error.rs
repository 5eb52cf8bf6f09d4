use std::path::PathBuf;

use multivalue_hashtable::TableError;

/// Failures that stop a sweep before or while it runs.
///
/// `CorpusTooSmall` and `InsufficientMemory` are the pre-flight checks: the
/// harness never starts a sweep that either of them rejects.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error("requested dataset size {requested} exceeds key corpus length {available}")]
    CorpusTooSmall { requested: usize, available: usize },
    #[error(
        "insufficient device memory: {required} bytes required at size {size} / load {load}, {free} bytes free"
    )]
    InsufficientMemory {
        required: u64,
        free: u64,
        size: usize,
        load: f64,
    },
    #[error("invalid sweep configuration: {0}")]
    Config(String),
    #[error("failed to read key corpus {}: {source}", path.display())]
    CorpusIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("key corpus {} is {len} bytes, not a whole number of 4-byte keys", path.display())]
    CorpusFormat { path: PathBuf, len: usize },
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("failed to write measurement record: {0}")]
    Output(#[from] std::io::Error),
    #[error("failed to write report {path}: {reason}")]
    Report { path: String, reason: String },
}
