//! Measurement harness for multi-value hash table configurations.
//!
//! Sweeps dataset size x target load factor for each bucket width, measuring
//! bulk insert and bulk retrieve throughput (fastest of N trials) alongside the
//! table's load and storage-density introspection. Each sweep point becomes one
//! line on stdout, labeled (`name=value`) or positional.
//!
//! Two pre-flight checks guard a sweep: the key corpus must cover the largest
//! dataset size, and the worst-case point must fit in device memory.

pub mod budget;
pub mod capacity;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod error;
pub mod output;
pub mod report;
pub mod sweep;
pub mod trial;

pub use config::SweepConfig;
pub use error::BenchError;
pub use report::{MeasurementRecord, Reporter, RowFormat};
pub use sweep::{preflight, run_configuration, run_sweep, worst_case_bytes, SweepPoint};
pub use trial::{run_trials, TrialPolicy, TrialSeries};
