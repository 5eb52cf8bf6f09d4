//! Sweep driver: runs every (size, load) point for one table configuration.
//!
//! For each point:
//! 1. plan the slot count and construct the table
//! 2. insert trials, table re-initialized before each one
//! 3. read back the realized key set
//! 4. retrieve trials over the realized keys
//! 5. capture introspection, emit one record
//!
//! [`preflight`] runs before any of this and rejects sweeps the corpus or the
//! device memory cannot support.

use std::io::Write;

use serde::{Deserialize, Serialize};

use multivalue_hashtable::{Device, MultiValueTable};

use crate::budget;
use crate::capacity;
use crate::config::SweepConfig;
use crate::error::BenchError;
use crate::report::{Introspection, MeasurementRecord, Reporter};
use crate::trial::run_trials;

/// One point of the sweep grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub size: usize,
    pub load: f64,
    pub bucket_width: usize,
}

impl std::fmt::Display for SweepPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "w={} size={} load={:.2}",
            self.bucket_width,
            format_size(self.size),
            self.load
        )
    }
}

/// Bytes, with headroom, that table type `T` needs at the sweep's worst-case
/// point (largest size, smallest load).
pub fn worst_case_bytes<T, D>(config: &SweepConfig) -> u64
where
    T: MultiValueTable<D>,
    D: Device,
{
    budget::required_bytes::<T, D>(config.max_size(), config.min_load(), config.headroom)
}

/// Reject the sweep if any point would read past the corpus or `required`
/// bytes do not fit in device memory.
///
/// `required` is the worst case over every table configuration in the sweep,
/// see [`worst_case_bytes`].
pub fn preflight<D: Device>(
    device: &D,
    corpus_len: usize,
    config: &SweepConfig,
    required: u64,
) -> Result<u64, BenchError> {
    config.validate()?;

    let max_size = config.max_size();
    if max_size > corpus_len {
        return Err(BenchError::CorpusTooSmall {
            requested: max_size,
            available: corpus_len,
        });
    }

    budget::check(device, required, max_size, config.min_load())
}

/// Run all sizes x loads for table type `T`, emitting each record as soon as it
/// is measured. Returns the records in emission order.
pub fn run_configuration<T, D, W>(
    device: &D,
    corpus: &[u32],
    config: &SweepConfig,
    reporter: &mut Reporter<W>,
    progress_cb: Option<&dyn Fn(&str)>,
) -> Result<Vec<MeasurementRecord>, BenchError>
where
    T: MultiValueTable<D>,
    D: Device,
    W: Write,
{
    let max_size = config.max_size();
    if max_size > corpus.len() {
        return Err(BenchError::CorpusTooSmall {
            requested: max_size,
            available: corpus.len(),
        });
    }

    let _staging = device.reserve(budget::staging_bytes(
        T::KEY_BYTES,
        T::VALUE_BYTES,
        max_size,
    ))?;

    // Values are the input positions; any distinct payload works.
    let values: Vec<u32> = (0..max_size as u32).collect();
    let mut realized_keys = vec![0u32; max_size];
    let mut begin = vec![0usize; max_size];
    let mut end = vec![0usize; max_size];
    let mut out_values = vec![0u32; max_size];

    let mut records = Vec::with_capacity(config.points_per_configuration());

    for &size in &config.sizes {
        for &load in &config.loads {
            let point = SweepPoint {
                size,
                load,
                bucket_width: T::BUCKET_WIDTH,
            };
            let slots = capacity::plan_for::<T, D>(size, load);

            if let Some(cb) = progress_cb {
                cb(&format!("{point}: insert ({} trials)", config.trial.iterations));
            }
            tracing::debug!(%point, slots, "constructing table");

            let table = T::new(device, slots)?;
            let keys = &corpus[..size];
            let vals = &values[..size];

            let inserts = run_trials(
                device,
                &config.trial,
                || table.init(),
                || table.insert(keys, vals),
            )?;

            let distinct = table.retrieve_all_keys(&mut realized_keys);
            let queries = &realized_keys[..distinct];

            if let Some(cb) = progress_cb {
                cb(&format!(
                    "{point}: retrieve {} keys ({} trials)",
                    distinct, config.trial.iterations
                ));
            }

            let retrieves = run_trials(
                device,
                &config.trial,
                || {},
                || {
                    table
                        .retrieve(
                            queries,
                            &mut begin[..distinct],
                            &mut end[..distinct],
                            &mut out_values,
                        )
                        .map(|_| ())
                },
            )?;

            let introspection = Introspection::capture(&table);
            drop(table);

            if !introspection.status.is_empty() {
                tracing::warn!(%point, status = %introspection.status, "table reported status");
            }

            let record = MeasurementRecord::new(
                &point,
                T::KEY_BYTES + T::VALUE_BYTES,
                inserts.min_ms(),
                retrieves.min_ms(),
                introspection,
            );
            tracing::info!(
                %point,
                insert_ms = record.insert_ms,
                retrieve_ms = record.retrieve_ms,
                key_load = record.key_load_factor,
                value_load = record.value_load_factor,
                "sweep point measured"
            );

            reporter.emit(&record)?;
            records.push(record);

            if let Some(cb) = progress_cb {
                cb(&format!("{point}: done"));
            }
        }
    }

    Ok(records)
}

/// [`preflight`] followed by [`run_configuration`].
pub fn run_sweep<T, D, W>(
    device: &D,
    corpus: &[u32],
    config: &SweepConfig,
    reporter: &mut Reporter<W>,
    progress_cb: Option<&dyn Fn(&str)>,
) -> Result<Vec<MeasurementRecord>, BenchError>
where
    T: MultiValueTable<D>,
    D: Device,
    W: Write,
{
    preflight(device, corpus.len(), config, worst_case_bytes::<T, D>(config))?;
    run_configuration::<T, D, W>(device, corpus, config, reporter, progress_cb)
}

/// Format an element count for display (e.g., 1048576 -> "2^20", 1500 -> "1.5K").
pub fn format_size(size: usize) -> String {
    if size.is_power_of_two() && size >= 1024 {
        format!("2^{}", size.trailing_zeros())
    } else if size >= 1_000_000 {
        format!("{:.1}M", size as f64 / 1_000_000.0)
    } else if size >= 1_000 {
        format!("{:.1}K", size as f64 / 1_000.0)
    } else {
        size.to_string()
    }
}
