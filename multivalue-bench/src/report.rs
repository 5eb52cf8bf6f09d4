//! Metrics aggregation and row output.
//!
//! One [`MeasurementRecord`] per sweep point. [`MeasurementRecord::fields`] is
//! the single source of field order, so the labeled and positional rows can
//! only differ by their label prefixes.

use std::io::Write;

use serde::{Deserialize, Serialize};

use multivalue_hashtable::{Device, MultiValueTable, Status};

use crate::sweep::SweepPoint;

/// Row layout on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RowFormat {
    /// `name=value` pairs separated by spaces.
    #[default]
    Labeled,
    /// Bare values separated by spaces, same order as `Labeled`.
    Positional,
}

/// Table self-reported values, read after the device has drained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Introspection {
    pub capacity: usize,
    pub value_capacity: usize,
    pub key_load_factor: f64,
    pub value_load_factor: f64,
    pub storage_density: f64,
    pub relative_storage_density: f64,
    pub bytes_total: u64,
    pub status: Status,
}

impl Introspection {
    /// Read every introspection value and drain the table's status.
    pub fn capture<T, D>(table: &T) -> Self
    where
        T: MultiValueTable<D>,
        D: Device,
    {
        Self {
            capacity: table.capacity(),
            value_capacity: table.value_capacity(),
            key_load_factor: table.key_load_factor(),
            value_load_factor: table.value_load_factor(),
            storage_density: table.storage_density(),
            relative_storage_density: table.relative_storage_density(),
            bytes_total: table.bytes_total(),
            status: table.pop_status(),
        }
    }
}

/// Operations per second for `count` operations in `ms` milliseconds.
pub fn ops_per_sec(count: usize, ms: f64) -> f64 {
    if ms > 0.0 {
        count as f64 / (ms / 1000.0)
    } else {
        0.0
    }
}

/// GB/s for `count` key/value pairs of `pair_bytes` each moved in `ms` milliseconds.
pub fn bandwidth_gbps(count: usize, pair_bytes: usize, ms: f64) -> f64 {
    if ms > 0.0 {
        (count as f64 * pair_bytes as f64 / 1e9) / (ms / 1000.0)
    } else {
        0.0
    }
}

/// Reduced output of one sweep point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementRecord {
    pub size: usize,
    pub load: f64,
    pub bucket_width: usize,
    pub capacity: usize,
    pub value_capacity: usize,
    pub key_load_factor: f64,
    pub value_load_factor: f64,
    pub storage_density: f64,
    pub relative_storage_density: f64,
    pub bytes_total: u64,
    pub insert_ms: f64,
    pub insert_ops_per_sec: f64,
    pub insert_gbps: f64,
    pub retrieve_ms: f64,
    pub retrieve_ops_per_sec: f64,
    pub retrieve_gbps: f64,
    pub status: Status,
}

impl MeasurementRecord {
    pub fn new(
        point: &SweepPoint,
        pair_bytes: usize,
        insert_ms: f64,
        retrieve_ms: f64,
        table: Introspection,
    ) -> Self {
        Self {
            size: point.size,
            load: point.load,
            bucket_width: point.bucket_width,
            capacity: table.capacity,
            value_capacity: table.value_capacity,
            key_load_factor: table.key_load_factor,
            value_load_factor: table.value_load_factor,
            storage_density: table.storage_density,
            relative_storage_density: table.relative_storage_density,
            bytes_total: table.bytes_total,
            insert_ms,
            insert_ops_per_sec: ops_per_sec(point.size, insert_ms),
            insert_gbps: bandwidth_gbps(point.size, pair_bytes, insert_ms),
            retrieve_ms,
            retrieve_ops_per_sec: ops_per_sec(point.size, retrieve_ms),
            retrieve_gbps: bandwidth_gbps(point.size, pair_bytes, retrieve_ms),
            status: table.status,
        }
    }

    /// Labels and rendered values, in output order.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("size", self.size.to_string()),
            ("load", format!("{:.3}", self.load)),
            ("bucket", self.bucket_width.to_string()),
            ("capacity", self.capacity.to_string()),
            ("value_capacity", self.value_capacity.to_string()),
            ("key_load", format!("{:.5}", self.key_load_factor)),
            ("value_load", format!("{:.5}", self.value_load_factor)),
            ("density", format!("{:.5}", self.storage_density)),
            ("relative_density", format!("{:.5}", self.relative_storage_density)),
            ("bytes", self.bytes_total.to_string()),
            ("insert_ms", format!("{:.4}", self.insert_ms)),
            ("insert_ops", format!("{:.0}", self.insert_ops_per_sec)),
            ("insert_gbs", format!("{:.3}", self.insert_gbps)),
            ("retrieve_ms", format!("{:.4}", self.retrieve_ms)),
            ("retrieve_ops", format!("{:.0}", self.retrieve_ops_per_sec)),
            ("retrieve_gbs", format!("{:.3}", self.retrieve_gbps)),
            ("status", self.status.to_string()),
        ]
    }
}

/// Render one record as a single line (no trailing newline).
pub fn format_row(record: &MeasurementRecord, format: RowFormat) -> String {
    let fields = record.fields();
    let cells: Vec<String> = match format {
        RowFormat::Labeled => fields
            .into_iter()
            .map(|(label, value)| format!("{label}={value}"))
            .collect(),
        RowFormat::Positional => fields.into_iter().map(|(_, value)| value).collect(),
    };
    cells.join(" ")
}

/// Writes one line per record.
pub struct Reporter<W: Write> {
    out: W,
    format: RowFormat,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, format: RowFormat) -> Self {
        Self { out, format }
    }

    pub fn format(&self) -> RowFormat {
        self.format
    }

    pub fn emit(&mut self, record: &MeasurementRecord) -> std::io::Result<()> {
        writeln!(self.out, "{}", format_row(record, self.format))?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
