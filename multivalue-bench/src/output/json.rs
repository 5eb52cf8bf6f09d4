//! JSON output for sweep results.
//!
//! Serializes the measurement records with a device header, the sweep
//! configuration and a timestamp.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::config::SweepConfig;
use crate::error::BenchError;
use crate::report::MeasurementRecord;

#[derive(Serialize)]
struct JsonReport<'a> {
    device: DeviceHeader<'a>,
    timestamp: String,
    config: &'a SweepConfig,
    results: &'a [MeasurementRecord],
}

#[derive(Serialize)]
struct DeviceHeader<'a> {
    name: &'a str,
}

/// Write sweep results to a JSON file, creating parent directories as needed.
pub fn write_json(
    path: &Path,
    device_name: &str,
    config: &SweepConfig,
    records: &[MeasurementRecord],
) -> Result<(), BenchError> {
    let report_err = |reason: String| BenchError::Report {
        path: path.display().to_string(),
        reason,
    };

    let report = JsonReport {
        device: DeviceHeader { name: device_name },
        timestamp: chrono::Utc::now().to_rfc3339(),
        config,
        results: records,
    };

    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| report_err(format!("JSON serialization failed: {e}")))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                report_err(format!("failed to create directory {}: {e}", parent.display()))
            })?;
        }
    }

    fs::write(path, json).map_err(|e| report_err(e.to_string()))?;

    tracing::info!(path = %path.display(), records = records.len(), "JSON results written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use multivalue_hashtable::Status;

    use super::*;
    use crate::report::Introspection;
    use crate::sweep::SweepPoint;

    fn record(bucket_width: usize) -> MeasurementRecord {
        let point = SweepPoint {
            size: 1000,
            load: 0.8,
            bucket_width,
        };
        let intro = Introspection {
            capacity: 1250,
            value_capacity: 1250 * bucket_width,
            key_load_factor: 0.1,
            value_load_factor: 0.1,
            storage_density: 0.05,
            relative_storage_density: 0.05,
            bytes_total: 15_000,
            status: Status::BUCKET_OVERFLOW,
        };
        MeasurementRecord::new(&point, 8, 1.0, 0.5, intro)
    }

    #[test]
    fn test_write_json_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sweep.json");
        let records = vec![record(1), record(8)];

        write_json(&path, "host-0", &SweepConfig::default(), &records).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["device"]["name"], "host-0");
        assert!(value["timestamp"].as_str().is_some());
        assert_eq!(value["config"]["sizes"][0], 1 << 27);
        let results = value["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1]["bucket_width"], 8);
        assert_eq!(results[0]["status"], "bucket_overflow");
    }
}
