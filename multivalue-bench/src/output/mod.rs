//! Output beyond the per-point stdout rows: the JSON report and the progress spinner.

pub mod json;
pub mod progress;
