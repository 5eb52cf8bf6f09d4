use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::BenchError;
use crate::report::RowFormat;
use crate::trial::TrialPolicy;

/// Bucket widths the binary is monomorphised for.
pub const SUPPORTED_BUCKET_WIDTHS: [usize; 4] = [1, 2, 4, 8];

/// Default sweep: 2^27 keys at load 0.8 across every bucket width.
pub const DEFAULT_SIZE: usize = 1 << 27;
pub const DEFAULT_LOAD: f64 = 0.8;

/// Everything that determines one sweep besides the corpus and the device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    pub sizes: Vec<usize>,
    pub loads: Vec<f64>,
    pub bucket_widths: Vec<usize>,
    pub trial: TrialPolicy,
    pub headroom: f64,
    pub row_format: RowFormat,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            sizes: vec![DEFAULT_SIZE],
            loads: vec![DEFAULT_LOAD],
            bucket_widths: SUPPORTED_BUCKET_WIDTHS.to_vec(),
            trial: TrialPolicy::default(),
            headroom: crate::budget::DEFAULT_HEADROOM,
            row_format: RowFormat::Labeled,
        }
    }
}

impl SweepConfig {
    /// Reject configurations no sweep point could run under.
    pub fn validate(&self) -> Result<(), BenchError> {
        if self.sizes.is_empty() {
            return Err(BenchError::Config("no dataset sizes given".into()));
        }
        if self.sizes.contains(&0) {
            return Err(BenchError::Config("dataset sizes must be at least 1".into()));
        }
        if self.sizes.iter().any(|&s| s > u32::MAX as usize) {
            return Err(BenchError::Config(format!(
                "dataset sizes are limited to {} keys",
                u32::MAX
            )));
        }
        if self.loads.is_empty() {
            return Err(BenchError::Config("no load factors given".into()));
        }
        if let Some(bad) = self.loads.iter().find(|l| !(**l > 0.0 && **l <= 1.0)) {
            return Err(BenchError::Config(format!(
                "load factor {bad} is outside (0, 1]"
            )));
        }
        if self.bucket_widths.is_empty() {
            return Err(BenchError::Config("no bucket widths given".into()));
        }
        if let Some(bad) = self
            .bucket_widths
            .iter()
            .find(|w| !SUPPORTED_BUCKET_WIDTHS.contains(*w))
        {
            return Err(BenchError::Config(format!(
                "bucket width {bad} is not one of {SUPPORTED_BUCKET_WIDTHS:?}"
            )));
        }
        if self.trial.iterations == 0 {
            return Err(BenchError::Config("iterations must be at least 1".into()));
        }
        if !(self.headroom >= 1.0 && self.headroom.is_finite()) {
            return Err(BenchError::Config(format!(
                "headroom {} must be a finite multiplier >= 1",
                self.headroom
            )));
        }
        Ok(())
    }

    /// Largest dataset size in the sweep (0 when empty).
    pub fn max_size(&self) -> usize {
        self.sizes.iter().copied().max().unwrap_or(0)
    }

    /// Smallest load factor in the sweep (1.0 when empty).
    pub fn min_load(&self) -> f64 {
        self.loads.iter().copied().fold(1.0, f64::min)
    }

    /// Sweep points per table configuration.
    pub fn points_per_configuration(&self) -> usize {
        self.sizes.len() * self.loads.len()
    }
}

/// A preset sweep shape selectable with `--profile`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchProfile {
    pub name: String,
    pub sizes: Vec<usize>,
    pub loads: Vec<f64>,
    pub iterations: u32,
}

/// Returns the "quick" profile: 2^20 keys / load 0.8 / 3 iterations.
pub fn quick_profile() -> BenchProfile {
    BenchProfile {
        name: "quick".to_string(),
        sizes: vec![1 << 20],
        loads: vec![0.8],
        iterations: 3,
    }
}

/// Returns the "standard" profile: 2^24+2^26 keys / loads 0.5..0.9 / 5 iterations.
pub fn standard_profile() -> BenchProfile {
    BenchProfile {
        name: "standard".to_string(),
        sizes: vec![1 << 24, 1 << 26],
        loads: vec![0.5, 0.8, 0.9],
        iterations: 5,
    }
}

/// Returns the "thorough" profile: 2^22..2^27 keys / loads 0.5..0.95 / 10 iterations.
pub fn thorough_profile() -> BenchProfile {
    BenchProfile {
        name: "thorough".to_string(),
        sizes: vec![1 << 22, 1 << 24, 1 << 26, 1 << 27],
        loads: vec![0.5, 0.6, 0.7, 0.8, 0.9, 0.95],
        iterations: 10,
    }
}

/// Lookup a profile by name.
pub fn get_profile(name: &str) -> Option<BenchProfile> {
    match name {
        "quick" => Some(quick_profile()),
        "standard" => Some(standard_profile()),
        "thorough" => Some(thorough_profile()),
        _ => None,
    }
}

/// Parse a human-readable element count to a usize.
///
/// Supports:
/// - "2^27" -> 134_217_728
/// - "1M" or "1m" -> 1_000_000
/// - "100K" or "100k" -> 100_000
/// - "1_000_000" -> 1_000_000
pub fn parse_size(s: &str) -> Result<usize, String> {
    let s = s.trim();

    if let Some((base, exp)) = s.split_once('^') {
        let base: usize = base
            .trim()
            .parse()
            .map_err(|e| format!("Invalid size '{}': {}", s, e))?;
        let exp: u32 = exp
            .trim()
            .parse()
            .map_err(|e| format!("Invalid size '{}': {}", s, e))?;
        return base
            .checked_pow(exp)
            .ok_or_else(|| format!("Invalid size '{}': overflows", s));
    }

    if let Some(prefix) = s.strip_suffix('M').or_else(|| s.strip_suffix('m')) {
        let num: f64 = prefix
            .replace('_', "")
            .parse()
            .map_err(|e| format!("Invalid size '{}': {}", s, e))?;
        return Ok((num * 1_000_000.0) as usize);
    }

    if let Some(prefix) = s.strip_suffix('K').or_else(|| s.strip_suffix('k')) {
        let num: f64 = prefix
            .replace('_', "")
            .parse()
            .map_err(|e| format!("Invalid size '{}': {}", s, e))?;
        return Ok((num * 1_000.0) as usize);
    }

    s.replace('_', "")
        .parse::<usize>()
        .map_err(|e| format!("Invalid size '{}': {}", s, e))
}

/// Parse a byte quantity with binary suffixes ("512M", "16G", "1T", "4096").
pub fn parse_bytes(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let (digits, shift) = match s.chars().last().map(|c| c.to_ascii_uppercase()) {
        Some('K') => (&s[..s.len() - 1], 10),
        Some('M') => (&s[..s.len() - 1], 20),
        Some('G') => (&s[..s.len() - 1], 30),
        Some('T') => (&s[..s.len() - 1], 40),
        _ => (s, 0),
    };
    let num: f64 = digits
        .replace('_', "")
        .parse()
        .map_err(|e| format!("Invalid byte count '{}': {}", s, e))?;
    if !(num >= 0.0 && num.is_finite()) {
        return Err(format!("Invalid byte count '{}'", s));
    }
    Ok((num * (1u64 << shift) as f64) as u64)
}

/// Parse a load factor in (0, 1].
pub fn parse_load(s: &str) -> Result<f64, String> {
    let load: f64 = s
        .trim()
        .parse()
        .map_err(|e| format!("Invalid load factor '{}': {}", s, e))?;
    if load > 0.0 && load <= 1.0 {
        Ok(load)
    } else {
        Err(format!("Load factor '{}' is outside (0, 1]", s))
    }
}

/// Trial policy from CLI-style integers.
pub fn trial_policy(iterations: u32, backoff_ms: u64) -> TrialPolicy {
    TrialPolicy {
        iterations,
        backoff: Duration::from_millis(backoff_ms),
    }
}
