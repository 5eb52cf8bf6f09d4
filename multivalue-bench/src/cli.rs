use std::path::PathBuf;

use clap::Parser;

use crate::config::{
    get_profile, parse_bytes, parse_load, parse_size, trial_policy, SweepConfig,
};
use crate::error::BenchError;
use crate::report::RowFormat;

const DEFAULT_ITERATIONS: u32 = 5;

/// Throughput and memory-efficiency sweep for multi-value hash tables
#[derive(Parser, Debug)]
#[command(name = "multivalue-bench", version, about)]
pub struct BenchArgs {
    /// Binary file of little-endian u32 keys. A synthetic corpus is generated when omitted.
    #[arg(value_name = "KEY_CORPUS_FILE")]
    pub key_corpus_file: Option<PathBuf>,

    /// Device to run on
    #[arg(value_name = "DEVICE_ID")]
    pub device_id: Option<usize>,

    /// Dataset sizes to sweep (e.g., 2^27, 1M, 100K, 1000000)
    #[arg(long, value_delimiter = ',')]
    pub sizes: Option<Vec<String>>,

    /// Target load factors to sweep, each in (0, 1]
    #[arg(long, value_delimiter = ',')]
    pub loads: Option<Vec<String>>,

    /// Bucket widths to measure (subset of 1,2,4,8)
    #[arg(long, value_delimiter = ',', default_values_t = [1usize, 2, 4, 8])]
    pub bucket_widths: Vec<usize>,

    /// Timed trials per operation; the fastest one is reported
    #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
    pub iterations: u32,

    /// Pause between trials in milliseconds
    #[arg(long, default_value_t = 100)]
    pub backoff_ms: u64,

    /// Multiplier applied to the estimated memory footprint
    #[arg(long, default_value_t = crate::budget::DEFAULT_HEADROOM)]
    pub headroom: f64,

    /// Print bare values instead of name=value pairs
    #[arg(long)]
    pub positional: bool,

    /// Sweep profile: quick (2^20/0.8/3), standard (2^24+2^26/0.5..0.9/5), thorough (2^22..2^27/0.5..0.95/10)
    #[arg(long)]
    pub profile: Option<String>,

    /// Memory budget of the host device (e.g., 16G, 512M)
    #[arg(long, default_value = "16G")]
    pub device_memory: String,

    /// Distinct keys in the synthetic corpus
    #[arg(long, default_value_t = 1 << 24)]
    pub distinct_keys: u32,

    /// Copies of each key in the synthetic corpus
    #[arg(long, default_value_t = 8)]
    pub multiplicity: usize,

    /// Seed for shuffling the synthetic corpus
    #[arg(long, default_value_t = 42)]
    pub shuffle_seed: u64,

    /// Keep the synthetic corpus in generation order (duplicates adjacent)
    #[arg(long)]
    pub no_shuffle: bool,

    /// Write JSON results to file
    #[arg(long)]
    pub json_file: Option<PathBuf>,

    /// Disable the progress spinner
    #[arg(long)]
    pub no_progress: bool,
}

impl BenchArgs {
    pub fn device_id(&self) -> usize {
        self.device_id.unwrap_or(0)
    }

    pub fn device_memory_bytes(&self) -> Result<u64, BenchError> {
        parse_bytes(&self.device_memory).map_err(BenchError::Config)
    }

    /// Resolve the sweep: explicit flags take precedence, then --profile, then defaults.
    pub fn sweep_config(&self) -> Result<SweepConfig, BenchError> {
        let profile = match self.profile.as_deref() {
            Some(name) => Some(get_profile(name).ok_or_else(|| {
                BenchError::Config(format!(
                    "unknown profile '{name}'. Valid: quick, standard, thorough"
                ))
            })?),
            None => None,
        };

        let defaults = SweepConfig::default();

        let sizes = match (&self.sizes, &profile) {
            (Some(raw), _) => raw
                .iter()
                .map(|s| parse_size(s))
                .collect::<Result<Vec<_>, _>>()
                .map_err(BenchError::Config)?,
            (None, Some(p)) => p.sizes.clone(),
            (None, None) => defaults.sizes,
        };

        let loads = match (&self.loads, &profile) {
            (Some(raw), _) => raw
                .iter()
                .map(|s| parse_load(s))
                .collect::<Result<Vec<_>, _>>()
                .map_err(BenchError::Config)?,
            (None, Some(p)) => p.loads.clone(),
            (None, None) => defaults.loads,
        };

        // An explicit --iterations overrides the profile's count.
        let iterations = match &profile {
            Some(p) if self.iterations == DEFAULT_ITERATIONS => p.iterations,
            _ => self.iterations,
        };

        let config = SweepConfig {
            sizes,
            loads,
            bucket_widths: self.bucket_widths.clone(),
            trial: trial_policy(iterations, self.backoff_ms),
            headroom: self.headroom,
            row_format: if self.positional {
                RowFormat::Positional
            } else {
                RowFormat::Labeled
            },
        };
        config.validate()?;
        Ok(config)
    }
}
