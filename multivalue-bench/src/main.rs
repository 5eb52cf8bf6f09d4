use std::io::Write;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use multivalue_bench::cli::BenchArgs;
use multivalue_bench::output::progress::SweepProgress;
use multivalue_bench::{corpus, output, preflight, run_configuration, worst_case_bytes};
use multivalue_bench::{BenchError, MeasurementRecord, Reporter, SweepConfig};
use multivalue_hashtable::{Device, HostBucketTable, HostDevice};

/// Filter used when RUST_LOG is not set.
const DEFAULT_ENV_FILTER: &str = "multivalue_bench=info,multivalue_hashtable=warn";

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_ENV_FILTER.into());
    // stdout carries only measurement rows.
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}

fn main() {
    init_tracing();
    let args = BenchArgs::parse();

    let progress = SweepProgress::new(!args.no_progress);
    let result = run(&args, &progress);
    progress.finish();

    if let Err(e) = result {
        tracing::error!(error = %e, "sweep aborted");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(args: &BenchArgs, progress: &SweepProgress) -> Result<(), BenchError> {
    let config = args.sweep_config()?;

    let keys = match &args.key_corpus_file {
        Some(path) => corpus::load_keys(path)?,
        None => {
            let mut keys = corpus::synthetic_keys(args.distinct_keys, args.multiplicity);
            if !args.no_shuffle {
                corpus::shuffle(&mut keys, args.shuffle_seed);
            }
            tracing::info!(
                distinct = args.distinct_keys,
                multiplicity = args.multiplicity,
                keys = keys.len(),
                "generated synthetic corpus"
            );
            keys
        }
    };

    let device = HostDevice::new(args.device_id(), args.device_memory_bytes()?)?;
    tracing::info!(
        device = %device.name(),
        lanes = device.lanes(),
        memory = device.total_memory(),
        sizes = ?config.sizes,
        loads = ?config.loads,
        bucket_widths = ?config.bucket_widths,
        "starting sweep"
    );

    // Widths run one after another, so the largest footprint bounds the sweep.
    let mut required = 0u64;
    for &width in &config.bucket_widths {
        required = required.max(worst_case_for_width(width, &config)?);
    }
    preflight(&device, keys.len(), &config, required)?;

    let stdout = std::io::stdout();
    let mut reporter = Reporter::new(stdout.lock(), config.row_format);
    let cb = progress.callback();

    let mut all_records: Vec<MeasurementRecord> = Vec::new();
    for &width in &config.bucket_widths {
        let records = run_width(width, &device, &keys, &config, &mut reporter, &cb)?;
        all_records.extend(records);
    }
    reporter.into_inner().flush()?;

    if let Some(path) = &args.json_file {
        output::json::write_json(path, &device.name(), &config, &all_records)?;
    }
    Ok(())
}

fn worst_case_for_width(width: usize, config: &SweepConfig) -> Result<u64, BenchError> {
    match width {
        1 => Ok(worst_case_bytes::<HostBucketTable<1>, HostDevice>(config)),
        2 => Ok(worst_case_bytes::<HostBucketTable<2>, HostDevice>(config)),
        4 => Ok(worst_case_bytes::<HostBucketTable<4>, HostDevice>(config)),
        8 => Ok(worst_case_bytes::<HostBucketTable<8>, HostDevice>(config)),
        other => Err(BenchError::Config(format!(
            "bucket width {other} is not supported"
        ))),
    }
}

fn run_width<W: Write>(
    width: usize,
    device: &HostDevice,
    keys: &[u32],
    config: &SweepConfig,
    reporter: &mut Reporter<W>,
    cb: &dyn Fn(&str),
) -> Result<Vec<MeasurementRecord>, BenchError> {
    match width {
        1 => run_configuration::<HostBucketTable<1>, _, _>(device, keys, config, reporter, Some(cb)),
        2 => run_configuration::<HostBucketTable<2>, _, _>(device, keys, config, reporter, Some(cb)),
        4 => run_configuration::<HostBucketTable<4>, _, _>(device, keys, config, reporter, Some(cb)),
        8 => run_configuration::<HostBucketTable<8>, _, _>(device, keys, config, reporter, Some(cb)),
        other => Err(BenchError::Config(format!(
            "bucket width {other} is not supported"
        ))),
    }
}
