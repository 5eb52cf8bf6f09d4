//! Timed trial runner: N bracketed device runs with a thermal backoff in between,
//! reduced to the minimum sample.
//!
//! Device noise only ever adds latency, so the fastest of N runs is the best
//! estimate of steady-state cost. The policy is a fixed N with a fixed pause.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use multivalue_hashtable::Device;

/// How many trials to run and how long to pause between them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialPolicy {
    pub iterations: u32,
    pub backoff: Duration,
}

impl Default for TrialPolicy {
    fn default() -> Self {
        Self {
            iterations: 5,
            backoff: Duration::from_millis(100),
        }
    }
}

/// Raw per-trial durations for one operation at one sweep point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrialSeries {
    samples_ms: Vec<f64>,
}

impl TrialSeries {
    pub fn from_samples(samples_ms: Vec<f64>) -> Self {
        Self { samples_ms }
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples_ms
    }

    pub fn len(&self) -> usize {
        self.samples_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples_ms.is_empty()
    }

    /// Fastest trial in milliseconds; 0 for an empty series, never negative.
    pub fn min_ms(&self) -> f64 {
        if self.samples_ms.is_empty() {
            return 0.0;
        }
        self.samples_ms
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min)
            .max(0.0)
    }
}

/// Run `op` once per iteration between two device events.
///
/// `setup` runs before each iteration outside the timed region. Timing is read
/// only after the device has synchronized. The backoff sleep separates
/// consecutive iterations and is skipped after the last one.
pub fn run_trials<D, S, F, E>(
    device: &D,
    policy: &TrialPolicy,
    mut setup: S,
    mut op: F,
) -> Result<TrialSeries, E>
where
    D: Device,
    S: FnMut(),
    F: FnMut() -> Result<(), E>,
{
    let mut samples_ms = Vec::with_capacity(policy.iterations as usize);

    for i in 0..policy.iterations {
        setup();

        let start = device.record_event();
        op()?;
        let stop = device.record_event();
        device.synchronize();

        samples_ms.push(device.elapsed_ms(&start, &stop));

        if i + 1 < policy.iterations && !policy.backoff.is_zero() {
            std::thread::sleep(policy.backoff);
        }
    }

    tracing::trace!(?samples_ms, "trial series complete");
    Ok(TrialSeries { samples_ms })
}
