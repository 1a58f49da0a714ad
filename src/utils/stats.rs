//! Summary statistics over repeated runs.
//!
//! Elapsed time and throughput vary run to run; total operations never do.

use statrs::statistics::Statistics;

use crate::{counter::LayoutKind, harness::contention::RunResult, utils::report::LayoutComparison};

/// Min / max / mean / std dev of a set of throughput samples.
#[derive(Debug, Clone, PartialEq)]
pub struct ThroughputSummary {
    pub layout: LayoutKind,
    pub runs: usize,
    pub mean: f64,
    /// `None` with fewer than two runs.
    pub std_dev: Option<f64>,
    pub min: f64,
    pub max: f64,
}

impl ThroughputSummary {
    /// Summarises the runs of `layout` in `results`; `None` if there are none.
    pub fn from_runs<'a>(
        layout: LayoutKind,
        results: impl IntoIterator<Item = &'a RunResult>,
    ) -> Option<Self> {
        let samples: Vec<f64> = results
            .into_iter()
            .filter(|r| r.layout == layout)
            .map(|r| r.throughput_ops_per_sec)
            .collect();
        if samples.is_empty() {
            return None;
        }

        Some(Self {
            layout,
            runs: samples.len(),
            mean: samples.iter().mean(),
            std_dev: (samples.len() > 1).then(|| samples.iter().std_dev()),
            min: Statistics::min(samples.iter()),
            max: Statistics::max(samples.iter()),
        })
    }

    /// Coefficient of variation in percent, when defined.
    pub fn relative_spread(&self) -> Option<f64> {
        match self.std_dev {
            Some(sd) if self.mean > 0.0 => Some(sd / self.mean * 100.0),
            _ => None,
        }
    }
}

/// Mean of the defined speedups across repeated comparisons.
pub fn mean_speedup(comparisons: &[LayoutComparison]) -> Option<f64> {
    let speedups: Vec<f64> = comparisons.iter().filter_map(|c| c.speedup).collect();
    if speedups.is_empty() {
        None
    } else {
        Some(speedups.iter().mean())
    }
}

/// Naive and padded summaries for a set of repeated comparisons.
pub fn summarize(comparisons: &[LayoutComparison]) -> Vec<ThroughputSummary> {
    let runs = comparisons.iter().flat_map(|c| [&c.naive, &c.padded]);
    LayoutKind::ALL
        .iter()
        .filter_map(|&layout| ThroughputSummary::from_runs(layout, runs.clone()))
        .collect()
}
