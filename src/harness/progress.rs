//! Optional observer that samples counters while workers run.
//!
//! Only reads counters (relaxed snapshots). Reading a contended line adds some
//! coherence traffic of its own, so the monitor is off unless an interval is set.

use std::time::{Duration, Instant};

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender};
use log::info;

use crate::counter::{Counter, CounterArray, LayoutKind};

/// One snapshot of every counter.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSample {
    /// Time since the monitor started.
    pub at: Duration,
    pub values: Vec<u64>,
    pub completed_ops: u64,
}

impl ProgressSample {
    /// Completion in percent of `expected_total`; 100 when nothing was expected.
    pub fn percent_of(&self, expected_total: u64) -> f64 {
        if expected_total == 0 {
            100.0
        } else {
            self.completed_ops as f64 / expected_total as f64 * 100.0
        }
    }
}

pub struct ProgressMonitor {
    layout: LayoutKind,
    interval: Duration,
    expected_total: u64,
    stop_tx: Sender<()>,
    stop_rx: Receiver<()>,
}

impl ProgressMonitor {
    pub fn new(layout: LayoutKind, interval: Duration, expected_total: u64) -> Self {
        let (stop_tx, stop_rx) = bounded(1);
        Self {
            layout,
            interval,
            expected_total,
            stop_tx,
            stop_rx,
        }
    }

    /// Samples every `interval` until [`stop`](Self::stop) is called, then takes
    /// one final sample. Blocks the calling thread.
    pub fn run<C: Counter>(&self, counters: &CounterArray<C>) -> Vec<ProgressSample> {
        let started = Instant::now();
        let mut samples = Vec::new();

        loop {
            match self.stop_rx.recv_timeout(self.interval) {
                Err(RecvTimeoutError::Timeout) => {
                    let sample = Self::sample(counters, started);
                    info!(
                        "[Progress:{}] {:>6.2}% ({} / {} ops) after {:?}",
                        self.layout,
                        sample.percent_of(self.expected_total),
                        sample.completed_ops,
                        self.expected_total,
                        sample.at
                    );
                    samples.push(sample);
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        samples.push(Self::sample(counters, started));
        samples
    }

    /// Signals [`run`](Self::run) to finish. Safe to call more than once.
    pub fn stop(&self) {
        let _ = self.stop_tx.try_send(());
    }

    pub fn sample<C: Counter>(counters: &CounterArray<C>, started: Instant) -> ProgressSample {
        let values = counters.values();
        let completed_ops = values.iter().sum();
        ProgressSample {
            at: started.elapsed(),
            values,
            completed_ops,
        }
    }
}
