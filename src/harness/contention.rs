//! Orchestrates one benchmark run for a given counter layout.
//!
//! State machine: `Idle → Allocating → Running → Joining → Reporting → Idle`.
//!
//! ## Run
//! - **Allocating:** one counter per worker, naive or padded.
//! - **Running:** workers are spawned as scoped threads and park on a start gate; the
//!   wall-clock timer starts once the last worker has been launched and the gate opens.
//! - **Joining:** every worker is joined before the timer stops. All-or-nothing: a spawn
//!   failure or a panicked worker aborts the run and no `RunResult` is produced.
//! - **Reporting:** final counter values and throughput are packed into a `RunResult`.
//!
//! No state survives between runs; comparisons are built by the caller from two results.

use std::{
    fmt, io,
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::{Duration, Instant},
};

use core_affinity::{get_core_ids, CoreId};
use crossbeam::channel::bounded;
use log::{debug, error, info, warn};

use crate::{
    config::BenchConfig,
    counter::{Counter, CounterArray, IncrementStrategy, LayoutKind, NaiveCounter, PaddedCounter},
    error::{BenchError, Result},
    harness::{
        progress::{ProgressMonitor, ProgressSample},
        worker::{plan_assignments, run_worker},
    },
    utils::report::LayoutComparison,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessState {
    Idle,
    Allocating,
    Running,
    Joining,
    Reporting,
}

impl fmt::Display for HarnessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HarnessState::Idle => "idle",
            HarnessState::Allocating => "allocating",
            HarnessState::Running => "running",
            HarnessState::Joining => "joining",
            HarnessState::Reporting => "reporting",
        };
        f.write_str(name)
    }
}

/// Outcome of one complete run. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub layout: LayoutKind,
    pub thread_count: usize,
    pub iterations_per_thread: u64,
    pub increment: IncrementStrategy,
    /// Cache line size assumed for this run, in bytes.
    pub cache_line_size: usize,
    pub fences_issued: u64,
    pub elapsed: Duration,
    /// One value per counter, in worker order.
    pub final_values: Vec<u64>,
    /// Always `thread_count * iterations_per_thread`.
    pub total_operations: u64,
    /// Zero when the run did no work or finished below timer resolution.
    pub throughput_ops_per_sec: f64,
    pub progress: Vec<ProgressSample>,
}

impl RunResult {
    pub fn elapsed_millis(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1_000.0
    }

    pub fn per_thread_throughput(&self) -> f64 {
        if self.thread_count == 0 {
            0.0
        } else {
            self.throughput_ops_per_sec / self.thread_count as f64
        }
    }

    /// Sum of the final counter values.
    pub fn counted_operations(&self) -> u64 {
        self.final_values.iter().sum()
    }

    /// Every counter ended at exactly `iterations_per_thread`.
    pub fn is_consistent(&self) -> bool {
        self.final_values.len() == self.thread_count
            && self
                .final_values
                .iter()
                .all(|&v| v == self.iterations_per_thread)
    }
}

/// ops / seconds, or zero when either side is zero.
pub fn throughput(total_operations: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if total_operations == 0 || secs <= 0.0 {
        0.0
    } else {
        total_operations as f64 / secs
    }
}

pub struct ContentionHarness {
    config: BenchConfig,
    state: HarnessState,
    cores: Vec<CoreId>,
}

impl ContentionHarness {
    /// Validates `config` against this machine's hardware thread count.
    pub fn new(config: BenchConfig) -> Result<Self> {
        config.validate()?;
        let cores = if config.pin_cores {
            let cores = get_core_ids().unwrap_or_default();
            if cores.is_empty() {
                warn!("Core pinning requested but no core ids available; running unpinned");
            }
            cores
        } else {
            Vec::new()
        };

        Ok(Self {
            config,
            state: HarnessState::Idle,
            cores,
        })
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    pub fn state(&self) -> HarnessState {
        self.state
    }

    fn transition(&mut self, next: HarnessState) {
        debug!("[Harness] {} -> {}", self.state, next);
        self.state = next;
    }

    /// Runs one benchmark pass with the configured thread and iteration counts.
    pub fn run_benchmark(&mut self, layout: LayoutKind) -> Result<RunResult> {
        match layout {
            LayoutKind::Naive => self.run_with_layout::<NaiveCounter>(),
            LayoutKind::Padded => self.run_with_layout::<PaddedCounter>(),
        }
    }

    /// Runs one pass over freshly allocated counters of type `C`.
    fn run_with_layout<C: Counter>(&mut self) -> Result<RunResult> {
        let layout = C::LAYOUT;
        info!(
            "[Harness] Starting {} run: threads={}, iterations={}, increment={}",
            layout, self.config.thread_count, self.config.iterations_per_thread, self.config.increment
        );

        self.transition(HarnessState::Allocating);
        let counters = match CounterArray::<C>::new(self.config.thread_count) {
            Ok(counters) => counters,
            Err(e) => {
                error!("[Harness] {} run aborted: {}", layout, e);
                self.transition(HarnessState::Idle);
                return Err(e);
            }
        };
        debug!(
            "[Harness] Allocated {} counters, stride {} bytes",
            counters.len(),
            counters.stride_bytes()
        );

        self.run_on(&counters, |_| Ok(()))
    }

    /// Drives the workers over `counters`. `before_spawn` runs on the harness thread
    /// ahead of each worker spawn; an error from it is treated as a failed spawn.
    fn run_on<C, F>(&mut self, counters: &CounterArray<C>, before_spawn: F) -> Result<RunResult>
    where
        C: Counter,
        F: FnMut(usize) -> io::Result<()>,
    {
        let result = self.execute(counters, before_spawn);
        if let Err(e) = &result {
            error!("[Harness] {} run aborted: {}", C::LAYOUT, e);
        }
        self.transition(HarnessState::Idle);
        result
    }

    fn execute<C, F>(&mut self, counters: &CounterArray<C>, mut before_spawn: F) -> Result<RunResult>
    where
        C: Counter,
        F: FnMut(usize) -> io::Result<()>,
    {
        let layout = C::LAYOUT;
        let thread_count = self.config.thread_count;
        let iterations = self.config.iterations_per_thread;
        let strategy = self.config.increment;
        let total_operations = self.config.total_operations();

        let assignments = plan_assignments(
            thread_count,
            iterations,
            self.config.fence_interval,
            &self.cores,
        );
        let monitor = self
            .config
            .progress_interval
            .map(|interval| ProgressMonitor::new(layout, interval, total_operations));

        self.transition(HarnessState::Running);

        // The gate opens when its sender is dropped; `aborted` tells parked workers
        // whether to run or bail out.
        let (gate_tx, gate_rx) = bounded::<()>(0);
        let aborted = AtomicBool::new(false);

        let (elapsed, fences_issued, progress) = thread::scope(|s| {
            let aborted = &aborted;

            let observer = monitor.as_ref().and_then(|m| {
                thread::Builder::new()
                    .name("progress_monitor".into())
                    .spawn_scoped(s, move || m.run(counters))
                    .inspect_err(|e| warn!("[Harness] Progress monitor not started: {}", e))
                    .ok()
            });

            let mut handles = Vec::with_capacity(thread_count);
            let mut spawn_error = None;
            for assignment in &assignments {
                let gate = gate_rx.clone();
                let spawned = before_spawn(assignment.worker_id).and_then(|()| {
                    thread::Builder::new()
                        .name(format!("worker_{}", assignment.worker_id))
                        .spawn_scoped(s, move || {
                            let _ = gate.recv();
                            if aborted.load(Ordering::Acquire) {
                                return 0;
                            }
                            run_worker(assignment, counters, strategy)
                        })
                });
                match spawned {
                    Ok(handle) => handles.push((assignment.worker_id, handle)),
                    Err(source) => {
                        spawn_error = Some(BenchError::Spawn {
                            worker: assignment.worker_id,
                            source,
                        });
                        break;
                    }
                }
            }

            if spawn_error.is_some() {
                aborted.store(true, Ordering::Release);
            }
            let started = Instant::now();
            drop(gate_tx);

            self.transition(HarnessState::Joining);
            let mut fences = 0u64;
            let mut panicked = None;
            for (worker, handle) in handles {
                match handle.join() {
                    Ok(n) => fences += n,
                    Err(_) => {
                        panicked.get_or_insert(worker);
                    }
                }
            }
            let elapsed = started.elapsed();

            let progress = match (monitor.as_ref(), observer) {
                (Some(m), Some(handle)) => {
                    m.stop();
                    handle.join().unwrap_or_default()
                }
                _ => Vec::new(),
            };

            if let Some(err) = spawn_error {
                return Err(err);
            }
            if let Some(worker) = panicked {
                return Err(BenchError::WorkerPanicked { worker });
            }
            Ok((elapsed, fences, progress))
        })?;

        self.transition(HarnessState::Reporting);
        let final_values = counters.values();
        let result = RunResult {
            layout,
            thread_count,
            iterations_per_thread: iterations,
            increment: strategy,
            cache_line_size: self.config.cache_line_size,
            fences_issued,
            elapsed,
            final_values,
            total_operations,
            throughput_ops_per_sec: throughput(total_operations, elapsed),
            progress,
        };

        if !result.is_consistent() {
            error!(
                "[Harness] {} run counted {} ops, expected {}",
                layout,
                result.counted_operations(),
                total_operations
            );
        }
        info!(
            "[Harness] {} run finished in {:.2} ms ({:.0} ops/s)",
            layout,
            result.elapsed_millis(),
            result.throughput_ops_per_sec
        );
        Ok(result)
    }

    /// Runs naive then padded with identical parameters. Either failure fails both.
    pub fn compare_layouts(&mut self) -> Result<LayoutComparison> {
        let naive = self.run_benchmark(LayoutKind::Naive)?;
        let padded = self.run_benchmark(LayoutKind::Padded)?;
        Ok(LayoutComparison::new(naive, padded))
    }

    /// Repeats [`compare_layouts`](Self::compare_layouts) `repetitions` times.
    pub fn repeat_comparison(&mut self, repetitions: usize) -> Result<Vec<LayoutComparison>> {
        (0..repetitions)
            .map(|rep| {
                debug!("[Harness] Repetition {}/{}", rep + 1, repetitions);
                self.compare_layouts()
            })
            .collect()
    }

    /// One comparison per thread count. Counts of zero, above the hardware thread
    /// count, or that fail validation are skipped with a warning rather than reduced.
    pub fn sweep_thread_counts(&mut self, thread_counts: &[usize]) -> Result<Vec<LayoutComparison>> {
        let available = num_cpus::get();
        let original = self.config.thread_count;
        let mut comparisons = Vec::with_capacity(thread_counts.len());

        for &threads in thread_counts {
            if threads == 0 || threads > available {
                warn!(
                    "[Sweep] Skipping {} threads (available: {})",
                    threads, available
                );
                continue;
            }
            if let Err(e) = self.config.clone().with_threads(threads).validate_against(available) {
                warn!("[Sweep] Skipping {} threads: {}", threads, e);
                continue;
            }
            info!("[Sweep] Running level: threads={}", threads);
            self.config.thread_count = threads;
            let outcome = self.compare_layouts();
            if outcome.is_err() {
                self.config.thread_count = original;
            }
            comparisons.push(outcome?);
        }

        self.config.thread_count = original;
        Ok(comparisons)
    }
}
