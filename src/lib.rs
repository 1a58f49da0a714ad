//! # Cache Contention Benchmark
//!
//! Measures the cost of false sharing: one worker thread per counter, counters either
//! packed tightly into shared cache lines (naive) or isolated on their own line (padded).
//!
//! ## Flow
//! `ContentionHarness` allocates a `CounterArray` → spawns one `run_worker` per counter →
//! joins them all → returns a `RunResult`. Running both layouts yields a `LayoutComparison`
//! whose headline metric is `padded_throughput / naive_throughput`.
//!
//! Absolute thresholds for a visible false-sharing penalty are machine dependent; thread
//! count and iteration count are always caller supplied.

pub mod config;
pub mod counter;
pub mod error;
pub mod harness;
pub mod utils;

pub use config::BenchConfig;
pub use counter::{Counter, CounterArray, IncrementStrategy, LayoutKind, NaiveCounter, PaddedCounter};
pub use error::{BenchError, Result};
pub use harness::contention::{ContentionHarness, HarnessState, RunResult};
pub use utils::report::{LayoutComparison, ResultReporter};
