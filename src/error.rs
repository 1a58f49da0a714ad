//! Fatal conditions for a benchmark run.
//!
//! Nothing here is retried: a run either completes with every worker joined or
//! aborts. Thread count is an experimental parameter, so the harness never
//! degrades to fewer threads on its own.

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("requested {requested} worker threads but only {available} hardware threads are available")]
    TooManyThreads { requested: usize, available: usize },

    #[error("cache line of {requested} bytes exceeds the padded counter stride of {stride} bytes")]
    CacheLineTooLarge { requested: usize, stride: usize },

    #[error("failed to allocate {counters} counters")]
    Allocation { counters: usize },

    #[error("failed to spawn worker {worker}: {source}")]
    Spawn {
        worker: usize,
        #[source]
        source: io::Error,
    },

    #[error("worker {worker} panicked before finishing its iterations")]
    WorkerPanicked { worker: usize },

    #[error("csv export failed: {0}")]
    Export(#[from] csv::Error),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, BenchError>;
