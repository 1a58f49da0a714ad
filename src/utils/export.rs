//! CSV export for comparisons: one row per layout run.
//!
//! Appends to a persistent file so sweeps and repeated sessions accumulate in one place;
//! the header is written only when the file is new or empty.

use std::{
    fs::{create_dir_all, OpenOptions},
    io::BufWriter,
    path::Path,
};

use csv::WriterBuilder;
use log::info;
use serde::Serialize;

use crate::{
    counter::{IncrementStrategy, LayoutKind},
    error::Result,
    harness::contention::RunResult,
    utils::report::LayoutComparison,
};

pub const DEFAULT_RESULTS_CSV: &str = "data/false_sharing_results.csv";

#[derive(Debug, Serialize)]
struct CsvRow {
    layout: LayoutKind,
    threads: usize,
    iterations_per_thread: u64,
    increment: IncrementStrategy,
    stride_bytes: usize,
    fences_issued: u64,
    elapsed_ms: f64,
    total_operations: u64,
    throughput_ops_per_sec: f64,
    speedup: Option<f64>,
}

impl CsvRow {
    fn new(result: &RunResult, speedup: Option<f64>) -> Self {
        Self {
            layout: result.layout,
            threads: result.thread_count,
            iterations_per_thread: result.iterations_per_thread,
            increment: result.increment,
            stride_bytes: result.layout.stride_bytes(),
            fences_issued: result.fences_issued,
            elapsed_ms: result.elapsed_millis(),
            total_operations: result.total_operations,
            throughput_ops_per_sec: result.throughput_ops_per_sec,
            speedup,
        }
    }
}

/// Appends two rows per comparison to `path`. The speedup column is set on the
/// padded row only. Returns the number of rows written.
pub fn export_comparisons_csv(path: impl AsRef<Path>, comparisons: &[LayoutComparison]) -> Result<usize> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir_all(parent)?;
    }

    let needs_header = path.metadata().map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut wtr = WriterBuilder::new()
        .has_headers(needs_header)
        .from_writer(BufWriter::new(file));

    let mut rows = 0;
    for c in comparisons {
        wtr.serialize(CsvRow::new(&c.naive, None))?;
        wtr.serialize(CsvRow::new(&c.padded, c.speedup))?;
        rows += 2;
    }
    wtr.flush()?;

    info!("Exported {} rows to {}", rows, path.display());
    Ok(rows)
}
