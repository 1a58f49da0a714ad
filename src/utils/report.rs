//! Human-readable reports for finished runs.
//!
//! The headline metric of a comparison is `padded_throughput / naive_throughput`. With two
//! or more threads on separate cores it is expected to be well above 1; with one thread the
//! two layouts should be indistinguishable.

use std::fmt::Write;

use crate::{counter::LayoutKind, harness::contention::RunResult};

/// Naive and padded results produced with identical parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutComparison {
    pub naive: RunResult,
    pub padded: RunResult,
    /// `padded / naive` throughput; `None` when the naive throughput is zero.
    pub speedup: Option<f64>,
}

impl LayoutComparison {
    pub fn new(naive: RunResult, padded: RunResult) -> Self {
        let speedup = speedup(&naive, &padded);
        Self {
            naive,
            padded,
            speedup,
        }
    }

    pub fn thread_count(&self) -> usize {
        self.naive.thread_count
    }
}

fn speedup(naive: &RunResult, padded: &RunResult) -> Option<f64> {
    if naive.throughput_ops_per_sec > 0.0 {
        Some(padded.throughput_ops_per_sec / naive.throughput_ops_per_sec)
    } else {
        None
    }
}

fn format_ops(ops_per_sec: f64) -> String {
    if ops_per_sec >= 1e9 {
        format!("{:.2} Gops/s", ops_per_sec / 1e9)
    } else if ops_per_sec >= 1e6 {
        format!("{:.2} Mops/s", ops_per_sec / 1e6)
    } else if ops_per_sec >= 1e3 {
        format!("{:.2} Kops/s", ops_per_sec / 1e3)
    } else {
        format!("{:.2} ops/s", ops_per_sec)
    }
}

fn format_speedup(speedup: Option<f64>) -> String {
    speedup.map_or_else(|| "n/a".to_string(), |s| format!("{:.2}x", s))
}

/// Turns `RunResult`s into text. Holds no state between calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResultReporter;

impl ResultReporter {
    /// Report for one run.
    pub fn report(&self, result: &RunResult) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== {} LAYOUT ===", result.layout.to_string().to_uppercase());
        let _ = writeln!(out, "Threads:            {}", result.thread_count);
        let _ = writeln!(out, "Iterations/thread:  {}", result.iterations_per_thread);
        let _ = writeln!(out, "Stride:             {} bytes", result.layout.stride_bytes());
        let _ = writeln!(out, "Increment:          {}", result.increment);
        let _ = writeln!(out, "Elapsed:            {:.2} ms", result.elapsed_millis());
        let _ = writeln!(out, "Total ops:          {}", result.total_operations);
        if result.total_operations == 0 {
            let _ = writeln!(out, "Throughput:         n/a (no operations)");
        } else {
            let _ = writeln!(out, "Throughput:         {}", format_ops(result.throughput_ops_per_sec));
            let _ = writeln!(out, "Per-thread:         {}", format_ops(result.per_thread_throughput()));
        }
        if result.layout == LayoutKind::Naive && result.thread_count > 1 {
            let _ = writeln!(
                out,
                "Expect lower throughput than padded: {} counters share each {}-byte cache line.",
                result.layout.counters_per_line(result.cache_line_size).min(result.thread_count),
                result.cache_line_size
            );
        }
        out
    }

    pub fn print_report(&self, result: &RunResult) {
        print!("{}", self.report(result));
    }

    /// Pairs two runs. Layout labels are taken as given.
    pub fn compare(&self, naive: &RunResult, padded: &RunResult) -> LayoutComparison {
        LayoutComparison::new(naive.clone(), padded.clone())
    }

    /// Side-by-side table with the speedup as headline.
    pub fn comparison_table(&self, comparison: &LayoutComparison) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "┌──────────┬──────────────┬──────────────────┬──────────────────┐");
        let _ = writeln!(out, "│ layout   │ elapsed (ms) │ throughput       │ per thread       │");
        let _ = writeln!(out, "├──────────┼──────────────┼──────────────────┼──────────────────┤");
        for r in [&comparison.naive, &comparison.padded] {
            let _ = writeln!(
                out,
                "│ {:<8} │ {:>12.2} │ {:>16} │ {:>16} │",
                r.layout.to_string(),
                r.elapsed_millis(),
                format_ops(r.throughput_ops_per_sec),
                format_ops(r.per_thread_throughput())
            );
        }
        let _ = writeln!(out, "└──────────┴──────────────┴──────────────────┴──────────────────┘");
        let _ = writeln!(
            out,
            "Padded / naive throughput: {} ({} threads)",
            format_speedup(comparison.speedup),
            comparison.thread_count()
        );
        out
    }

    pub fn print_comparison(&self, comparison: &LayoutComparison) {
        print!("{}", self.comparison_table(comparison));
    }

    /// One row per thread count.
    pub fn sweep_table(&self, comparisons: &[LayoutComparison]) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{:>7} | {:>16} | {:>16} | {:>8}", "threads", "naive", "padded", "speedup");
        let _ = writeln!(out, "{}", "-".repeat(56));
        for c in comparisons {
            let _ = writeln!(
                out,
                "{:>7} | {:>16} | {:>16} | {:>8}",
                c.thread_count(),
                format_ops(c.naive.throughput_ops_per_sec),
                format_ops(c.padded.throughput_ops_per_sec),
                format_speedup(c.speedup)
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::IncrementStrategy;
    use std::time::Duration;

    fn result(layout: LayoutKind, threads: usize, iterations: u64, millis: u64) -> RunResult {
        let total = threads as u64 * iterations;
        let elapsed = Duration::from_millis(millis);
        RunResult {
            layout,
            thread_count: threads,
            iterations_per_thread: iterations,
            increment: IncrementStrategy::FetchAdd,
            cache_line_size: 64,
            fences_issued: 0,
            elapsed,
            final_values: vec![iterations; threads],
            total_operations: total,
            throughput_ops_per_sec: crate::harness::contention::throughput(total, elapsed),
            progress: Vec::new(),
        }
    }

    #[test]
    fn speedup_is_padded_over_naive() {
        let reporter = ResultReporter;
        let naive = result(LayoutKind::Naive, 2, 1_000_000, 400);
        let padded = result(LayoutKind::Padded, 2, 1_000_000, 100);
        let cmp = reporter.compare(&naive, &padded);
        let s = cmp.speedup.unwrap();
        assert!((s - 4.0).abs() < 1e-9);
        assert!(reporter.comparison_table(&cmp).contains("4.00x"));
    }

    #[test]
    fn zero_iterations_have_no_speedup() {
        let naive = result(LayoutKind::Naive, 2, 0, 0);
        let padded = result(LayoutKind::Padded, 2, 0, 0);
        let cmp = LayoutComparison::new(naive, padded);
        assert_eq!(cmp.speedup, None);
        let table = ResultReporter.comparison_table(&cmp);
        assert!(table.contains("n/a"));
        assert!(ResultReporter.report(&cmp.naive).contains("no operations"));
    }

    #[test]
    fn naive_report_mentions_expectation() {
        let text = ResultReporter.report(&result(LayoutKind::Naive, 4, 10, 1));
        assert!(text.contains("NAIVE"));
        assert!(text.contains("Expect lower throughput"));
        let text = ResultReporter.report(&result(LayoutKind::Padded, 4, 10, 1));
        assert!(!text.contains("Expect lower throughput"));
    }

    #[test]
    fn naive_report_uses_configured_line_size() {
        let mut run = result(LayoutKind::Naive, 16, 10, 1);
        assert!(ResultReporter.report(&run).contains("8 counters share each 64-byte"));
        run.cache_line_size = 32;
        assert!(ResultReporter.report(&run).contains("4 counters share each 32-byte"));
        run.cache_line_size = 128;
        assert!(ResultReporter.report(&run).contains("16 counters share each 128-byte"));
    }

    #[test]
    fn sweep_table_has_row_per_level() {
        let rows: Vec<_> = [1, 2, 4]
            .iter()
            .map(|&t| {
                LayoutComparison::new(
                    result(LayoutKind::Naive, t, 100, 2),
                    result(LayoutKind::Padded, t, 100, 1),
                )
            })
            .collect();
        let table = ResultReporter.sweep_table(&rows);
        assert_eq!(table.lines().count(), 2 + 3);
    }

    #[test]
    fn ops_formatting_scales() {
        assert_eq!(format_ops(12.0), "12.00 ops/s");
        assert_eq!(format_ops(2_500.0), "2.50 Kops/s");
        assert_eq!(format_ops(3_000_000.0), "3.00 Mops/s");
        assert_eq!(format_ops(1.5e9), "1.50 Gops/s");
    }
}
