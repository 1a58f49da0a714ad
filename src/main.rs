//! # False-Sharing Benchmark Entry Point
//! Runs the naive (packed) and padded counter layouts with identical parameters and
//! reports how much throughput the shared cache lines cost.
//!
//! ## Modes
//! - **Single comparison:** user-chosen threads / iterations / fence interval.
//! - **Baseline:** 2 threads × 50M iterations, fence every 100 increments.
//! - **Sweep:** thread counts [1, 2, 4, 8, 12, 16] (capped at the hardware thread count);
//!   the speedup is expected to grow with the thread count.
//!
//! ## Outputs
//! - Console tables per comparison.
//! - `data/false_sharing_results.csv` — one row per layout run, appended across sessions.
//!
//! Logging via `RUST_LOG` (e.g. `RUST_LOG=info`).

use std::{
    io::{stdin, stdout, Write},
    time::Duration,
};

use cache_contention::{
    config::{BenchConfig, DEFAULT_ITERATIONS_PER_THREAD, DEFAULT_THREAD_COUNT},
    utils::{
        export::{export_comparisons_csv, DEFAULT_RESULTS_CSV},
        report::{LayoutComparison, ResultReporter},
        stats::{mean_speedup, summarize},
    },
    ContentionHarness, IncrementStrategy, Result,
};
use log::{error, info};

const THREAD_SWEEP: &[usize] = &[1, 2, 4, 8, 12, 16];
const SWEEP_ITERATIONS: u64 = 10_000_000;

fn main() {
    env_logger::init();
    info!("=== FALSE SHARING BENCHMARK START ===");
    println!("Hardware threads available: {}", num_cpus::get());

    loop {
        let outcome = match prompt_menu().as_str() {
            "1" => prompt_config().and_then(|(cfg, reps)| run_comparison(cfg, reps)),
            "2" | "" => {
                println!("Running baseline: {} threads x {} iterations.", DEFAULT_THREAD_COUNT, DEFAULT_ITERATIONS_PER_THREAD);
                run_comparison(BenchConfig::default(), 1)
            }
            "3" => {
                println!("Running thread sweep over {:?}", THREAD_SWEEP);
                run_sweep(THREAD_SWEEP)
            }
            "4" => {
                println!("Exiting. Goodbye!");
                info!("=== FALSE SHARING BENCHMARK FINISHED ===");
                return;
            }
            other => {
                println!("Unrecognized option '{}', please try again.", other);
                continue;
            }
        };

        match outcome {
            Ok(()) => println!("\n Benchmark completed. Returning to menu...\n"),
            Err(e) => error!("Benchmark aborted: {}", e),
        }
    }
}

fn prompt_menu() -> String {
    println!("\n┌─────────────────────────────────────────────┐");
    println!("│     SELECT BENCHMARK MODE                   │");
    println!("├─────────────────────────────────────────────┤");
    println!("│  1) Custom comparison                       │");
    println!("│  2) Baseline (2 threads, 50M iterations)    │");
    println!("│  3) Thread sweep {:<27}│", format!("{:?}", THREAD_SWEEP));
    println!("│  4) Exit                                    │");
    println!("└─────────────────────────────────────────────┘");
    prompt("Select [1/2/3/4] (default: 2): ")
}

fn prompt(message: &str) -> String {
    print!("{}", message);
    let _ = stdout().flush();
    let mut input = String::new();
    let _ = stdin().read_line(&mut input);
    input.trim().to_string()
}

fn prompt_or<T: std::str::FromStr>(message: &str, default: T) -> T {
    prompt(message).parse().unwrap_or(default)
}

fn prompt_config() -> Result<(BenchConfig, usize)> {
    let defaults = BenchConfig::default();
    let threads = prompt_or(
        &format!("Number of worker threads [default: {}]: ", defaults.thread_count),
        defaults.thread_count,
    );
    let iterations = prompt_or(
        &format!("Iterations per thread [default: {}]: ", defaults.iterations_per_thread),
        defaults.iterations_per_thread,
    );
    let fence = prompt_or("Fence every N increments, 0 = never [default: 100]: ", 100u64);
    let increment = match prompt("Increment: (f)etch_add or (p)lain [default: f]: ").as_str() {
        "p" | "plain" => IncrementStrategy::Plain,
        _ => IncrementStrategy::FetchAdd,
    };
    let pin = matches!(prompt("Pin worker i to core i? [y/N]: ").as_str(), "y" | "Y");
    let progress_ms = prompt_or("Progress sample interval in ms, 0 = off [default: 0]: ", 0u64);
    let repetitions = prompt_or("Repetitions [default: 1]: ", 1usize).max(1);

    let cfg = defaults
        .with_threads(threads)
        .with_iterations(iterations)
        .with_fence_interval(fence)
        .with_increment(increment)
        .with_pinning(pin)
        .with_progress_interval((progress_ms > 0).then(|| Duration::from_millis(progress_ms)));
    cfg.validate()?;
    Ok((cfg, repetitions))
}

fn run_comparison(config: BenchConfig, repetitions: usize) -> Result<()> {
    let reporter = ResultReporter;
    let mut harness = ContentionHarness::new(config)?;
    let comparisons = harness.repeat_comparison(repetitions)?;

    for c in &comparisons {
        reporter.print_report(&c.naive);
        reporter.print_report(&c.padded);
        reporter.print_comparison(c);
    }
    if comparisons.len() > 1 {
        print_summary(&comparisons);
    }

    export_comparisons_csv(DEFAULT_RESULTS_CSV, &comparisons)?;
    Ok(())
}

fn run_sweep(levels: &[usize]) -> Result<()> {
    let reporter = ResultReporter;
    let config = BenchConfig::default()
        .with_threads(1)
        .with_iterations(SWEEP_ITERATIONS);
    let mut harness = ContentionHarness::new(config)?;
    let comparisons = harness.sweep_thread_counts(levels)?;

    println!("\n=== THREAD SWEEP ({} iterations/thread) ===", SWEEP_ITERATIONS);
    print!("{}", reporter.sweep_table(&comparisons));

    export_comparisons_csv(DEFAULT_RESULTS_CSV, &comparisons)?;
    Ok(())
}

fn print_summary(comparisons: &[LayoutComparison]) {
    println!("\n=== SUMMARY OVER {} REPETITIONS ===", comparisons.len());
    for s in summarize(comparisons) {
        println!(
            "{:<7} mean {:.0} ops/s, min {:.0}, max {:.0}, spread {}",
            s.layout.to_string(),
            s.mean,
            s.min,
            s.max,
            s.relative_spread()
                .map_or_else(|| "n/a".to_string(), |p| format!("{:.1}%", p))
        );
    }
    match mean_speedup(comparisons) {
        Some(s) => println!("Mean padded / naive throughput: {:.2}x", s),
        None => println!("Mean padded / naive throughput: n/a"),
    }
}
