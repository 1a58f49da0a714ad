//! Benchmark parameters.
//!
//! Defaults are starting points only: the iteration count needed to make the
//! false-sharing penalty visible depends on the machine, so callers are expected
//! to tune `iterations_per_thread` and `thread_count`.

use std::{num::NonZeroU64, time::Duration};

use crate::{
    counter::{IncrementStrategy, LayoutKind},
    error::{BenchError, Result},
};

pub const DEFAULT_THREAD_COUNT: usize = 2;
pub const DEFAULT_ITERATIONS_PER_THREAD: u64 = 50_000_000;
pub const DEFAULT_FENCE_INTERVAL: u64 = 100;
pub const DEFAULT_CACHE_LINE_SIZE: usize = 64;

/// Parameters for one benchmark run (or a naive/padded pair).
#[derive(Debug, Clone, PartialEq)]
pub struct BenchConfig {
    pub thread_count: usize,
    pub iterations_per_thread: u64,
    /// Issue a full fence every N increments; `None` disables fences.
    pub fence_interval: Option<NonZeroU64>,
    /// Assumed cache line size in bytes, used to validate the padded stride.
    pub cache_line_size: usize,
    pub increment: IncrementStrategy,
    /// Pin worker `i` to core `i` (wrapping) when set.
    pub pin_cores: bool,
    /// Sample counters at this interval while workers run.
    pub progress_interval: Option<Duration>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            thread_count: DEFAULT_THREAD_COUNT,
            iterations_per_thread: DEFAULT_ITERATIONS_PER_THREAD,
            fence_interval: NonZeroU64::new(DEFAULT_FENCE_INTERVAL),
            cache_line_size: DEFAULT_CACHE_LINE_SIZE,
            increment: IncrementStrategy::FetchAdd,
            pin_cores: false,
            progress_interval: None,
        }
    }
}

impl BenchConfig {
    pub fn with_threads(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count;
        self
    }

    pub fn with_iterations(mut self, iterations_per_thread: u64) -> Self {
        self.iterations_per_thread = iterations_per_thread;
        self
    }

    /// `0` disables fences.
    pub fn with_fence_interval(mut self, every: u64) -> Self {
        self.fence_interval = NonZeroU64::new(every);
        self
    }

    pub fn with_cache_line_size(mut self, bytes: usize) -> Self {
        self.cache_line_size = bytes;
        self
    }

    pub fn with_increment(mut self, increment: IncrementStrategy) -> Self {
        self.increment = increment;
        self
    }

    pub fn with_pinning(mut self, pin_cores: bool) -> Self {
        self.pin_cores = pin_cores;
        self
    }

    pub fn with_progress_interval(mut self, interval: Option<Duration>) -> Self {
        self.progress_interval = interval;
        self
    }

    /// `thread_count * iterations_per_thread`, or `None` when it does not fit a `u64`.
    pub fn checked_total_operations(&self) -> Option<u64> {
        (self.thread_count as u64).checked_mul(self.iterations_per_thread)
    }

    /// Saturates at `u64::MAX`; [`validate`](Self::validate) rejects configs where it would.
    pub fn total_operations(&self) -> u64 {
        (self.thread_count as u64).saturating_mul(self.iterations_per_thread)
    }

    /// Checks the parameters against the hardware this process runs on.
    pub fn validate(&self) -> Result<()> {
        self.validate_against(num_cpus::get())
    }

    /// Same as [`validate`](Self::validate) with an explicit hardware thread count.
    pub fn validate_against(&self, available_threads: usize) -> Result<()> {
        if self.thread_count == 0 {
            return Err(BenchError::InvalidConfig(
                "thread count must be at least 1".into(),
            ));
        }
        if self.thread_count > available_threads {
            return Err(BenchError::TooManyThreads {
                requested: self.thread_count,
                available: available_threads,
            });
        }
        if self.checked_total_operations().is_none() {
            return Err(BenchError::InvalidConfig(format!(
                "{} threads x {} iterations overflows the operation count",
                self.thread_count, self.iterations_per_thread
            )));
        }
        if !self.cache_line_size.is_power_of_two() || self.cache_line_size < size_of::<u64>() {
            return Err(BenchError::InvalidConfig(format!(
                "cache line size must be a power of two of at least {} bytes, got {}",
                size_of::<u64>(),
                self.cache_line_size
            )));
        }
        let stride = LayoutKind::Padded.stride_bytes();
        if self.cache_line_size > stride {
            return Err(BenchError::CacheLineTooLarge {
                requested: self.cache_line_size,
                stride,
            });
        }
        if let Some(interval) = self.progress_interval {
            if interval.is_zero() {
                return Err(BenchError::InvalidConfig(
                    "progress interval must be non-zero".into(),
                ));
            }
        }
        Ok(())
    }
}
