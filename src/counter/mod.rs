//! Thread-owned counters with a controlled memory layout.
//!
//! - **NaiveCounter:** a bare 8-byte cell; an array packs eight of them into every
//!   64-byte line, so neighbouring workers invalidate each other's line on every write.
//! - **PaddedCounter:** the same cell inside `CachePadded`, so no two counters ever
//!   share a line.
//!
//! Each counter has exactly one writer for the duration of a run. The cells are
//! atomics only so the progress monitor may take relaxed snapshots without a data
//! race; correctness never depends on more than one writer.

pub mod array;

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use crossbeam::utils::CachePadded;
use serde::Serialize;

pub use array::CounterArray;

/// How a worker bumps its counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IncrementStrategy {
    /// Relaxed load followed by a relaxed store. Valid only because each counter
    /// has a single writer; no locked read-modify-write instruction is issued.
    Plain,
    /// One relaxed `fetch_add` per increment.
    #[default]
    FetchAdd,
}

impl fmt::Display for IncrementStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncrementStrategy::Plain => write!(f, "plain"),
            IncrementStrategy::FetchAdd => write!(f, "fetch_add"),
        }
    }
}

/// A mutable integer counter owned by one worker thread.
pub trait Counter: Default + Send + Sync + 'static {
    /// Layout this counter type produces when packed into a [`CounterArray`].
    const LAYOUT: LayoutKind;

    /// The underlying 8-byte cell.
    fn cell(&self) -> &AtomicU64;

    #[inline]
    fn increment(&self) {
        self.cell().fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn increment_with(&self, strategy: IncrementStrategy) {
        match strategy {
            IncrementStrategy::Plain => {
                let cell = self.cell();
                let v = cell.load(Ordering::Relaxed);
                cell.store(v.wrapping_add(1), Ordering::Relaxed);
            }
            IncrementStrategy::FetchAdd => self.increment(),
        }
    }

    /// Current value. Exact once the owning worker has been joined; while it
    /// runs this is only a snapshot.
    #[inline]
    fn read(&self) -> u64 {
        self.cell().load(Ordering::Relaxed)
    }
}

/// Tightly packed counter: stride equals the value size.
#[derive(Debug, Default)]
#[repr(transparent)]
pub struct NaiveCounter {
    value: AtomicU64,
}

impl Counter for NaiveCounter {
    const LAYOUT: LayoutKind = LayoutKind::Naive;

    #[inline]
    fn cell(&self) -> &AtomicU64 {
        &self.value
    }
}

/// Counter padded and aligned to at least one cache line.
#[derive(Debug, Default)]
pub struct PaddedCounter {
    value: CachePadded<AtomicU64>,
}

impl Counter for PaddedCounter {
    const LAYOUT: LayoutKind = LayoutKind::Padded;

    #[inline]
    fn cell(&self) -> &AtomicU64 {
        &self.value
    }
}

/// Which counter layout a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    Naive,
    Padded,
}

impl LayoutKind {
    pub const ALL: [LayoutKind; 2] = [LayoutKind::Naive, LayoutKind::Padded];

    /// Bytes between the start of one counter and the next in an array.
    pub const fn stride_bytes(self) -> usize {
        match self {
            LayoutKind::Naive => size_of::<NaiveCounter>(),
            LayoutKind::Padded => size_of::<PaddedCounter>(),
        }
    }

    /// How many counters of this layout fit in one line of `cache_line_size` bytes.
    pub const fn counters_per_line(self, cache_line_size: usize) -> usize {
        let stride = self.stride_bytes();
        if stride >= cache_line_size {
            1
        } else {
            cache_line_size / stride
        }
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutKind::Naive => write!(f, "naive"),
            LayoutKind::Padded => write!(f, "padded"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naive_counter_is_tightly_packed() {
        assert_eq!(size_of::<NaiveCounter>(), size_of::<u64>());
        assert_eq!(LayoutKind::Naive.stride_bytes(), 8);
        assert_eq!(LayoutKind::Naive.counters_per_line(64), 8);
    }

    #[test]
    fn padded_counter_covers_a_cache_line() {
        assert!(size_of::<PaddedCounter>() >= size_of::<u64>());
        assert!(align_of::<PaddedCounter>() >= 32);
        assert_eq!(size_of::<PaddedCounter>() % align_of::<PaddedCounter>(), 0);
        assert_eq!(LayoutKind::Padded.counters_per_line(32), 1);
    }

    #[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
    #[test]
    fn padded_stride_at_least_64_on_common_targets() {
        assert!(LayoutKind::Padded.stride_bytes() >= 64);
        assert_eq!(LayoutKind::Padded.counters_per_line(64), 1);
    }

    #[test]
    fn increment_strategies_agree() {
        for strategy in [IncrementStrategy::Plain, IncrementStrategy::FetchAdd] {
            let naive = NaiveCounter::default();
            let padded = PaddedCounter::default();
            for _ in 0..10 {
                naive.increment_with(strategy);
                padded.increment_with(strategy);
            }
            assert_eq!(naive.read(), 10, "{strategy}");
            assert_eq!(padded.read(), 10, "{strategy}");
        }
    }

    #[test]
    fn counter_types_declare_their_layout() {
        assert_eq!(NaiveCounter::LAYOUT, LayoutKind::Naive);
        assert_eq!(PaddedCounter::LAYOUT, LayoutKind::Padded);
        assert_eq!(NaiveCounter::LAYOUT.stride_bytes(), size_of::<NaiveCounter>());
        assert_eq!(PaddedCounter::LAYOUT.stride_bytes(), size_of::<PaddedCounter>());
    }

    #[test]
    fn layout_names() {
        assert_eq!(LayoutKind::Naive.to_string(), "naive");
        assert_eq!(LayoutKind::Padded.to_string(), "padded");
        assert_eq!(IncrementStrategy::default(), IncrementStrategy::FetchAdd);
    }
}
