//! Fixed-size counter arena: index `i` belongs to worker `i` for a whole run.

use std::{ops::Index, sync::atomic::AtomicU64};

use crate::{
    counter::Counter,
    error::{BenchError, Result},
};

/// Contiguous, fixed-length array of counters.
///
/// Allocated once per run and never resized, so counter addresses (and therefore
/// which counters share a cache line) are stable while workers run.
#[derive(Debug)]
pub struct CounterArray<C: Counter> {
    counters: Box<[C]>,
}

impl<C: Counter> CounterArray<C> {
    /// Allocates `len` zeroed counters. Allocation failure is reported, not retried.
    pub fn new(len: usize) -> Result<Self> {
        let mut counters = Vec::new();
        counters
            .try_reserve_exact(len)
            .map_err(|_| BenchError::Allocation { counters: len })?;
        counters.resize_with(len, C::default);
        Ok(Self {
            counters: counters.into_boxed_slice(),
        })
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&C> {
        self.counters.get(index)
    }

    pub fn stride_bytes(&self) -> usize {
        size_of::<C>()
    }

    /// Start address of counter `index`, for layout inspection.
    pub fn address_of(&self, index: usize) -> Option<usize> {
        self.counters.get(index).map(|c| c as *const C as usize)
    }

    /// Byte range `[start, end)` occupied by the value of counter `index`.
    pub fn value_range(&self, index: usize) -> Option<(usize, usize)> {
        self.counters.get(index).map(|c| {
            let start = c.cell() as *const AtomicU64 as usize;
            (start, start + size_of::<u64>())
        })
    }

    /// Current value of every counter, in index order.
    pub fn values(&self) -> Vec<u64> {
        self.counters.iter().map(Counter::read).collect()
    }

    pub fn sum(&self) -> u64 {
        self.counters.iter().map(Counter::read).sum()
    }
}

impl<C: Counter> Index<usize> for CounterArray<C> {
    type Output = C;

    fn index(&self, index: usize) -> &C {
        &self.counters[index]
    }
}
