//! Per-thread hot loop that generates memory traffic on one counter.
//!
//! Each worker:
//! 1. **Core pinning (optional):** pins to its assigned core; a refused pin is logged, not fatal.
//! 2. **Hot loop:** exactly `iterations` increments on the one counter it owns.
//! 3. **Fence:** every `fence_interval` increments a full `SeqCst` fence forces the write
//!    out to the coherence fabric, so the line ping-pong stays observable.
//!
//! No I/O, no locks, no logging inside the loop.

use std::{
    num::NonZeroU64,
    sync::atomic::{fence, Ordering},
};

use core_affinity::{set_for_current, CoreId};
use log::{debug, warn};

use crate::counter::{Counter, CounterArray, IncrementStrategy};

/// Immutable binding of one worker to one counter for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerAssignment {
    pub worker_id: usize,
    pub counter_index: usize,
    pub iterations: u64,
    pub fence_interval: Option<NonZeroU64>,
    pub core: Option<CoreId>,
}

impl WorkerAssignment {
    /// Worker `i` owns counter `i`.
    pub fn new(worker_id: usize, iterations: u64) -> Self {
        Self {
            worker_id,
            counter_index: worker_id,
            iterations,
            fence_interval: None,
            core: None,
        }
    }

    pub fn with_fence_interval(mut self, fence_interval: Option<NonZeroU64>) -> Self {
        self.fence_interval = fence_interval;
        self
    }

    pub fn with_core(mut self, core: Option<CoreId>) -> Self {
        self.core = core;
        self
    }

    /// Number of fences the loop issues for this assignment.
    pub fn expected_fences(&self) -> u64 {
        self.fence_interval
            .map_or(0, |every| self.iterations / every.get())
    }
}

/// Builds one assignment per counter. With `pin_cores`, worker `i` gets core
/// `i % cores.len()`; an empty core list leaves every worker unpinned.
pub fn plan_assignments(
    thread_count: usize,
    iterations: u64,
    fence_interval: Option<NonZeroU64>,
    cores: &[CoreId],
) -> Vec<WorkerAssignment> {
    (0..thread_count)
        .map(|id| {
            let core = if cores.is_empty() {
                None
            } else {
                Some(cores[id % cores.len()])
            };
            WorkerAssignment::new(id, iterations)
                .with_fence_interval(fence_interval)
                .with_core(core)
        })
        .collect()
}

/// Runs the hot loop for `assignment`. Returns the number of fences issued.
///
/// Panics if the assigned counter index is outside `counters`; the harness only
/// builds assignments for indices it allocated.
pub fn run_worker<C: Counter>(
    assignment: &WorkerAssignment,
    counters: &CounterArray<C>,
    strategy: IncrementStrategy,
) -> u64 {
    if let Some(core) = assignment.core {
        if set_for_current(core) {
            debug!("Worker {}: pinned to core {:?}", assignment.worker_id, core);
        } else {
            warn!("Worker {}: failed to set affinity", assignment.worker_id);
        }
    }

    let counter = &counters[assignment.counter_index];
    let mut fences = 0u64;

    match assignment.fence_interval {
        Some(every) => {
            let every = every.get();
            let mut until_fence = every;
            for _ in 0..assignment.iterations {
                counter.increment_with(strategy);
                until_fence -= 1;
                if until_fence == 0 {
                    fence(Ordering::SeqCst);
                    fences += 1;
                    until_fence = every;
                }
            }
        }
        None => {
            for _ in 0..assignment.iterations {
                counter.increment_with(strategy);
            }
        }
    }

    fences
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::{NaiveCounter, PaddedCounter};

    #[test]
    fn worker_touches_only_its_counter() {
        let counters = CounterArray::<NaiveCounter>::new(4).unwrap();
        let a = WorkerAssignment::new(2, 1_000);
        run_worker(&a, &counters, IncrementStrategy::Plain);
        assert_eq!(counters.values(), vec![0, 0, 1_000, 0]);
    }

    #[test]
    fn fence_count_matches_interval() {
        let counters = CounterArray::<PaddedCounter>::new(1).unwrap();
        let a = WorkerAssignment::new(0, 1_050).with_fence_interval(NonZeroU64::new(100));
        let fences = run_worker(&a, &counters, IncrementStrategy::FetchAdd);
        assert_eq!(fences, 10);
        assert_eq!(a.expected_fences(), 10);
        assert_eq!(counters[0].read(), 1_050);
    }

    #[test]
    fn no_fences_without_interval() {
        let counters = CounterArray::<PaddedCounter>::new(1).unwrap();
        let a = WorkerAssignment::new(0, 500);
        assert_eq!(run_worker(&a, &counters, IncrementStrategy::FetchAdd), 0);
        assert_eq!(a.expected_fences(), 0);
    }

    #[test]
    fn zero_iterations_is_a_no_op() {
        let counters = CounterArray::<NaiveCounter>::new(1).unwrap();
        let a = WorkerAssignment::new(0, 0).with_fence_interval(NonZeroU64::new(1));
        assert_eq!(run_worker(&a, &counters, IncrementStrategy::Plain), 0);
        assert_eq!(counters[0].read(), 0);
    }

    #[test]
    fn plan_wraps_cores() {
        let cores = [CoreId { id: 0 }, CoreId { id: 1 }];
        let plan = plan_assignments(3, 10, None, &cores);
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[2].counter_index, 2);
        assert_eq!(plan[2].core, Some(CoreId { id: 0 }));
        assert!(plan_assignments(2, 10, None, &[]).iter().all(|a| a.core.is_none()));
    }
}
