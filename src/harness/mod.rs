// Contention harness: worker hot loops, run orchestration and the optional
// progress observer. Workers own one counter each for the whole run; the
// harness is the only thing that spawns or joins them.

pub mod contention;
pub mod progress;
pub mod worker;
