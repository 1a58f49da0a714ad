// Reporting, summary statistics and CSV export for finished runs.

pub mod export;
pub mod report;
pub mod stats;
