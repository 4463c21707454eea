//! Metric sampling, session reconstruction and billable hours for wsopt
//!
//! This crate turns raw connectivity samples from the monitoring service
//! into the billable-hours figure the billing decision is based on, and
//! averages the performance metrics reported alongside it.

pub mod billable_hours;
pub mod performance;
pub mod sample_fetcher;
pub mod sessions;
pub mod time_range;

#[cfg(test)]
mod test_support;

pub use billable_hours::{BillableHoursCalculator, billable_hours};
pub use performance::PerformanceCollector;
pub use sample_fetcher::SampleFetcher;
pub use sessions::{IdleTimeout, SessionReconstructor};
pub use time_range::TimeRangeChunker;
