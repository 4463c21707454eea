//! Core types, traits, and utilities for wsopt
//!
//! This crate provides the domain types, error handling, settings, the
//! reporting calendar, performance averages and the collaborator traits used
//! by the other wsopt crates.

pub mod calendar;
pub mod collaborator;
pub mod error;
pub mod performance;
pub mod settings;
pub mod types;


// Re-export commonly used types
pub use calendar::ReportingCalendar;
pub use collaborator::{
    ConnectionStatus, FailedRequest, Metric, MetricQuery, MonitoringClient, Statistic,
    WorkspacesClient,
};
pub use error::{Result, WsoptError};
pub use performance::{PerformanceMetrics, WeightedAverage};
pub use settings::Settings;
pub use types::{
    BillingDecision, LastConnection, PriorUsage, ReportRow, ResultCode, RunningMode, Sample,
    Session, Tag, TerminationDecision, TerminationPolicy, TimeRange, Workspace, WorkspaceId,
};
