//! wsopt - billing-mode optimizer for managed virtual desktops
//!
//! This library decides, for each workspace, whether it should be billed per
//! hour or at a flat monthly rate:
//! - Fetches per-period connectivity samples through a monitoring collaborator
//! - Reconstructs usage sessions tolerant to short idle gaps
//! - Converts sessions into billable hours, including the idle window billed
//!   after each session
//! - Compares the hours to per-bundle limits and switches the running mode
//! - Keeps month-to-date averages of the workspace performance metrics
//! - Terminates, or reports, workspaces that went unused for a whole period
//!
//! The monitoring service and the control plane are reached through the
//! [`MonitoringClient`] and [`WorkspacesClient`] traits, so the crate carries
//! no cloud SDK of its own.
//!
//! # Examples
//!
//! ```no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use wsopt::{ReportingCalendar, Settings, WorkspaceProcessor};
//! # use wsopt::{MonitoringClient, WorkspacesClient, Workspace};
//!
//! # async fn run(
//! #     monitoring: Arc<dyn MonitoringClient>,
//! #     control_plane: Arc<dyn WorkspacesClient>,
//! #     workspaces: Vec<Workspace>,
//! # ) -> wsopt::Result<()> {
//! wsopt::logging::init(false)?;
//!
//! let settings = Settings::from_env()?;
//! let calendar = ReportingCalendar::current(settings.termination_check_months);
//! let processor = WorkspaceProcessor::new(monitoring, control_plane, settings, calendar);
//!
//! let report = processor.process_all(&workspaces, &HashMap::new()).await;
//! for row in &report.rows {
//!     println!("{} {} -> {}", row.workspace_id, row.result, row.new_mode);
//! }
//! # Ok(())
//! # }
//! ```

pub mod decision;
pub mod logging;
pub mod processor;
pub mod summary;
pub mod termination;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use decision::{BillingDecisionEngine, SKIP_TAG_KEY, has_skip_tag};
pub use processor::{CycleReport, WorkspaceProcessor};
pub use summary::CycleSummary;
pub use termination::{TerminationAssessment, TerminationEvaluator};
pub use wsopt_core::{
    BillingDecision, LastConnection, MonitoringClient, PerformanceMetrics, PriorUsage, ReportRow,
    ReportingCalendar, Result, ResultCode, RunningMode, Settings, TerminationDecision,
    TerminationPolicy, WeightedAverage, Workspace, WorkspaceId, WorkspacesClient, WsoptError,
};
pub use wsopt_metrics::{
    BillableHoursCalculator, PerformanceCollector, SampleFetcher, SessionReconstructor,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
