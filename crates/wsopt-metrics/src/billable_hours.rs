//! Billable hours calculation
//!
//! Turns reconstructed sessions into the hours a workspace is billed for in
//! the hourly mode. Every session is followed by an idle window before the
//! workspace auto-stops, and that window is billed too, so the idle timeout
//! is added once per session.
//!
//! # Examples
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use wsopt_core::types::Session;
//! use wsopt_metrics::billable_hours::billable_hours;
//! use wsopt_metrics::sessions::IdleTimeout;
//!
//! let at = Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap();
//! let sessions = vec![
//!     Session { start: at, end: at, periods: 30 }, // 3 hours
//!     Session { start: at, end: at, periods: 6 },  // 1 hour
//! ];
//!
//! // 4 hours of use plus two 60-minute idle windows
//! assert_eq!(billable_hours(&sessions, IdleTimeout::from_minutes(60)), 6);
//! ```

use crate::sample_fetcher::SampleFetcher;
use crate::sessions::{IdleTimeout, SessionReconstructor};
use tracing::debug;
use wsopt_core::collaborator::Metric;
use wsopt_core::types::{PriorUsage, Session, TimeRange, Workspace};

/// Session hours plus one idle timeout per session, truncated to whole hours
pub fn billable_hours(sessions: &[Session], idle: IdleTimeout) -> u64 {
    let session_minutes: u64 = sessions
        .iter()
        .map(|s| u64::from(s.duration_hours()) * 60)
        .sum();
    let idle_minutes = sessions.len() as u64 * u64::from(idle.minutes());
    (session_minutes + idle_minutes) / 60
}

/// Window still to analyze and hours already billed before it
///
/// A prior record from the current month moves the window start to where the
/// earlier cycle stopped and carries its hours forward. Records from before
/// the window are ignored.
pub fn remaining_window(window: TimeRange, prior: Option<&PriorUsage>) -> (TimeRange, u64) {
    match prior {
        Some(prior) if prior.applies_to(window) => (
            TimeRange::new(prior.last_reported_period, window.end),
            prior.billable_hours,
        ),
        _ => (window, 0),
    }
}

/// Computes billable hours for one workspace over a reporting window
#[derive(Clone)]
pub struct BillableHoursCalculator {
    fetcher: SampleFetcher,
    flat_rate_idle_hours: u32,
}

impl BillableHoursCalculator {
    /// `flat_rate_idle_hours` is the idle timeout assumed for flat-rate workspaces
    pub fn new(fetcher: SampleFetcher, flat_rate_idle_hours: u32) -> Self {
        Self {
            fetcher,
            flat_rate_idle_hours,
        }
    }

    /// Billable hours for `workspace` in `window`
    ///
    /// Returns `None` when the samples could not be fetched; no segmentation
    /// is attempted then. The total never exceeds the carried hours plus the
    /// whole hours elapsed in the analyzed window.
    pub async fn calculate(
        &self,
        workspace: &Workspace,
        window: TimeRange,
        prior: Option<&PriorUsage>,
    ) -> Option<u64> {
        let (window, carried) = remaining_window(window, prior);
        let samples = self
            .fetcher
            .fetch(&workspace.id, Metric::UserConnected, window)
            .await?;

        let idle = IdleTimeout::for_workspace(workspace, self.flat_rate_idle_hours);
        let reconstructor = SessionReconstructor::for_timeout(idle);
        let sessions = reconstructor.reconstruct(&SessionReconstructor::prepare(samples));

        let hours = billable_hours(&sessions, idle) + carried;
        let cap = carried + window.whole_hours();
        if hours > cap {
            debug!(
                workspace_id = %workspace.id,
                "Capping billable hours {} at {} (carried {} + {} hours in window)",
                hours,
                cap,
                carried,
                window.whole_hours()
            );
            return Some(cap);
        }

        debug!(
            workspace_id = %workspace.id,
            "Billable hours {} from {} sessions",
            hours,
            sessions.len()
        );
        Some(hours)
    }
}
