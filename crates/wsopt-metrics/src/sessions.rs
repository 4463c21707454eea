//! Session reconstruction from connectivity samples
//!
//! The connectivity metric reports, per 5-minute period, whether a user
//! connection was observed. A session is a run of connected periods that
//! tolerates idle gaps shorter than the workspace's idle timeout: a gap of
//! `threshold` or more idle periods ends it.
//!
//! # Examples
//!
//! ```
//! use chrono::{Duration, TimeZone, Utc};
//! use wsopt_core::types::Sample;
//! use wsopt_metrics::sessions::SessionReconstructor;
//!
//! let start = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
//! let samples: Vec<Sample> = [1.0, 0.0, 0.0, 0.0, 1.0]
//!     .iter()
//!     .enumerate()
//!     .map(|(i, v)| Sample::new(start + Duration::minutes(5 * i as i64), *v))
//!     .collect();
//!
//! let sessions = SessionReconstructor::new(3).reconstruct(&samples);
//! assert_eq!(sessions.len(), 2);
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use wsopt_core::types::{RunningMode, SAMPLE_PERIOD_MINUTES, Sample, Session, Workspace};

/// How long a workspace stays billed after the last activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdleTimeout {
    minutes: u32,
}

impl IdleTimeout {
    pub fn from_minutes(minutes: u32) -> Self {
        Self { minutes }
    }

    pub fn from_hours(hours: u32) -> Self {
        Self {
            minutes: hours.saturating_mul(60),
        }
    }

    /// Idle timeout that applies to `workspace`
    ///
    /// Hourly workspaces carry their own auto-stop timeout. Flat-rate
    /// workspaces have none, so the global `flat_rate_hours` is used.
    pub fn for_workspace(workspace: &Workspace, flat_rate_hours: u32) -> Self {
        match (&workspace.running_mode, workspace.auto_stop_timeout_minutes) {
            (RunningMode::AutoStop, Some(minutes)) => Self::from_minutes(minutes),
            (RunningMode::AutoStop, None) => {
                warn!(
                    workspace_id = %workspace.id,
                    "Hourly workspace without auto-stop timeout, using {} hours",
                    flat_rate_hours
                );
                Self::from_hours(flat_rate_hours)
            }
            _ => Self::from_hours(flat_rate_hours),
        }
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    /// Consecutive idle periods that end a session, never less than one
    ///
    /// Timeouts under one sample period would give zero; they end a session
    /// after a single idle period instead.
    pub fn threshold_periods(&self) -> u32 {
        (self.minutes / SAMPLE_PERIOD_MINUTES).max(1)
    }
}

/// Segments a chronologically sorted sample series into sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReconstructor {
    idle_threshold: u32,
}

struct OpenSession {
    start_index: usize,
    end_index: usize,
    start: chrono::DateTime<chrono::Utc>,
    end: chrono::DateTime<chrono::Utc>,
    idle_periods: u32,
}

impl OpenSession {
    fn begin(index: usize, sample: &Sample) -> Self {
        Self {
            start_index: index,
            end_index: index + 1,
            start: sample.timestamp,
            end: sample.timestamp,
            idle_periods: 0,
        }
    }

    fn extend(&mut self, index: usize, sample: &Sample) {
        self.idle_periods = 0;
        self.end_index = index + 1;
        self.end = sample.timestamp;
    }

    fn close(self) -> Session {
        Session {
            start: self.start,
            end: self.end,
            periods: (self.end_index - self.start_index) as u32,
        }
    }
}

impl SessionReconstructor {
    /// `idle_threshold` is a count of idle periods
    ///
    /// A zero threshold is raised to one. Taken literally, zero would never
    /// close a session, so a workspace with a sub-5-minute timeout would bill
    /// its whole month as a single session. Here any idle period ends it.
    pub fn new(idle_threshold: u32) -> Self {
        Self {
            idle_threshold: idle_threshold.max(1),
        }
    }

    pub fn for_timeout(timeout: IdleTimeout) -> Self {
        Self::new(timeout.threshold_periods())
    }

    pub fn idle_threshold(&self) -> u32 {
        self.idle_threshold
    }

    /// Sort samples by time and collapse duplicate timestamps to their maximum
    pub fn prepare(mut samples: Vec<Sample>) -> Vec<Sample> {
        samples.sort_by_key(|s| s.timestamp);
        samples.dedup_by(|later, kept| {
            if later.timestamp == kept.timestamp {
                kept.value = kept.value.max(later.value);
                true
            } else {
                false
            }
        });
        samples
    }

    /// Sessions in `samples`, which must already be sorted
    ///
    /// One forward pass. A connected sample opens a session or extends the
    /// open one; an idle sample inside a session counts toward the threshold,
    /// and reaching it closes the session. Samples that are neither 0 nor 1
    /// are ignored but still occupy their period.
    pub fn reconstruct(&self, samples: &[Sample]) -> Vec<Session> {
        let mut sessions = Vec::new();
        let mut open: Option<OpenSession> = None;

        for (i, sample) in samples.iter().enumerate() {
            match sample.activity() {
                Some(true) => match open.as_mut() {
                    Some(session) => session.extend(i, sample),
                    None => open = Some(OpenSession::begin(i, sample)),
                },
                Some(false) => {
                    let idle_reached = open.as_mut().is_some_and(|session| {
                        session.idle_periods += 1;
                        session.idle_periods >= self.idle_threshold
                    });
                    if idle_reached {
                        if let Some(session) = open.take() {
                            sessions.push(session.close());
                        }
                    }
                }
                None => {}
            }
        }

        if let Some(session) = open {
            sessions.push(session.close());
        }

        debug!(
            "Reconstructed {} sessions from {} samples (idle threshold {})",
            sessions.len(),
            samples.len(),
            self.idle_threshold
        );
        sessions
    }
}
