//! Core domain types for wsopt
//!
//! This module contains the fundamental types shared by every wsopt crate:
//! workspace identity and running mode, metric samples, reconstructed
//! sessions, billing decisions and termination outcomes. Only [`PriorUsage`]
//! carries state from one cycle to the next.

use crate::performance::PerformanceMetrics;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of sample periods that make up one billable hour
pub const PERIODS_PER_HOUR: u32 = 12;

/// Length of one monitoring sample period in minutes
pub const SAMPLE_PERIOD_MINUTES: u32 = 5;

/// Strongly-typed workspace identifier
///
/// # Examples
/// ```
/// use wsopt_core::types::WorkspaceId;
///
/// let id = WorkspaceId::new("ws-abc123");
/// assert_eq!(id.as_str(), "ws-abc123");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkspaceId(String);

impl WorkspaceId {
    /// Create a new WorkspaceId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for WorkspaceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Billing mode of a workspace
///
/// `AutoStop` is the hourly-metered mode, `AlwaysOn` the flat-rate mode.
/// Values the control plane reports that are neither are preserved verbatim
/// in `Unrecognized` so they can be reported back unchanged.
///
/// # Examples
/// ```
/// use wsopt_core::types::RunningMode;
///
/// let mode: RunningMode = "ALWAYS_ON".parse().unwrap();
/// assert_eq!(mode, RunningMode::AlwaysOn);
/// assert_eq!(RunningMode::AutoStop.to_string(), "AUTO_STOP");
///
/// let odd: RunningMode = "MANUAL".parse().unwrap();
/// assert!(!odd.is_recognized());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RunningMode {
    /// Billed per connected hour, suspends after an idle period
    AutoStop,
    /// Billed a fixed monthly rate
    AlwaysOn,
    /// Anything else the control plane reports
    Unrecognized(String),
}

impl RunningMode {
    /// Whether this is one of the two billing modes the optimizer manages
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }

    /// Wire name of the mode
    pub fn as_str(&self) -> &str {
        match self {
            Self::AutoStop => "AUTO_STOP",
            Self::AlwaysOn => "ALWAYS_ON",
            Self::Unrecognized(raw) => raw,
        }
    }
}

impl fmt::Display for RunningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RunningMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_string()))
    }
}

impl From<String> for RunningMode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "AUTO_STOP" => Self::AutoStop,
            "ALWAYS_ON" => Self::AlwaysOn,
            _ => Self::Unrecognized(value),
        }
    }
}

impl From<RunningMode> for String {
    fn from(mode: RunningMode) -> Self {
        mode.as_str().to_string()
    }
}

/// Resource tag attached to a workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    /// Tag without a value
    pub fn key_only(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }
}

/// A managed virtual desktop, as enumerated by the caller
///
/// `auto_stop_timeout_minutes` is only meaningful for `AutoStop` workspaces;
/// flat-rate workspaces use the global idle timeout from the settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub directory_id: String,
    pub running_mode: RunningMode,
    pub bundle_type: String,
    #[serde(default)]
    pub auto_stop_timeout_minutes: Option<u32>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub computer_name: Option<String>,
    /// The workspace is the standby half of a primary/standby pair
    #[serde(default)]
    pub standby: bool,
    /// The owning directory has maintenance mode enabled
    #[serde(default)]
    pub maintenance_mode: bool,
}

impl Workspace {
    pub fn new(
        id: impl Into<String>,
        running_mode: RunningMode,
        bundle_type: impl Into<String>,
    ) -> Self {
        Self {
            id: WorkspaceId::new(id),
            directory_id: String::new(),
            running_mode,
            bundle_type: bundle_type.into(),
            auto_stop_timeout_minutes: None,
            username: None,
            computer_name: None,
            standby: false,
            maintenance_mode: false,
        }
    }

    pub fn with_auto_stop_timeout(mut self, minutes: u32) -> Self {
        self.auto_stop_timeout_minutes = Some(minutes);
        self
    }

    pub fn with_directory(mut self, directory_id: impl Into<String>) -> Self {
        self.directory_id = directory_id.into();
        self
    }

    pub fn with_standby(mut self, standby: bool) -> Self {
        self.standby = standby;
        self
    }

    pub fn with_maintenance_mode(mut self, enabled: bool) -> Self {
        self.maintenance_mode = enabled;
        self
    }
}

/// Half-open interval `[start, end)` in UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Whole hours covered by the range, rounded down; zero when degenerate
    pub fn whole_hours(&self) -> u64 {
        self.duration().num_hours().max(0) as u64
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            self.start.format("%Y-%m-%dT%H:%M:%SZ"),
            self.end.format("%Y-%m-%dT%H:%M:%SZ")
        )
    }
}

/// One monitoring observation for a sample period
///
/// For the connectivity metric the maximum over a period is `1.0` when a
/// user connection was observed and `0.0` when none was.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// `Some(true)` for a connected period, `Some(false)` for an idle one,
    /// `None` for anything the connectivity metric should never produce.
    pub fn activity(&self) -> Option<bool> {
        if self.value == 1.0 {
            Some(true)
        } else if self.value == 0.0 {
            Some(false)
        } else {
            None
        }
    }
}

/// A reconstructed run of usage, tolerant to short idle gaps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Timestamp of the first connected sample
    pub start: DateTime<Utc>,
    /// Timestamp of the last connected sample
    pub end: DateTime<Utc>,
    /// Sample periods from the first to the last connected sample, inclusive
    pub periods: u32,
}

impl Session {
    /// Session length in whole hours, rounded up
    pub fn duration_hours(&self) -> u32 {
        self.periods.div_ceil(PERIODS_PER_HOUR)
    }
}

/// Outcome of a billing-mode evaluation
///
/// One canonical mapping to the short report marker and the display text.
///
/// # Examples
/// ```
/// use wsopt_core::types::ResultCode;
///
/// assert_eq!(ResultCode::ToAlwaysOn.marker(), "-M-");
/// assert_eq!(ResultCode::ToAlwaysOn.to_string(), "ToMonthly");
/// assert_eq!(ResultCode::Error.to_string(), "Failed to change the mode");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultCode {
    /// Converted from hourly to flat-rate billing
    ToAlwaysOn,
    /// Converted from flat-rate to hourly billing
    ToAutoStop,
    NoChange,
    Skipped,
    Error,
}

impl ResultCode {
    /// Short marker used in raw report rows
    pub fn marker(&self) -> &'static str {
        match self {
            Self::ToAlwaysOn => "-M-",
            Self::ToAutoStop => "-H-",
            Self::NoChange => "-N-",
            Self::Skipped => "-S-",
            Self::Error => "-E-",
        }
    }

    /// Human readable text shown in reports
    pub fn display_text(&self) -> &'static str {
        match self {
            Self::ToAlwaysOn => "ToMonthly",
            Self::ToAutoStop => "ToHourly",
            Self::NoChange => "No Change",
            Self::Skipped => "Skipped",
            Self::Error => "Failed to change the mode",
        }
    }

    /// Parse a short marker back into a result code
    pub fn from_marker(marker: &str) -> Option<Self> {
        [
            Self::ToAlwaysOn,
            Self::ToAutoStop,
            Self::NoChange,
            Self::Skipped,
            Self::Error,
        ]
        .into_iter()
        .find(|code| code.marker() == marker)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_text())
    }
}

/// Result code plus the mode the workspace is in afterwards
///
/// `new_mode` is the old mode whenever nothing took effect (skip, error,
/// no change).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingDecision {
    pub result: ResultCode,
    pub new_mode: RunningMode,
}

impl BillingDecision {
    pub fn new(result: ResultCode, new_mode: RunningMode) -> Self {
        Self { result, new_mode }
    }

    /// Decision that leaves the mode unchanged
    pub fn unchanged(result: ResultCode, mode: &RunningMode) -> Self {
        Self::new(result, mode.clone())
    }
}

/// Last known user connection of a workspace
///
/// "Never connected" and "lookup failed" have opposite conservative
/// treatments, so they are distinct variants rather than an optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LastConnection {
    /// The workspace has no recorded connection
    Never,
    /// The connection-status lookup failed
    Unavailable,
    /// Last recorded connection
    At(DateTime<Utc>),
}

impl LastConnection {
    /// Calendar date of the connection, when known
    pub fn date_label(&self) -> Option<String> {
        match self {
            Self::At(ts) => Some(ts.format("%Y-%m-%d").to_string()),
            Self::Never | Self::Unavailable => None,
        }
    }
}

/// Whether unused workspaces may be terminated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationPolicy {
    #[default]
    No,
    Yes,
    #[serde(rename = "Dry Run")]
    DryRun,
}

impl fmt::Display for TerminationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::No => write!(f, "No"),
            Self::Yes => write!(f, "Yes"),
            Self::DryRun => write!(f, "Dry Run"),
        }
    }
}

impl std::str::FromStr for TerminationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "no" => Ok(Self::No),
            "yes" => Ok(Self::Yes),
            "dry run" | "dryrun" => Ok(Self::DryRun),
            _ => Err(format!("Invalid termination policy: {s}")),
        }
    }
}

/// Outcome of the termination evaluation for one workspace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationDecision {
    /// Not terminated, or no evaluation happened
    #[default]
    None,
    /// Eligible, reported but not terminated
    DryRun,
    /// The terminate call was confirmed
    Terminated,
}

impl TerminationDecision {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for TerminationDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::DryRun => write!(f, "Yes - Dry Run"),
            Self::Terminated => write!(f, "Yes"),
        }
    }
}

/// Billing data carried over from an earlier cycle in the same month
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorUsage {
    pub billable_hours: u64,
    /// End of the window the earlier cycle analyzed
    pub last_reported_period: DateTime<Utc>,
    #[serde(default)]
    pub performance: PerformanceMetrics,
}

impl PriorUsage {
    pub fn new(billable_hours: u64, last_reported_period: DateTime<Utc>) -> Self {
        Self {
            billable_hours,
            last_reported_period,
            performance: PerformanceMetrics::default(),
        }
    }

    pub fn with_performance(mut self, performance: PerformanceMetrics) -> Self {
        self.performance = performance;
        self
    }

    /// Whether the earlier cycle belongs to the month `window` covers
    pub fn applies_to(&self, window: TimeRange) -> bool {
        self.last_reported_period >= window.start
    }
}

/// One output row per workspace, consumed by an external report builder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub workspace_id: WorkspaceId,
    /// `None` when no data could be fetched or the workspace was skipped
    pub billable_hours: Option<u64>,
    pub usage_threshold: Option<u64>,
    pub result: ResultCode,
    pub bundle_type: String,
    pub initial_mode: RunningMode,
    pub new_mode: RunningMode,
    pub termination: TerminationDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_known_connection: Option<String>,
    /// Month-to-date averages, carried into the next cycle's [`PriorUsage`]
    #[serde(default)]
    pub performance: PerformanceMetrics,
}

impl ReportRow {
    /// Usage to carry into the next cycle of the same month
    ///
    /// `reported_until` is the end of the window this row was computed for.
    /// Rows without billable hours carry nothing.
    pub fn carry_forward(&self, reported_until: DateTime<Utc>) -> Option<PriorUsage> {
        self.billable_hours.map(|hours| {
            PriorUsage::new(hours, reported_until).with_performance(self.performance)
        })
    }
}
