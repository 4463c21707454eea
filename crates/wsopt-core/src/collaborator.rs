//! Collaborator traits for the monitoring service and the control plane
//!
//! The optimizer never talks to a cloud API directly. Callers plug in
//! implementations of these traits; retries and backoff belong to those
//! implementations, not to the optimizer.

use crate::error::Result;
use crate::types::{RunningMode, Sample, Tag, TimeRange, WorkspaceId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Namespace all workspace metrics live in
pub const WORKSPACES_NAMESPACE: &str = "AWS/WorkSpaces";

/// Workspace metrics the optimizer queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    /// 1 while a user connection is observed
    UserConnected,
    /// Present while the workspace exists and is available
    Available,
    InSessionLatency,
    CpuUsage,
    MemoryUsage,
    RootVolumeDiskUsage,
    UserVolumeDiskUsage,
    UdpPacketLossRate,
}

impl Metric {
    /// Metrics averaged into the per-workspace performance report
    pub const PERFORMANCE: [Metric; 6] = [
        Metric::InSessionLatency,
        Metric::CpuUsage,
        Metric::MemoryUsage,
        Metric::RootVolumeDiskUsage,
        Metric::UserVolumeDiskUsage,
        Metric::UdpPacketLossRate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::UserConnected => "UserConnected",
            Self::Available => "Available",
            Self::InSessionLatency => "InSessionLatency",
            Self::CpuUsage => "CPUUsage",
            Self::MemoryUsage => "MemoryUsage",
            Self::RootVolumeDiskUsage => "RootVolumeDiskUsage",
            Self::UserVolumeDiskUsage => "UserVolumeDiskUsage",
            Self::UdpPacketLossRate => "UDPPacketLossRate",
        }
    }

    pub fn is_performance(&self) -> bool {
        Self::PERFORMANCE.contains(self)
    }

    /// Connectivity metrics are 0/1 flags and take the period maximum;
    /// performance metrics take the period average.
    pub fn statistic(&self) -> Statistic {
        if self.is_performance() {
            Statistic::Average
        } else {
            Statistic::Maximum
        }
    }
}

/// Aggregation applied to each period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statistic {
    Maximum,
    Average,
}

/// A single time-series query against the monitoring service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricQuery {
    pub workspace_id: WorkspaceId,
    pub namespace: String,
    pub metric: Metric,
    pub range: TimeRange,
    pub period_secs: u32,
    pub statistic: Statistic,
}

impl MetricQuery {
    /// Query a workspace metric with the statistic that metric is reported with
    pub fn new(workspace_id: &WorkspaceId, metric: Metric, range: TimeRange, period_secs: u32) -> Self {
        Self {
            workspace_id: workspace_id.clone(),
            namespace: WORKSPACES_NAMESPACE.to_string(),
            metric,
            range,
            period_secs,
            statistic: metric.statistic(),
        }
    }
}

/// Last-known connection entry returned by the control plane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub workspace_id: WorkspaceId,
    pub last_known_user_connection: Option<DateTime<Utc>>,
}

/// A terminate request the control plane refused
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedRequest {
    pub workspace_id: WorkspaceId,
    pub error_code: String,
    pub error_message: String,
}

/// Read access to the monitoring service.
#[async_trait]
pub trait MonitoringClient: Send + Sync {
    /// Run one query; datapoints come back in arrival order.
    async fn query(&self, query: &MetricQuery) -> Result<Vec<Sample>>;
}

/// Read and write access to the workspace control plane.
#[async_trait]
pub trait WorkspacesClient: Send + Sync {
    /// Tags attached to a workspace.
    async fn describe_tags(&self, workspace_id: &WorkspaceId) -> Result<Vec<Tag>>;

    /// Switch a workspace to another running mode.
    async fn modify_running_mode(&self, workspace_id: &WorkspaceId, mode: &RunningMode)
    -> Result<()>;

    /// Request termination; the returned list holds the refused requests.
    async fn terminate(&self, workspace_id: &WorkspaceId) -> Result<Vec<FailedRequest>>;

    /// Last-known user connection for each requested workspace.
    async fn connection_status(&self, workspace_ids: &[WorkspaceId])
    -> Result<Vec<ConnectionStatus>>;
}
