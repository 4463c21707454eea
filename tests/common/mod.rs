//! Common test utilities and helpers for wsopt tests
//!
//! In-memory collaborators standing in for the monitoring service and the
//! control plane, plus builders for workspaces and sample series.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::env;
use std::sync::Mutex;
use wsopt::{RunningMode, Workspace, WorkspaceId, WsoptError};
use wsopt_core::collaborator::{
    ConnectionStatus, FailedRequest, Metric, MetricQuery, MonitoringClient, WorkspacesClient,
};
use wsopt_core::types::{Sample, Tag};

// Global mutex to serialize environment variable modifications in tests
pub static ENV_MUTEX: Lazy<tokio::sync::Mutex<()>> = Lazy::new(|| tokio::sync::Mutex::new(()));

/// RAII guard that restores touched environment variables on drop
#[derive(Default)]
pub struct EnvVarGuard {
    vars: Vec<(String, Option<String>)>,
}

impl EnvVarGuard {
    pub fn set(&mut self, key: &str, value: &str) {
        self.vars.push((key.to_string(), env::var(key).ok()));
        unsafe {
            env::set_var(key, value);
        }
    }

    pub fn remove(&mut self, key: &str) {
        self.vars.push((key.to_string(), env::var(key).ok()));
        unsafe {
            env::remove_var(key);
        }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        for (key, value) in self.vars.iter().rev() {
            unsafe {
                match value {
                    Some(v) => env::set_var(key, v),
                    None => env::remove_var(key),
                }
            }
        }
    }
}

pub fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

/// Builder for a 5-minute connectivity series
pub struct SampleSeries {
    cursor: DateTime<Utc>,
    samples: Vec<Sample>,
}

impl SampleSeries {
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            cursor: start,
            samples: Vec::new(),
        }
    }

    fn push(mut self, value: f64, periods: usize) -> Self {
        for _ in 0..periods {
            self.samples.push(Sample::new(self.cursor, value));
            self.cursor += Duration::minutes(5);
        }
        self
    }

    pub fn connected(self, periods: usize) -> Self {
        self.push(1.0, periods)
    }

    pub fn idle(self, periods: usize) -> Self {
        self.push(0.0, periods)
    }

    /// Jump ahead without emitting samples
    pub fn skip(mut self, duration: Duration) -> Self {
        self.cursor += duration;
        self
    }

    pub fn build(self) -> Vec<Sample> {
        self.samples
    }
}

/// Samples from a list of 0/1 values, 5 minutes apart
pub fn samples_from(values: &[u8], start: DateTime<Utc>) -> Vec<Sample> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| Sample::new(start + Duration::minutes(5 * i as i64), f64::from(*v)))
        .collect()
}

/// Builder for test workspaces
pub struct WorkspaceBuilder {
    workspace: Workspace,
}

impl WorkspaceBuilder {
    pub fn hourly(id: &str, timeout_minutes: u32) -> Self {
        Self {
            workspace: Workspace::new(id, RunningMode::AutoStop, "STANDARD")
                .with_auto_stop_timeout(timeout_minutes),
        }
    }

    pub fn monthly(id: &str) -> Self {
        Self {
            workspace: Workspace::new(id, RunningMode::AlwaysOn, "STANDARD"),
        }
    }

    pub fn with_mode(mut self, mode: RunningMode) -> Self {
        self.workspace.running_mode = mode;
        self
    }

    pub fn bundle(mut self, bundle_type: &str) -> Self {
        self.workspace.bundle_type = bundle_type.to_string();
        self
    }

    pub fn standby(mut self) -> Self {
        self.workspace = self.workspace.with_standby(true);
        self
    }

    pub fn maintenance(mut self) -> Self {
        self.workspace = self.workspace.with_maintenance_mode(true);
        self
    }

    pub fn build(self) -> Workspace {
        self.workspace
    }
}

/// Monitoring service backed by in-memory series
#[derive(Default)]
pub struct InMemoryMonitoring {
    series: HashMap<(String, Metric), Vec<Sample>>,
    failing: HashSet<(String, Metric)>,
    queries: Mutex<Vec<MetricQuery>>,
}

impl InMemoryMonitoring {
    pub fn with_series(mut self, workspace_id: &str, metric: Metric, samples: Vec<Sample>) -> Self {
        self.series.insert((workspace_id.to_string(), metric), samples);
        self
    }

    pub fn with_connectivity(self, workspace_id: &str, samples: Vec<Sample>) -> Self {
        self.with_series(workspace_id, Metric::UserConnected, samples)
    }

    /// One availability datapoint per hour over the given span
    pub fn available_between(self, workspace_id: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        let mut samples = Vec::new();
        let mut at = from;
        while at < to {
            samples.push(Sample::new(at, 1.0));
            at += Duration::hours(1);
        }
        self.with_series(workspace_id, Metric::Available, samples)
    }

    pub fn failing(mut self, workspace_id: &str, metric: Metric) -> Self {
        self.failing.insert((workspace_id.to_string(), metric));
        self
    }

    pub fn queries(&self) -> Vec<MetricQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub fn queries_for(&self, workspace_id: &str) -> usize {
        self.queries()
            .iter()
            .filter(|q| q.workspace_id.as_str() == workspace_id)
            .count()
    }
}

#[async_trait]
impl MonitoringClient for InMemoryMonitoring {
    async fn query(&self, query: &MetricQuery) -> wsopt::Result<Vec<Sample>> {
        self.queries.lock().unwrap().push(query.clone());
        let key = (query.workspace_id.as_str().to_string(), query.metric);
        if self.failing.contains(&key) {
            return Err(WsoptError::Monitoring("Throttling: rate exceeded".to_string()));
        }

        // Arrival order is not chronological
        let mut points: Vec<Sample> = self
            .series
            .get(&key)
            .map(|samples| {
                samples
                    .iter()
                    .filter(|s| s.timestamp >= query.range.start && s.timestamp < query.range.end)
                    .copied()
                    .collect()
            })
            .unwrap_or_default();
        points.reverse();
        Ok(points)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminateBehavior {
    Confirm,
    Refuse,
    Fail,
}

/// Control plane backed by in-memory state
pub struct InMemoryControlPlane {
    tags: HashMap<String, Vec<Tag>>,
    unreadable_tags: HashSet<String>,
    rejected_mode_changes: HashSet<String>,
    connections: HashMap<String, Option<DateTime<Utc>>>,
    connection_lookup_fails: bool,
    terminate_behavior: TerminateBehavior,
    modes: Mutex<HashMap<String, RunningMode>>,
    mode_calls: Mutex<Vec<(WorkspaceId, RunningMode)>>,
    terminated: Mutex<Vec<WorkspaceId>>,
}

impl Default for InMemoryControlPlane {
    fn default() -> Self {
        Self {
            tags: HashMap::new(),
            unreadable_tags: HashSet::new(),
            rejected_mode_changes: HashSet::new(),
            connections: HashMap::new(),
            connection_lookup_fails: false,
            terminate_behavior: TerminateBehavior::Confirm,
            modes: Mutex::new(HashMap::new()),
            mode_calls: Mutex::new(Vec::new()),
            terminated: Mutex::new(Vec::new()),
        }
    }
}

impl InMemoryControlPlane {
    pub fn with_tags(mut self, workspace_id: &str, tags: Vec<Tag>) -> Self {
        self.tags.insert(workspace_id.to_string(), tags);
        self
    }

    pub fn with_unreadable_tags(mut self, workspace_id: &str) -> Self {
        self.unreadable_tags.insert(workspace_id.to_string());
        self
    }

    pub fn rejecting_mode_change(mut self, workspace_id: &str) -> Self {
        self.rejected_mode_changes.insert(workspace_id.to_string());
        self
    }

    pub fn with_last_connection(mut self, workspace_id: &str, at: Option<DateTime<Utc>>) -> Self {
        self.connections.insert(workspace_id.to_string(), at);
        self
    }

    pub fn with_failing_connection_lookup(mut self) -> Self {
        self.connection_lookup_fails = true;
        self
    }

    pub fn terminate_behavior(mut self, behavior: TerminateBehavior) -> Self {
        self.terminate_behavior = behavior;
        self
    }

    pub fn mode_of(&self, workspace_id: &str) -> Option<RunningMode> {
        self.modes.lock().unwrap().get(workspace_id).cloned()
    }

    pub fn mode_calls(&self) -> Vec<(WorkspaceId, RunningMode)> {
        self.mode_calls.lock().unwrap().clone()
    }

    pub fn terminated(&self) -> Vec<WorkspaceId> {
        self.terminated.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkspacesClient for InMemoryControlPlane {
    async fn describe_tags(&self, workspace_id: &WorkspaceId) -> wsopt::Result<Vec<Tag>> {
        if self.unreadable_tags.contains(workspace_id.as_str()) {
            return Err(WsoptError::ControlPlane("AccessDenied".to_string()));
        }
        Ok(self.tags.get(workspace_id.as_str()).cloned().unwrap_or_default())
    }

    async fn modify_running_mode(
        &self,
        workspace_id: &WorkspaceId,
        mode: &RunningMode,
    ) -> wsopt::Result<()> {
        self.mode_calls
            .lock()
            .unwrap()
            .push((workspace_id.clone(), mode.clone()));
        if self.rejected_mode_changes.contains(workspace_id.as_str()) {
            return Err(WsoptError::ControlPlane(
                "OperationNotSupportedException".to_string(),
            ));
        }
        self.modes
            .lock()
            .unwrap()
            .insert(workspace_id.as_str().to_string(), mode.clone());
        Ok(())
    }

    async fn terminate(&self, workspace_id: &WorkspaceId) -> wsopt::Result<Vec<FailedRequest>> {
        match self.terminate_behavior {
            TerminateBehavior::Confirm => {
                self.terminated.lock().unwrap().push(workspace_id.clone());
                Ok(Vec::new())
            }
            TerminateBehavior::Refuse => Ok(vec![FailedRequest {
                workspace_id: workspace_id.clone(),
                error_code: "InvalidResourceState".to_string(),
                error_message: "The workspace is being modified".to_string(),
            }]),
            TerminateBehavior::Fail => Err(WsoptError::ControlPlane("InternalError".to_string())),
        }
    }

    async fn connection_status(
        &self,
        workspace_ids: &[WorkspaceId],
    ) -> wsopt::Result<Vec<ConnectionStatus>> {
        if self.connection_lookup_fails {
            return Err(WsoptError::ControlPlane("ThrottlingException".to_string()));
        }
        Ok(workspace_ids
            .iter()
            .filter_map(|id| {
                self.connections.get(id.as_str()).map(|at| ConnectionStatus {
                    workspace_id: id.clone(),
                    last_known_user_connection: *at,
                })
            })
            .collect())
    }
}
