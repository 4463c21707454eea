//! In-memory collaborators for unit tests
//!
//! Integration tests keep a fuller copy in tests/common/mod.rs, since this
//! module only exists under `#[cfg(test)]`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use wsopt_core::collaborator::{
    ConnectionStatus, FailedRequest, Metric, MetricQuery, MonitoringClient, WorkspacesClient,
};
use wsopt_core::error::{Result, WsoptError};
use wsopt_core::types::{RunningMode, Sample, Tag, WorkspaceId};

#[derive(Default)]
pub struct FakeMonitoring {
    series: HashMap<(String, Metric), Vec<Sample>>,
    available: HashSet<String>,
    failing: HashSet<Metric>,
}

impl FakeMonitoring {
    /// Connectivity samples
    pub fn with_samples(self, workspace_id: &str, samples: Vec<Sample>) -> Self {
        self.with_series(workspace_id, Metric::UserConnected, samples)
    }

    pub fn with_series(mut self, workspace_id: &str, metric: Metric, samples: Vec<Sample>) -> Self {
        self.series.insert((workspace_id.to_string(), metric), samples);
        self
    }

    /// The workspace reports availability in any probed range
    pub fn available(mut self, workspace_id: &str) -> Self {
        self.available.insert(workspace_id.to_string());
        self
    }

    pub fn failing(mut self, metric: Metric) -> Self {
        self.failing.insert(metric);
        self
    }
}

#[async_trait]
impl MonitoringClient for FakeMonitoring {
    async fn query(&self, query: &MetricQuery) -> Result<Vec<Sample>> {
        if self.failing.contains(&query.metric) {
            return Err(WsoptError::Monitoring("unavailable".to_string()));
        }
        let id = query.workspace_id.as_str();
        Ok(match query.metric {
            Metric::Available if self.available.contains(id) => {
                vec![Sample::new(query.range.start, 1.0)]
            }
            metric => self
                .series
                .get(&(id.to_string(), metric))
                .map(|samples| {
                    samples
                        .iter()
                        .filter(|s| s.timestamp >= query.range.start && s.timestamp < query.range.end)
                        .copied()
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}

#[derive(Default)]
pub struct FakeWorkspaces {
    tags: HashMap<String, Vec<Tag>>,
    failing_tags: bool,
    failing_mode_changes: bool,
    mode_changes: Mutex<Vec<(WorkspaceId, RunningMode)>>,
    connections: HashMap<String, Option<DateTime<Utc>>>,
    failing_connection_lookup: bool,
    connection_lookups: AtomicUsize,
    refusing_termination: bool,
    terminated: Mutex<Vec<WorkspaceId>>,
}

impl FakeWorkspaces {
    pub fn with_tags(mut self, workspace_id: &str, tags: Vec<Tag>) -> Self {
        self.tags.insert(workspace_id.to_string(), tags);
        self
    }

    pub fn failing_tags(mut self) -> Self {
        self.failing_tags = true;
        self
    }

    pub fn failing_mode_changes(mut self) -> Self {
        self.failing_mode_changes = true;
        self
    }

    pub fn with_connection(mut self, workspace_id: &str, at: Option<DateTime<Utc>>) -> Self {
        self.connections.insert(workspace_id.to_string(), at);
        self
    }

    pub fn failing_connection_lookup(mut self) -> Self {
        self.failing_connection_lookup = true;
        self
    }

    pub fn refusing_termination(mut self) -> Self {
        self.refusing_termination = true;
        self
    }

    pub fn mode_changes(&self) -> Vec<(WorkspaceId, RunningMode)> {
        self.mode_changes.lock().unwrap().clone()
    }

    pub fn connection_lookups(&self) -> usize {
        self.connection_lookups.load(Ordering::SeqCst)
    }

    pub fn terminated(&self) -> Vec<WorkspaceId> {
        self.terminated.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkspacesClient for FakeWorkspaces {
    async fn describe_tags(&self, workspace_id: &WorkspaceId) -> Result<Vec<Tag>> {
        if self.failing_tags {
            return Err(WsoptError::ControlPlane("tags unavailable".to_string()));
        }
        Ok(self.tags.get(workspace_id.as_str()).cloned().unwrap_or_default())
    }

    async fn modify_running_mode(&self, workspace_id: &WorkspaceId, mode: &RunningMode) -> Result<()> {
        if self.failing_mode_changes {
            return Err(WsoptError::ControlPlane("operation not supported".to_string()));
        }
        self.mode_changes
            .lock()
            .unwrap()
            .push((workspace_id.clone(), mode.clone()));
        Ok(())
    }

    async fn terminate(&self, workspace_id: &WorkspaceId) -> Result<Vec<FailedRequest>> {
        if self.refusing_termination {
            return Ok(vec![FailedRequest {
                workspace_id: workspace_id.clone(),
                error_code: "InvalidResourceState".to_string(),
                error_message: "workspace is busy".to_string(),
            }]);
        }
        self.terminated.lock().unwrap().push(workspace_id.clone());
        Ok(Vec::new())
    }

    async fn connection_status(&self, workspace_ids: &[WorkspaceId]) -> Result<Vec<ConnectionStatus>> {
        self.connection_lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing_connection_lookup {
            return Err(WsoptError::ControlPlane("throttled".to_string()));
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
