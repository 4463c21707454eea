//! Sample fetcher for workspace metrics
//!
//! Wraps a [`MonitoringClient`] and issues one query per sub-window of the
//! requested window. A fetch is all or nothing: if any sub-window fails the
//! whole fetch reports no data, since a partial series would undercount
//! billable time.

use crate::time_range::TimeRangeChunker;
use std::sync::Arc;
use tracing::{debug, warn};
use wsopt_core::collaborator::{Metric, MetricQuery, MonitoringClient};
use wsopt_core::error::Result;
use wsopt_core::types::{Sample, TimeRange, WorkspaceId};

/// Period of the samples used for session reconstruction
pub const SAMPLE_PERIOD_SECS: u32 = 300;

/// Period used when only the presence of datapoints matters
pub const PROBE_PERIOD_SECS: u32 = 3600;

/// Fetches metric samples through the monitoring collaborator
#[derive(Clone)]
pub struct SampleFetcher {
    client: Arc<dyn MonitoringClient>,
    chunker: TimeRangeChunker,
}

impl SampleFetcher {
    pub fn new(client: Arc<dyn MonitoringClient>) -> Self {
        Self {
            client,
            chunker: TimeRangeChunker::default(),
        }
    }

    pub fn with_chunker(mut self, chunker: TimeRangeChunker) -> Self {
        self.chunker = chunker;
        self
    }

    /// Fetch every sample of `metric` in `window`
    ///
    /// Returns `None` when any sub-window query fails, and `Some(vec![])` when
    /// all queries succeed without datapoints. Samples are concatenated in
    /// arrival order.
    pub async fn fetch(
        &self,
        workspace_id: &WorkspaceId,
        metric: Metric,
        window: TimeRange,
    ) -> Option<Vec<Sample>> {
        let mut samples = Vec::new();

        for range in self.chunker.split(window) {
            let query = MetricQuery::new(workspace_id, metric, range, SAMPLE_PERIOD_SECS);
            match self.client.query(&query).await {
                Ok(points) => samples.extend(points),
                Err(e) => {
                    warn!(
                        workspace_id = %workspace_id,
                        metric = metric.name(),
                        range = %range,
                        "Metric query failed, discarding fetch: {}",
                        e
                    );
                    return None;
                }
            }
        }

        debug!(
            workspace_id = %workspace_id,
            metric = metric.name(),
            "Fetched {} samples",
            samples.len()
        );
        Some(samples)
    }

    /// Whether `metric` has at least one datapoint in `range`
    pub async fn has_datapoints(
        &self,
        workspace_id: &WorkspaceId,
        metric: Metric,
        range: TimeRange,
    ) -> Result<bool> {
        let query = MetricQuery::new(workspace_id, metric, range, PROBE_PERIOD_SECS);
        let points = self.client.query(&query).await?;
        Ok(!points.is_empty())
    }
}
