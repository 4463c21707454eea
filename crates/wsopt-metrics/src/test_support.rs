//! In-memory monitoring collaborator for unit tests

use async_trait::async_trait;
use chrono::Duration;
use std::collections::HashMap;
use std::sync::Mutex;
use wsopt_core::collaborator::{Metric, MetricQuery, MonitoringClient};
use wsopt_core::error::{Result, WsoptError};
use wsopt_core::types::Sample;

enum Script {
    /// The same values, 5 minutes apart from each query's start
    Repeating(Vec<f64>),
    /// A fixed series; each query returns the part inside its range
    Series(Vec<Sample>),
    /// A fixed series per metric; unlisted metrics have no datapoints
    PerMetric(HashMap<Metric, Vec<Sample>>),
}

pub struct ScriptedMonitoring {
    script: Script,
    fail_on_call: Option<usize>,
    failing_metric: Option<Metric>,
    queries: Mutex<Vec<MetricQuery>>,
}

impl ScriptedMonitoring {
    pub fn repeating(values: Vec<f64>) -> Self {
        Self {
            script: Script::Repeating(values),
            fail_on_call: None,
            failing_metric: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn series(samples: Vec<Sample>) -> Self {
        Self {
            script: Script::Series(samples),
            fail_on_call: None,
            failing_metric: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn per_metric(series: impl IntoIterator<Item = (Metric, Vec<Sample>)>) -> Self {
        Self {
            script: Script::PerMetric(series.into_iter().collect()),
            fail_on_call: None,
            failing_metric: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Make every query for `metric` fail
    pub fn failing_metric(mut self, metric: Metric) -> Self {
        self.failing_metric = Some(metric);
        self
    }

    /// Make the n-th query (1-based) fail
    pub fn failing_on_call(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    pub fn queries(&self) -> Vec<MetricQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl MonitoringClient for ScriptedMonitoring {
    async fn query(&self, query: &MetricQuery) -> Result<Vec<Sample>> {
        let call = {
            let mut queries = self.queries.lock().unwrap();
            queries.push(query.clone());
            queries.len()
        };
        if self.fail_on_call == Some(call) || self.failing_metric == Some(query.metric) {
            return Err(WsoptError::Monitoring("scripted failure".to_string()));
        }

        Ok(match &self.script {
            Script::Repeating(values) => values
                .iter()
                .enumerate()
                .map(|(i, v)| Sample::new(query.range.start + Duration::minutes(5 * i as i64), *v))
                .collect(),
            Script::Series(samples) => in_range(samples, query),
            Script::PerMetric(series) => series
                .get(&query.metric)
                .map(|samples| in_range(samples, query))
                .unwrap_or_default(),
        })
    }
}

fn in_range(samples: &[Sample], query: &MetricQuery) -> Vec<Sample> {
    samples
        .iter()
        .filter(|s| s.timestamp >= query.range.start && s.timestamp < query.range.end)
        .copied()
        .collect()
}
