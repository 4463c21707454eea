//! Monthly performance averages
//!
//! Averages every performance metric over the part of the month not yet
//! reported and folds the result into the averages of earlier cycles.
//! Performance data is informational: a failed fetch keeps the earlier
//! average for that metric and never affects billing.

use crate::billable_hours::remaining_window;
use crate::sample_fetcher::SampleFetcher;
use tracing::debug;
use wsopt_core::collaborator::Metric;
use wsopt_core::performance::{PerformanceMetrics, WeightedAverage};
use wsopt_core::types::{PriorUsage, TimeRange, WorkspaceId};

/// Averages carried from an earlier cycle of the month `window` covers
pub fn previous_metrics(window: TimeRange, prior: Option<&PriorUsage>) -> PerformanceMetrics {
    match prior {
        Some(prior) if prior.applies_to(window) => prior.performance,
        _ => PerformanceMetrics::default(),
    }
}

/// Collects performance averages through the sample fetcher
#[derive(Clone)]
pub struct PerformanceCollector {
    fetcher: SampleFetcher,
}

impl PerformanceCollector {
    pub fn new(fetcher: SampleFetcher) -> Self {
        Self { fetcher }
    }

    /// Month-to-date averages for `workspace_id`
    pub async fn collect(
        &self,
        workspace_id: &WorkspaceId,
        window: TimeRange,
        prior: Option<&PriorUsage>,
    ) -> PerformanceMetrics {
        let previous = previous_metrics(window, prior);
        let (window, _) = remaining_window(window, prior);

        let mut current = PerformanceMetrics::default();
        for metric in Metric::PERFORMANCE {
            match self.fetcher.fetch(workspace_id, metric, window).await {
                Some(samples) => {
                    current.set(metric, WeightedAverage::from_values(samples.iter().map(|s| s.value)));
                }
                None => debug!(
                    workspace_id = %workspace_id,
                    metric = metric.name(),
                    "Keeping previous average"
                ),
            }
        }

        PerformanceMetrics::combine(&previous, &current)
    }
}
