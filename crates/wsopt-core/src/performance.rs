//! Running averages of workspace performance metrics
//!
//! Each cycle averages the datapoints it fetched for the remaining window and
//! folds them into the averages carried over from earlier cycles in the same
//! month. Weighting by datapoint count keeps the monthly average exact no
//! matter how the month was split into cycles.

use crate::collaborator::Metric;
use serde::{Deserialize, Serialize};

/// Mean of `count` datapoints
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedAverage {
    pub avg: f64,
    pub count: u64,
}

impl WeightedAverage {
    pub fn new(avg: f64, count: u64) -> Self {
        Self { avg, count }
    }

    /// Average of the given datapoints, `None` when there are none
    ///
    /// # Examples
    /// ```
    /// use wsopt_core::performance::WeightedAverage;
    ///
    /// let average = WeightedAverage::from_values([10.0, 20.0, 30.0]).unwrap();
    /// assert_eq!(average, WeightedAverage::new(20.0, 3));
    /// assert!(WeightedAverage::from_values(std::iter::empty()).is_none());
    /// ```
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let (sum, count) = values
            .into_iter()
            .fold((0.0, 0u64), |(sum, count), value| (sum + value, count + 1));
        (count > 0).then(|| Self::new(sum / count as f64, count))
    }

    /// Average over the datapoints of both
    pub fn merge(&self, other: &Self) -> Self {
        let count = self.count + other.count;
        if count == 0 {
            return Self::new(0.0, 0);
        }
        let total = self.avg * self.count as f64 + other.avg * other.count as f64;
        Self::new(total / count as f64, count)
    }

    /// Fold the current cycle into the previous one, keeping whichever exists
    pub fn combine(previous: Option<Self>, current: Option<Self>) -> Option<Self> {
        match (previous, current) {
            (Some(previous), Some(current)) => Some(previous.merge(&current)),
            (previous, None) => previous,
            (None, current) => current,
        }
    }
}

/// Monthly averages of every performance metric of one workspace
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceMetrics {
    pub in_session_latency: Option<WeightedAverage>,
    pub cpu_usage: Option<WeightedAverage>,
    pub memory_usage: Option<WeightedAverage>,
    pub root_volume_disk_usage: Option<WeightedAverage>,
    pub user_volume_disk_usage: Option<WeightedAverage>,
    pub udp_packet_loss_rate: Option<WeightedAverage>,
}

impl PerformanceMetrics {
    /// Average for a metric; always `None` for connectivity metrics
    pub fn get(&self, metric: Metric) -> Option<WeightedAverage> {
        match metric {
            Metric::InSessionLatency => self.in_session_latency,
            Metric::CpuUsage => self.cpu_usage,
            Metric::MemoryUsage => self.memory_usage,
            Metric::RootVolumeDiskUsage => self.root_volume_disk_usage,
            Metric::UserVolumeDiskUsage => self.user_volume_disk_usage,
            Metric::UdpPacketLossRate => self.udp_packet_loss_rate,
            Metric::UserConnected | Metric::Available => None,
        }
    }

    /// Store the average for a metric; connectivity metrics are ignored
    pub fn set(&mut self, metric: Metric, value: Option<WeightedAverage>) {
        let slot = match metric {
            Metric::InSessionLatency => &mut self.in_session_latency,
            Metric::CpuUsage => &mut self.cpu_usage,
            Metric::MemoryUsage => &mut self.memory_usage,
            Metric::RootVolumeDiskUsage => &mut self.root_volume_disk_usage,
            Metric::UserVolumeDiskUsage => &mut self.user_volume_disk_usage,
            Metric::UdpPacketLossRate => &mut self.udp_packet_loss_rate,
            Metric::UserConnected | Metric::Available => return,
        };
        *slot = value;
    }

    pub fn with(mut self, metric: Metric, value: WeightedAverage) -> Self {
        self.set(metric, Some(value));
        self
    }

    pub fn is_empty(&self) -> bool {
        Metric::PERFORMANCE.iter().all(|metric| self.get(*metric).is_none())
    }

    /// Per-metric [`WeightedAverage::combine`]
    pub fn combine(previous: &Self, current: &Self) -> Self {
        let mut combined = Self::default();
        for metric in Metric::PERFORMANCE {
            combined.set(
                metric,
                WeightedAverage::combine(previous.get(metric), current.get(metric)),
            );
        }
        combined
    }
}
