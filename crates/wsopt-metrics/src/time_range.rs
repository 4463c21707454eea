//! Splitting a reporting window into monitoring-sized sub-windows
//!
//! A single monitoring query returns a bounded number of datapoints. At the
//! 5-minute sample period a 5-day span stays under that ceiling, so longer
//! windows are issued as consecutive 5-day queries.

use chrono::Duration;
use wsopt_core::error::{Result, WsoptError};
use wsopt_core::types::TimeRange;

/// Longest span one query may cover, in days
pub const MAX_QUERY_SPAN_DAYS: i64 = 5;

/// Splits a window into consecutive fixed-span sub-windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRangeChunker {
    max_span: Duration,
}

impl Default for TimeRangeChunker {
    fn default() -> Self {
        Self {
            max_span: Duration::days(MAX_QUERY_SPAN_DAYS),
        }
    }
}

impl TimeRangeChunker {
    /// Chunker with a custom span; the span must be positive
    pub fn with_max_span(max_span: Duration) -> Result<Self> {
        if max_span <= Duration::zero() {
            return Err(WsoptError::InvalidArgument(format!(
                "query span must be positive, got {max_span}"
            )));
        }
        Ok(Self { max_span })
    }

    pub fn max_span(&self) -> Duration {
        self.max_span
    }

    /// Consecutive sub-windows covering `range`
    ///
    /// Every sub-window is exactly `max_span` long, so the last one may end
    /// after `range.end`. An empty or inverted range yields no sub-windows.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{Duration, TimeZone, Utc};
    /// use wsopt_core::types::TimeRange;
    /// use wsopt_metrics::time_range::TimeRangeChunker;
    ///
    /// let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    /// let range = TimeRange::new(start, start + Duration::days(19));
    /// let chunks = TimeRangeChunker::default().split(range);
    /// assert_eq!(chunks.len(), 4);
    /// assert_eq!(chunks[3].start, start + Duration::days(15));
    /// ```
    pub fn split(&self, range: TimeRange) -> Vec<TimeRange> {
        if range.is_empty() {
            return Vec::new();
        }

        let total = range.duration().num_seconds();
        let span = self.max_span.num_seconds();
        let count = (total + span - 1) / span;

        (0..count)
            .map(|i| {
                let start = range.start + self.max_span * i as i32;
                TimeRange::new(start, start + self.max_span)
            })
            .collect()
    }
}
