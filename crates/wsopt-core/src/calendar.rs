//! Reporting calendar for a processing cycle
//!
//! All dates are UTC. A cycle looks at the current month up to the last full
//! hour, and the termination check looks back over a configurable number of
//! months.

use crate::error::{Result, WsoptError};
use crate::types::TimeRange;
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, TimeZone, Timelike, Utc};
use tracing::debug;

/// Dates derived from one reference instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportingCalendar {
    now: DateTime<Utc>,
    termination_check_months: u32,
}

impl ReportingCalendar {
    /// Calendar anchored at `now`; `months` below 1 is treated as 1
    pub fn at(now: DateTime<Utc>, termination_check_months: u32) -> Self {
        Self {
            now,
            termination_check_months: termination_check_months.max(1),
        }
    }

    /// Calendar anchored at the current time
    pub fn current(termination_check_months: u32) -> Self {
        Self::at(Utc::now(), termination_check_months)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn termination_check_months(&self) -> u32 {
        self.termination_check_months
    }

    /// First instant of the current month up to `now` truncated to the hour
    pub fn reporting_window(&self) -> Result<TimeRange> {
        let start = midnight(first_of_month(self.now.date_naive())?);
        let end = self
            .now
            .with_minute(0)
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .ok_or_else(|| WsoptError::InvalidDate(format!("cannot truncate {}", self.now)))?;
        Ok(TimeRange::new(start, end))
    }

    pub fn is_last_day_of_month(&self) -> bool {
        let today = self.now.date_naive();
        today
            .succ_opt()
            .is_none_or(|tomorrow| tomorrow.month() != today.month())
    }

    /// Whether month-end evaluation runs, either for real or forced for testing
    pub fn end_of_month(&self, test_override: bool) -> bool {
        test_override || self.is_last_day_of_month()
    }

    /// First day of the month `months - 1` months before `now`
    pub fn first_day_selected_month(&self) -> Result<NaiveDate> {
        let back = Months::new(self.termination_check_months - 1);
        let date = self
            .now
            .date_naive()
            .checked_sub_months(back)
            .ok_or_else(|| {
                WsoptError::InvalidDate(format!(
                    "{} months before {} is out of range",
                    self.termination_check_months - 1,
                    self.now
                ))
            })?;
        let first = first_of_month(date)?;
        debug!(first_day = %first, "First day of selected month");
        Ok(first)
    }

    /// The whole first day of the selected month
    pub fn availability_probe_window(&self) -> Result<TimeRange> {
        let start = midnight(self.first_day_selected_month()?);
        Ok(TimeRange::new(start, start + Duration::days(1)))
    }
}

fn first_of_month(date: NaiveDate) -> Result<NaiveDate> {
    date.with_day(1)
        .ok_or_else(|| WsoptError::InvalidDate(format!("no first day for {date}")))
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}
