//! Per-cycle tallies of decisions and terminations

use serde::{Deserialize, Serialize};
use std::ops::AddAssign;
use wsopt_core::types::{ReportRow, ResultCode, RunningMode, TerminationDecision};

/// Counts over all rows of a cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub total_workspaces: u64,
    pub hourly_to_monthly: u64,
    pub monthly_to_hourly: u64,
    pub errors: u64,
    pub skips: u64,
    /// Workspaces left in the hourly mode
    pub hourly_billed: u64,
    /// Workspaces left in the flat-rate mode
    pub monthly_billed: u64,
    /// Terminated or reported as dry-run termination
    pub terminations: u64,
}

impl CycleSummary {
    pub fn from_rows(rows: &[ReportRow]) -> Self {
        let mut summary = Self::default();
        for row in rows {
            summary.record(row);
        }
        summary
    }

    pub fn record(&mut self, row: &ReportRow) {
        self.total_workspaces += 1;
        match row.result {
            ResultCode::ToAlwaysOn => self.hourly_to_monthly += 1,
            ResultCode::ToAutoStop => self.monthly_to_hourly += 1,
            ResultCode::Error => self.errors += 1,
            ResultCode::Skipped => self.skips += 1,
            ResultCode::NoChange => {}
        }
        match row.new_mode {
            RunningMode::AutoStop => self.hourly_billed += 1,
            RunningMode::AlwaysOn => self.monthly_billed += 1,
            RunningMode::Unrecognized(_) => {}
        }
        if row.termination != TerminationDecision::None {
            self.terminations += 1;
        }
    }
}

impl AddAssign for CycleSummary {
    fn add_assign(&mut self, other: Self) {
        self.total_workspaces += other.total_workspaces;
        self.hourly_to_monthly += other.hourly_to_monthly;
        self.monthly_to_hourly += other.monthly_to_hourly;
        self.errors += other.errors;
        self.skips += other.skips;
        self.hourly_billed += other.hourly_billed;
        self.monthly_billed += other.monthly_billed;
        self.terminations += other.terminations;
    }
}
