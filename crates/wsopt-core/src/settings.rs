//! Runtime settings for a processing cycle
//!
//! Settings come from environment variables (the deployment surface of the
//! optimizer) or from JSON. Every field has a default, so a missing variable
//! never fails; a present but malformed one does.

use crate::error::{Result, WsoptError};
use crate::types::TerminationPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use tracing::debug;

/// Environment variable holding the hourly limit for each bundle type
pub const BUNDLE_LIMIT_VARS: [(&str, &str); 7] = [
    ("VALUE", "ValueLimit"),
    ("STANDARD", "StandardLimit"),
    ("PERFORMANCE", "PerformanceLimit"),
    ("POWER", "PowerLimit"),
    ("POWERPRO", "PowerProLimit"),
    ("GRAPHICS_G4DN", "GraphicsG4dnLimit"),
    ("GRAPHICSPRO_G4DN", "GraphicsProG4dnLimit"),
];

pub const AUTO_STOP_TIMEOUT_HOURS_VAR: &str = "AutoStopTimeoutHours";
pub const DRY_RUN_VAR: &str = "DryRun";
pub const TEST_END_OF_MONTH_VAR: &str = "TestEndOfMonth";
pub const TERMINATE_UNUSED_VAR: &str = "TerminateUnusedWorkspaces";
pub const TERMINATION_CHECK_MONTHS_VAR: &str = "NumberOfMonthsForTerminationCheck";

/// Settings shared by every workspace in a cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Hourly limit above which an hourly workspace converts, keyed by bundle type
    pub hourly_limits: BTreeMap<String, u64>,
    /// Idle timeout assumed for flat-rate workspaces
    pub auto_stop_timeout_hours: u32,
    pub dry_run: bool,
    /// Run month-end evaluation on any day
    pub test_end_of_month: bool,
    pub terminate_unused: TerminationPolicy,
    pub termination_check_months: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            hourly_limits: BTreeMap::new(),
            auto_stop_timeout_hours: 1,
            dry_run: false,
            test_end_of_month: false,
            terminate_unused: TerminationPolicy::No,
            termination_check_months: 1,
        }
    }
}

impl Settings {
    /// Read settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        for (bundle, var) in BUNDLE_LIMIT_VARS {
            if let Some(raw) = lookup(var) {
                let limit = parse_number::<u64>(var, &raw)?;
                settings.hourly_limits.insert(bundle.to_string(), limit);
            }
        }

        if let Some(raw) = lookup(AUTO_STOP_TIMEOUT_HOURS_VAR) {
            settings.auto_stop_timeout_hours = parse_number(AUTO_STOP_TIMEOUT_HOURS_VAR, &raw)?;
        }
        if let Some(raw) = lookup(DRY_RUN_VAR) {
            settings.dry_run = parse_flag(DRY_RUN_VAR, &raw)?;
        }
        if let Some(raw) = lookup(TEST_END_OF_MONTH_VAR) {
            settings.test_end_of_month = parse_flag(TEST_END_OF_MONTH_VAR, &raw)?;
        }
        if let Some(raw) = lookup(TERMINATE_UNUSED_VAR) {
            non_blank(TERMINATE_UNUSED_VAR, &raw)?;
            settings.terminate_unused = raw
                .parse()
                .map_err(|e: String| WsoptError::Config(format!("{TERMINATE_UNUSED_VAR}: {e}")))?;
        }
        if let Some(raw) = lookup(TERMINATION_CHECK_MONTHS_VAR) {
            settings.termination_check_months =
                parse_number(TERMINATION_CHECK_MONTHS_VAR, &raw)?;
        }

        debug!(?settings, "Loaded settings");
        Ok(settings)
    }

    /// Parse settings from a JSON document; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Configured hourly limit for a bundle type, if any
    pub fn hourly_threshold(&self, bundle_type: &str) -> Option<u64> {
        self.hourly_limits.get(bundle_type).copied()
    }

    pub fn with_hourly_limit(mut self, bundle_type: impl Into<String>, limit: u64) -> Self {
        self.hourly_limits.insert(bundle_type.into(), limit);
        self
    }

    pub fn with_auto_stop_timeout_hours(mut self, hours: u32) -> Self {
        self.auto_stop_timeout_hours = hours;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_test_end_of_month(mut self, enabled: bool) -> Self {
        self.test_end_of_month = enabled;
        self
    }

    pub fn with_terminate_unused(mut self, policy: TerminationPolicy) -> Self {
        self.terminate_unused = policy;
        self
    }

    pub fn with_termination_check_months(mut self, months: u32) -> Self {
        self.termination_check_months = months;
        self
    }
}

fn non_blank<'a>(var: &str, raw: &'a str) -> Result<&'a str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(WsoptError::Config(format!("{var} is set but empty")));
    }
    Ok(trimmed)
}

fn parse_number<T: std::str::FromStr>(var: &str, raw: &str) -> Result<T> {
    non_blank(var, raw)?
        .parse()
        .map_err(|_| WsoptError::Config(format!("{var} is not a valid number: {raw:?}")))
}

// Anything other than "Yes" leaves the feature off
fn parse_flag(var: &str, raw: &str) -> Result<bool> {
    Ok(non_blank(var, raw)?.eq_ignore_ascii_case("yes"))
}
