//! Billing-mode decision engine
//!
//! Compares a workspace's billable hours against the hourly limit of its
//! bundle type and picks the running mode it should be in. Hourly workspaces
//! are evaluated on every cycle and convert as soon as they go over the
//! limit. Flat-rate workspaces are only evaluated at month end, and convert
//! back when their usage stayed at or under the limit.
//!
//! The table itself is the pure [`evaluate`] function. [`BillingDecisionEngine`]
//! adds the mode change against the control plane.
//!
//! # Examples
//!
//! ```
//! use wsopt::decision::{Evaluation, evaluate};
//! use wsopt_core::types::{ResultCode, RunningMode, WorkspaceId};
//!
//! let id = WorkspaceId::new("ws-1");
//! let outcome = evaluate(&id, Some(10), Some(5), &RunningMode::AutoStop, false);
//! assert_eq!(outcome, Evaluation::Convert { to: RunningMode::AlwaysOn });
//!
//! let outcome = evaluate(&id, None, Some(5), &RunningMode::AutoStop, false);
//! assert!(matches!(outcome, Evaluation::Settled(d) if d.result == ResultCode::Error));
//! ```

use std::sync::Arc;
use tracing::{debug, error, info, warn};
use wsopt_core::collaborator::WorkspacesClient;
use wsopt_core::types::{BillingDecision, ResultCode, RunningMode, Tag, WorkspaceId};

/// Tag key that exempts a workspace from conversion and termination
pub const SKIP_TAG_KEY: &str = "Skip_Convert";

/// Whether the tags carry the skip marker (key compared case-insensitively)
///
/// Tags that could not be read count as skipped: a workspace is never
/// converted without a successful tag lookup.
pub fn has_skip_tag(tags: Option<&[Tag]>) -> bool {
    match tags {
        Some(tags) => tags.iter().any(|t| t.key.eq_ignore_ascii_case(SKIP_TAG_KEY)),
        None => true,
    }
}

/// Outcome of the decision table before any side effect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// Final decision, no mode change needed
    Settled(BillingDecision),
    /// The workspace should move to another mode
    Convert { to: RunningMode },
}

/// The decision table
///
/// `billable_hours` is `None` when the usage could not be fetched and
/// `hourly_threshold` is `None` when the bundle type has no configured limit.
pub fn evaluate(
    workspace_id: &WorkspaceId,
    billable_hours: Option<u64>,
    hourly_threshold: Option<u64>,
    current_mode: &RunningMode,
    end_of_month: bool,
) -> Evaluation {
    let Some(hours) = billable_hours else {
        debug!(workspace_id = %workspace_id, "No billable hours, reporting an error");
        return Evaluation::Settled(BillingDecision::unchanged(ResultCode::Error, current_mode));
    };
    let Some(threshold) = hourly_threshold else {
        debug!(workspace_id = %workspace_id, "No hourly limit configured, skipping");
        return Evaluation::Settled(BillingDecision::unchanged(ResultCode::Skipped, current_mode));
    };

    match current_mode {
        RunningMode::AutoStop if hours > threshold => {
            debug!(
                workspace_id = %workspace_id,
                "Billable hours {} over limit {}", hours, threshold
            );
            Evaluation::Convert {
                to: RunningMode::AlwaysOn,
            }
        }
        RunningMode::AutoStop => {
            Evaluation::Settled(BillingDecision::unchanged(ResultCode::NoChange, current_mode))
        }
        RunningMode::AlwaysOn if !end_of_month => {
            debug!(workspace_id = %workspace_id, "Flat-rate workspace, not month end");
            Evaluation::Settled(BillingDecision::unchanged(ResultCode::NoChange, current_mode))
        }
        RunningMode::AlwaysOn if hours <= threshold => {
            debug!(
                workspace_id = %workspace_id,
                "Billable hours {} within limit {} at month end", hours, threshold
            );
            Evaluation::Convert {
                to: RunningMode::AutoStop,
            }
        }
        RunningMode::AlwaysOn => {
            Evaluation::Settled(BillingDecision::unchanged(ResultCode::NoChange, current_mode))
        }
        RunningMode::Unrecognized(mode) => {
            error!(
                workspace_id = %workspace_id,
                "Unrecognized running mode {:?}, skipping", mode
            );
            Evaluation::Settled(BillingDecision::unchanged(ResultCode::Skipped, current_mode))
        }
    }
}

/// Decides the billing mode and applies changes through the control plane
#[derive(Clone)]
pub struct BillingDecisionEngine {
    client: Arc<dyn WorkspacesClient>,
    dry_run: bool,
}

impl BillingDecisionEngine {
    pub fn new(client: Arc<dyn WorkspacesClient>, dry_run: bool) -> Self {
        Self { client, dry_run }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Run the decision table and apply the resulting mode change
    ///
    /// A failed change reports `Error` with the mode left as it was.
    pub async fn decide(
        &self,
        workspace_id: &WorkspaceId,
        billable_hours: Option<u64>,
        hourly_threshold: Option<u64>,
        current_mode: &RunningMode,
        end_of_month: bool,
    ) -> BillingDecision {
        match evaluate(
            workspace_id,
            billable_hours,
            hourly_threshold,
            current_mode,
            end_of_month,
        ) {
            Evaluation::Settled(decision) => decision,
            Evaluation::Convert { to } => {
                if self.apply_mode_change(workspace_id, &to).await {
                    let result = match to {
                        RunningMode::AlwaysOn => ResultCode::ToAlwaysOn,
                        _ => ResultCode::ToAutoStop,
                    };
                    BillingDecision::new(result, to)
                } else {
                    BillingDecision::unchanged(ResultCode::Error, current_mode)
                }
            }
        }
    }

    /// Switch the running mode; in dry-run mode nothing is called and the
    /// change counts as successful.
    pub async fn apply_mode_change(&self, workspace_id: &WorkspaceId, mode: &RunningMode) -> bool {
        if self.dry_run {
            info!(
                workspace_id = %workspace_id,
                "Dry run, not changing running mode to {}", mode
            );
            return true;
        }

        match self.client.modify_running_mode(workspace_id, mode).await {
            Ok(()) => {
                info!(workspace_id = %workspace_id, "Changed running mode to {}", mode);
                true
            }
            Err(e) => {
                warn!(
                    workspace_id = %workspace_id,
                    "Failed to change running mode to {}: {}", mode, e
                );
                false
            }
        }
    }
}
