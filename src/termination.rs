//! Termination of unused workspaces
//!
//! At month end, a workspace that already existed on the first day of the
//! selected period and has not been connected to since can be terminated,
//! or reported as a candidate when the policy is a dry run.
//!
//! Every lookup here fails towards keeping the workspace: a failed
//! connection lookup counts as recent use, and a failed availability probe
//! counts as "did not exist yet".

use crate::decision::has_skip_tag;
use std::sync::Arc;
use tracing::{debug, info, warn};
use wsopt_core::calendar::ReportingCalendar;
use wsopt_core::collaborator::{Metric, WorkspacesClient};
use wsopt_core::types::{LastConnection, Tag, TerminationDecision, TerminationPolicy, Workspace, WorkspaceId};
use wsopt_metrics::sample_fetcher::SampleFetcher;

/// Termination outcome plus the connection state looked up on the way
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TerminationAssessment {
    pub decision: TerminationDecision,
    /// `None` when evaluation stopped before the lookup
    pub last_connection: Option<LastConnection>,
}

/// Decides whether an unused workspace should be terminated
#[derive(Clone)]
pub struct TerminationEvaluator {
    client: Arc<dyn WorkspacesClient>,
    fetcher: SampleFetcher,
    calendar: ReportingCalendar,
    policy: TerminationPolicy,
    dry_run: bool,
    test_end_of_month: bool,
}

impl TerminationEvaluator {
    pub fn new(
        client: Arc<dyn WorkspacesClient>,
        fetcher: SampleFetcher,
        calendar: ReportingCalendar,
        policy: TerminationPolicy,
    ) -> Self {
        Self {
            client,
            fetcher,
            calendar,
            policy,
            dry_run: false,
            test_end_of_month: false,
        }
    }

    /// Never call terminate; policy `Yes` then reports no termination
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Evaluate on any day; only the real last day of the month terminates
    pub fn with_test_end_of_month(mut self, enabled: bool) -> Self {
        self.test_end_of_month = enabled;
        self
    }

    pub fn policy(&self) -> TerminationPolicy {
        self.policy
    }

    /// Termination decision for one workspace
    pub async fn evaluate(
        &self,
        workspace: &Workspace,
        billable_hours: Option<u64>,
        tags: Option<&[Tag]>,
        end_of_month: bool,
    ) -> TerminationDecision {
        self.assess(workspace, billable_hours, tags, end_of_month)
            .await
            .decision
    }

    /// Like [`evaluate`](Self::evaluate), also returning the connection state
    pub async fn assess(
        &self,
        workspace: &Workspace,
        billable_hours: Option<u64>,
        tags: Option<&[Tag]>,
        end_of_month: bool,
    ) -> TerminationAssessment {
        let id = &workspace.id;
        if self.policy == TerminationPolicy::No || !(end_of_month || self.test_end_of_month) {
            return TerminationAssessment::default();
        }
        if workspace.standby {
            debug!(workspace_id = %id, "Standby workspace, not evaluating termination");
            return TerminationAssessment::default();
        }
        if has_skip_tag(tags) {
            debug!(workspace_id = %id, "Skip tag present, not evaluating termination");
            return TerminationAssessment::default();
        }

        let last_connection = self.last_connection(id).await;
        let mut assessment = TerminationAssessment {
            decision: TerminationDecision::None,
            last_connection: Some(last_connection),
        };

        if billable_hours != Some(0) {
            debug!(workspace_id = %id, ?billable_hours, "Workspace has billable usage");
            return assessment;
        }
        if self.used_in_period(&last_connection) {
            debug!(workspace_id = %id, "Workspace used in the selected period");
            return assessment;
        }
        if !self.available_on_first_day(id).await {
            debug!(workspace_id = %id, "Workspace not available on the first day of the period");
            return assessment;
        }

        assessment.decision = self.terminate(id).await;
        assessment
    }

    /// Last-known user connection; any lookup failure is `Unavailable`
    pub async fn last_connection(&self, workspace_id: &WorkspaceId) -> LastConnection {
        match self
            .client
            .connection_status(std::slice::from_ref(workspace_id))
            .await
        {
            Ok(statuses) => match statuses.into_iter().find(|s| &s.workspace_id == workspace_id) {
                Some(status) => match status.last_known_user_connection {
                    Some(at) => LastConnection::At(at),
                    None => LastConnection::Never,
                },
                None => {
                    warn!(workspace_id = %workspace_id, "No connection status returned");
                    LastConnection::Unavailable
                }
            },
            Err(e) => {
                warn!(workspace_id = %workspace_id, "Connection status lookup failed: {}", e);
                LastConnection::Unavailable
            }
        }
    }

    /// Whether the last connection falls in the selected period
    ///
    /// `Unavailable` counts as used; so does any failure to compute the period.
    pub fn used_in_period(&self, last_connection: &LastConnection) -> bool {
        match last_connection {
            LastConnection::Never => false,
            LastConnection::Unavailable => true,
            LastConnection::At(at) => match self.calendar.first_day_selected_month() {
                Ok(first_day) => at.date_naive() >= first_day,
                Err(e) => {
                    warn!("Cannot compute the selected period: {}", e);
                    true
                }
            },
        }
    }

    /// Whether the workspace reported availability on the first day of the
    /// selected period; a failed probe counts as not available.
    pub async fn available_on_first_day(&self, workspace_id: &WorkspaceId) -> bool {
        let window = match self.calendar.availability_probe_window() {
            Ok(window) => window,
            Err(e) => {
                warn!(workspace_id = %workspace_id, "Cannot compute the probe window: {}", e);
                return false;
            }
        };

        match self
            .fetcher
            .has_datapoints(workspace_id, Metric::Available, window)
            .await
        {
            Ok(available) => available,
            Err(e) => {
                warn!(workspace_id = %workspace_id, "Availability probe failed: {}", e);
                false
            }
        }
    }

    async fn terminate(&self, workspace_id: &WorkspaceId) -> TerminationDecision {
        if self.policy == TerminationPolicy::DryRun {
            info!(workspace_id = %workspace_id, "Unused workspace, termination dry run");
            return TerminationDecision::DryRun;
        }
        if self.dry_run || !self.calendar.is_last_day_of_month() {
            info!(
                workspace_id = %workspace_id,
                dry_run = self.dry_run,
                "Unused workspace, termination skipped by dry run or forced month end"
            );
            return TerminationDecision::None;
        }

        match self.client.terminate(workspace_id).await {
            Ok(failed) if failed.is_empty() => {
                info!(workspace_id = %workspace_id, "Terminated unused workspace");
                TerminationDecision::Terminated
            }
            Ok(failed) => {
                for request in &failed {
                    warn!(
                        workspace_id = %workspace_id,
                        "Termination refused: {} {}", request.error_code, request.error_message
                    );
                }
                TerminationDecision::None
            }
            Err(e) => {
                warn!(workspace_id = %workspace_id, "Termination failed: {}", e);
                TerminationDecision::None
            }
        }
    }
}
