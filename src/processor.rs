//! Per-workspace processing and the batch cycle
//!
//! [`WorkspaceProcessor`] wires the metric pipeline, the decision engine and
//! the termination evaluator together. Each workspace goes through:
//!
//! 1. tag lookup and the skip-tag short-circuit,
//! 2. billable hours over the reporting window,
//! 3. month-to-date performance averages,
//! 4. the month-end maintenance allowance,
//! 5. termination evaluation on the unadjusted hours,
//! 6. the billing decision.
//!
//! No step returns an error to the caller. Failures end up as result codes in
//! the row, so one workspace never stops the batch.
//!
//! # Examples
//!
//! ```no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use wsopt::processor::WorkspaceProcessor;
//! use wsopt_core::{MonitoringClient, ReportingCalendar, Settings, Workspace, WorkspacesClient};
//!
//! # async fn example(
//! #     monitoring: Arc<dyn MonitoringClient>,
//! #     control_plane: Arc<dyn WorkspacesClient>,
//! #     workspaces: Vec<Workspace>,
//! # ) -> wsopt::Result<()> {
//! let settings = Settings::from_env()?;
//! let calendar = ReportingCalendar::current(settings.termination_check_months);
//! let processor = WorkspaceProcessor::new(monitoring, control_plane, settings, calendar)
//!     .with_progress(true);
//!
//! let report = processor.process_all(&workspaces, &HashMap::new()).await;
//! println!("{}", report.to_json()?);
//! # Ok(())
//! # }
//! ```

use crate::decision::{BillingDecisionEngine, has_skip_tag};
use crate::summary::CycleSummary;
use crate::termination::{TerminationAssessment, TerminationEvaluator};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use wsopt_core::calendar::ReportingCalendar;
use wsopt_core::collaborator::{MonitoringClient, WorkspacesClient};
use wsopt_core::error::Result;
use wsopt_core::performance::PerformanceMetrics;
use wsopt_core::settings::Settings;
use wsopt_core::types::{
    PriorUsage, ReportRow, ResultCode, RunningMode, Tag, Workspace, WorkspaceId,
};
use wsopt_metrics::billable_hours::BillableHoursCalculator;
use wsopt_metrics::performance::{PerformanceCollector, previous_metrics};
use wsopt_metrics::sample_fetcher::SampleFetcher;

/// Rows and tallies of one processing cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub run_id: Uuid,
    pub rows: Vec<ReportRow>,
    pub summary: CycleSummary,
}

impl CycleReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Processes workspaces one at a time against the configured collaborators
pub struct WorkspaceProcessor {
    client: Arc<dyn WorkspacesClient>,
    settings: Settings,
    calendar: ReportingCalendar,
    calculator: BillableHoursCalculator,
    performance: PerformanceCollector,
    engine: BillingDecisionEngine,
    terminator: TerminationEvaluator,
    show_progress: bool,
}

impl WorkspaceProcessor {
    pub fn new(
        monitoring: Arc<dyn MonitoringClient>,
        client: Arc<dyn WorkspacesClient>,
        settings: Settings,
        calendar: ReportingCalendar,
    ) -> Self {
        let fetcher = SampleFetcher::new(monitoring);
        let calculator =
            BillableHoursCalculator::new(fetcher.clone(), settings.auto_stop_timeout_hours);
        let performance = PerformanceCollector::new(fetcher.clone());
        let engine = BillingDecisionEngine::new(client.clone(), settings.dry_run);
        let terminator =
            TerminationEvaluator::new(client.clone(), fetcher, calendar, settings.terminate_unused)
                .with_dry_run(settings.dry_run)
                .with_test_end_of_month(settings.test_end_of_month);

        Self {
            client,
            settings,
            calendar,
            calculator,
            performance,
            engine,
            terminator,
            show_progress: false,
        }
    }

    /// Draw a progress bar while processing a batch
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Whether this cycle runs the month-end evaluation
    pub fn end_of_month(&self) -> bool {
        self.calendar.end_of_month(self.settings.test_end_of_month)
    }

    /// Process one workspace into its report row
    ///
    /// `prior` is the usage an earlier cycle of the same month already billed.
    pub async fn process(&self, workspace: &Workspace, prior: Option<&PriorUsage>) -> ReportRow {
        let id = &workspace.id;
        let threshold = self.settings.hourly_threshold(&workspace.bundle_type);
        debug!(
            workspace_id = %id,
            mode = %workspace.running_mode,
            bundle = %workspace.bundle_type,
            ?threshold,
            "Processing workspace"
        );

        let tags = self.tags(id).await;
        if has_skip_tag(tags.as_deref()) {
            info!(workspace_id = %id, "Skipping workspace, skip tag present or tags unreadable");
            return Self::row(
                workspace,
                None,
                threshold,
                ResultCode::Skipped,
                workspace.running_mode.clone(),
                TerminationAssessment::default(),
                PerformanceMetrics::default(),
            );
        }

        let end_of_month = self.end_of_month();
        let (raw_hours, performance) = match self.calendar.reporting_window() {
            Ok(window) => match self.calculator.calculate(workspace, window, prior).await {
                Some(hours) => (
                    Some(hours),
                    self.performance.collect(id, window, prior).await,
                ),
                None => (None, previous_metrics(window, prior)),
            },
            Err(e) => {
                warn!(workspace_id = %id, "Cannot compute the reporting window: {}", e);
                (None, PerformanceMetrics::default())
            }
        };
        let billable_hours = self.with_maintenance(workspace, raw_hours, end_of_month);

        let assessment = self
            .terminator
            .assess(workspace, raw_hours, tags.as_deref(), end_of_month)
            .await;

        let decision = self
            .engine
            .decide(
                id,
                billable_hours,
                threshold,
                &workspace.running_mode,
                end_of_month,
            )
            .await;

        Self::row(
            workspace,
            billable_hours,
            threshold,
            decision.result,
            decision.new_mode,
            assessment,
            performance,
        )
    }

    /// Process a batch strictly one workspace at a time
    pub async fn process_all(
        &self,
        workspaces: &[Workspace],
        prior: &HashMap<WorkspaceId, PriorUsage>,
    ) -> CycleReport {
        let run_id = Uuid::new_v4();
        info!(%run_id, "Processing {} workspaces", workspaces.len());

        let progress = if self.show_progress {
            let pb = ProgressBar::new(workspaces.len() as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} {msg} [{elapsed_precise}] {bar:40} {pos}/{len} workspaces")
            {
                pb.set_style(style);
            }
            pb.set_message("Evaluating workspaces");
            pb.enable_steady_tick(std::time::Duration::from_millis(100));
            Some(pb)
        } else {
            None
        };
        let bar = progress.as_ref();

        let rows: Vec<ReportRow> = stream::iter(workspaces)
            .then(move |workspace| async move {
                let row = self.process(workspace, prior.get(&workspace.id)).await;
                if let Some(pb) = bar {
                    pb.inc(1);
                }
                row
            })
            .collect()
            .await;

        let summary = CycleSummary::from_rows(&rows);
        if let Some(pb) = progress {
            pb.finish_with_message(format!(
                "Evaluated {} workspaces, {} converted",
                rows.len(),
                summary.hourly_to_monthly + summary.monthly_to_hourly
            ));
        }
        info!(
            %run_id,
            converted_to_monthly = summary.hourly_to_monthly,
            converted_to_hourly = summary.monthly_to_hourly,
            errors = summary.errors,
            skips = summary.skips,
            terminations = summary.terminations,
            "Cycle complete"
        );

        CycleReport {
            run_id,
            rows,
            summary,
        }
    }

    async fn tags(&self, workspace_id: &WorkspaceId) -> Option<Vec<Tag>> {
        match self.client.describe_tags(workspace_id).await {
            Ok(tags) => Some(tags),
            Err(e) => {
                warn!(workspace_id = %workspace_id, "Tag lookup failed: {}", e);
                None
            }
        }
    }

    // Month-end maintenance windows add an hour to hourly workspaces in
    // directories that have maintenance enabled.
    fn with_maintenance(
        &self,
        workspace: &Workspace,
        billable_hours: Option<u64>,
        end_of_month: bool,
    ) -> Option<u64> {
        match billable_hours {
            Some(hours)
                if end_of_month
                    && hours > 0
                    && workspace.maintenance_mode
                    && workspace.running_mode == RunningMode::AutoStop =>
            {
                debug!(workspace_id = %workspace.id, "Adding maintenance hour");
                Some(hours + 1)
            }
            other => other,
        }
    }

    fn row(
        workspace: &Workspace,
        billable_hours: Option<u64>,
        usage_threshold: Option<u64>,
        result: ResultCode,
        new_mode: RunningMode,
        assessment: TerminationAssessment,
        performance: PerformanceMetrics,
    ) -> ReportRow {
        ReportRow {
            workspace_id: workspace.id.clone(),
            billable_hours,
            usage_threshold,
            result,
            bundle_type: workspace.bundle_type.clone(),
            initial_mode: workspace.running_mode.clone(),
            new_mode,
            termination: assessment.decision,
            last_known_connection: assessment.last_connection.and_then(|c| c.date_label()),
            performance,
        }
    }
}
