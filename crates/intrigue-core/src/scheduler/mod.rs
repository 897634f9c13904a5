//! Scheduler/Trigger - runs the workflows of schedules that are due.
//!
//! Each invocation is a fold over the active schedules: every schedule ends
//! up succeeded, failed or skipped, and one bad schedule never stops the
//! rest of the batch. Executions are keyed on (schedule id, fire instant) so
//! a second trigger inside the same due window does not run the workflow
//! again.

pub mod cron;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::db::Database;
use crate::distribution::schedule_posts;
use crate::error::ServerError;
use crate::models::execution::{ExecutionLogEntry, ExecutionRecord, ExecutionStatus};
use crate::models::issue::Issue;
use crate::models::schedule::Schedule;
use crate::models::workflow::WorkflowDefinition;
use crate::store::{AgentStore, DistributionStore, ExecutionStore, IssueStore, ScheduleStore, WorkflowStore, XPostStore};
use crate::workflow::{WorkflowOrchestrator, WorkflowRunResult};

pub use cron::{due_fire_time, upcoming, validate_cron, validate_timezone};

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRunSummary {
    pub success: bool,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Due schedules not run: already handled for this window, or their
    /// workflow is inactive.
    pub skipped: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// How a single schedule firing ended.
#[derive(Debug, Clone)]
pub enum ScheduleOutcome {
    Completed(ExecutionRecord),
    Failed(ExecutionRecord),
    Skipped(String),
}

pub struct ScheduleRunner {
    schedules: ScheduleStore,
    workflows: WorkflowStore,
    agents: AgentStore,
    executions: ExecutionStore,
    issues: IssueStore,
    distributions: DistributionStore,
    x_posts: XPostStore,
    orchestrator: Arc<WorkflowOrchestrator>,
    due_tolerance: Duration,
}

impl ScheduleRunner {
    pub fn new(db: &Database, orchestrator: Arc<WorkflowOrchestrator>, due_tolerance: Duration) -> Self {
        Self {
            schedules: ScheduleStore::new(db.clone()),
            workflows: WorkflowStore::new(db.clone()),
            agents: AgentStore::new(db.clone()),
            executions: ExecutionStore::new(db.clone()),
            issues: IssueStore::new(db.clone()),
            distributions: DistributionStore::new(db.clone()),
            x_posts: XPostStore::new(db.clone()),
            orchestrator,
            due_tolerance,
        }
    }

    /// Run every active schedule that is due at `now`. Only a failure to load
    /// the schedule list is an error; per-schedule problems go in the summary.
    pub async fn run_due(&self, now: DateTime<Utc>) -> Result<ScheduleRunSummary, ServerError> {
        let schedules = self.schedules.list_active().await?;
        tracing::info!("[Scheduler] Checking {} active schedule(s) at {}", schedules.len(), now);

        let mut summary = ScheduleRunSummary { success: true, ..Default::default() };

        for schedule in &schedules {
            let fire_at = match due_fire_time(&schedule.cron_expression, &schedule.timezone, now, self.due_tolerance) {
                Ok(Some(t)) => t,
                Ok(None) => continue,
                Err(e) => {
                    tracing::error!("[Scheduler] Schedule '{}' has an unusable cron: {}", schedule.name, e);
                    summary.failed += 1;
                    summary.errors.push(format!("{}: {}", schedule.name, e));
                    continue;
                }
            };

            match self.executions.find_active_for_fire(&schedule.id, fire_at).await {
                Ok(Some(existing)) => {
                    tracing::info!(
                        "[Scheduler] Schedule '{}' already handled for {} (execution {})",
                        schedule.name,
                        fire_at,
                        existing.id
                    );
                    summary.skipped += 1;
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    summary.failed += 1;
                    summary.errors.push(format!("{}: {}", schedule.name, e));
                    continue;
                }
            }

            summary.processed += 1;
            match self.run_schedule(schedule, Some(fire_at)).await {
                Ok(ScheduleOutcome::Completed(_)) => summary.succeeded += 1,
                Ok(ScheduleOutcome::Failed(record)) => {
                    summary.failed += 1;
                    summary.errors.push(format!(
                        "{}: {}",
                        schedule.name,
                        record.error_message.unwrap_or_else(|| "failed".to_string())
                    ));
                }
                Ok(ScheduleOutcome::Skipped(reason)) => {
                    summary.processed -= 1;
                    summary.skipped += 1;
                    tracing::info!("[Scheduler] Skipped '{}': {}", schedule.name, reason);
                }
                Err(e) => {
                    tracing::error!("[Scheduler] Schedule '{}' errored: {}", schedule.name, e);
                    summary.failed += 1;
                    summary.errors.push(format!("{}: {}", schedule.name, e));
                }
            }
        }

        tracing::info!(
            "[Scheduler] Done: processed={} succeeded={} failed={} skipped={}",
            summary.processed,
            summary.succeeded,
            summary.failed,
            summary.skipped
        );
        Ok(summary)
    }

    /// Fire one schedule now. `fire_at` is the cron instant being answered,
    /// `None` for manual runs.
    ///
    /// Once the execution record exists it always reaches a terminal state:
    /// any error past that point marks it failed, so a later trigger for the
    /// same window can retry.
    pub async fn run_schedule(
        &self,
        schedule: &Schedule,
        fire_at: Option<DateTime<Utc>>,
    ) -> Result<ScheduleOutcome, ServerError> {
        let mut record = ExecutionRecord::start(schedule.id.clone(), fire_at);

        let workflow = match self.workflows.get(&schedule.workflow_id).await? {
            Some(w) => w,
            None => {
                let message = format!("Workflow {} not found", schedule.workflow_id);
                tracing::warn!("[Scheduler] Schedule '{}': {}", schedule.name, message);
                self.executions.insert(&record).await?;
                return Ok(ScheduleOutcome::Failed(self.abandon(record, message).await));
            }
        };
        if !workflow.is_active {
            return Ok(ScheduleOutcome::Skipped(format!("workflow '{}' is inactive", workflow.name)));
        }

        self.executions.insert(&record).await?;
        match self.execute(schedule, &workflow, &mut record).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::error!("[Scheduler] Execution {} for '{}' errored: {}", record.id, schedule.name, e);
                Ok(ScheduleOutcome::Failed(self.abandon(record, e.to_string()).await))
            }
        }
    }

    async fn execute(
        &self,
        schedule: &Schedule,
        workflow: &WorkflowDefinition,
        record: &mut ExecutionRecord,
    ) -> Result<ScheduleOutcome, ServerError> {
        self.schedules.mark_run(&schedule.id, Utc::now()).await?;
        tracing::info!("[Scheduler] Running '{}' → workflow '{}'", schedule.name, workflow.name);

        let mut result = self.orchestrate(workflow).await?;
        record.logs = std::mem::take(&mut result.logs);
        if !result.success {
            let message = "Workflow produced no issue".to_string();
            return Ok(ScheduleOutcome::Failed(self.abandon(record.clone(), message).await));
        }

        let issue = match self.persist(&mut result).await {
            Ok(issue) => issue,
            Err(e) => {
                let message = format!("Failed to store issue: {}", e);
                return Ok(ScheduleOutcome::Failed(self.abandon(record.clone(), message).await));
            }
        };
        record.logs.append(&mut result.logs);
        self.executions.complete(&record.id, Some(&issue.id), &record.logs).await?;
        Ok(ScheduleOutcome::Completed(self.reload(record.clone(), Some(issue.id), None).await))
    }

    /// Run a workflow outside any schedule and store what it produced.
    pub async fn run_workflow(&self, workflow: &WorkflowDefinition) -> Result<WorkflowRunResult, ServerError> {
        let mut result = self.orchestrate(workflow).await?;
        if result.success {
            self.persist(&mut result).await?;
        }
        Ok(result)
    }

    async fn orchestrate(&self, workflow: &WorkflowDefinition) -> Result<WorkflowRunResult, ServerError> {
        let agents = self.agents.lookup(&workflow.steps).await?;
        Ok(self
            .orchestrator
            .run(&workflow.steps, &agents, workflow.needs_approval())
            .await)
    }

    /// Number and save the produced issue, then queue any planned posts.
    /// A failure to queue posts is logged on the run, not fatal to it.
    async fn persist(&self, result: &mut WorkflowRunResult) -> Result<Issue, ServerError> {
        let issue = result
            .issue
            .as_mut()
            .ok_or_else(|| ServerError::Internal("successful run without an issue".to_string()))?;
        if issue.issue_number <= 0 {
            issue.issue_number = self.issues.next_issue_number().await?;
        }
        self.issues.save(issue).await?;
        tracing::info!("[Scheduler] Stored issue #{} ({})", issue.issue_number, issue.id);

        let issue = issue.clone();
        if !result.planned_posts.is_empty() {
            if let Err(e) = schedule_posts(
                &self.distributions,
                &self.x_posts,
                &issue,
                &result.planned_posts,
                Utc::now(),
            )
            .await
            {
                tracing::warn!("[Scheduler] Could not schedule posts for issue {}: {}", issue.id, e);
                result
                    .logs
                    .push(ExecutionLogEntry::warning("x_posting", format!("Failed to schedule posts: {}", e)));
            }
        }
        Ok(issue)
    }

    /// Close out a started execution as failed, keeping its partial log.
    async fn abandon(&self, record: ExecutionRecord, message: String) -> ExecutionRecord {
        if let Err(e) = self.executions.fail(&record.id, &message, &record.logs).await {
            tracing::error!("[Scheduler] Could not mark execution {} failed: {}", record.id, e);
        }
        self.reload(record, None, Some(message)).await
    }

    /// The stored record once it is terminal, else the in-memory one patched up.
    async fn reload(&self, mut record: ExecutionRecord, issue_id: Option<String>, error: Option<String>) -> ExecutionRecord {
        if let Ok(Some(stored)) = self.executions.get(&record.id).await {
            if stored.status.is_terminal() {
                return stored;
            }
        }
        record.status = if error.is_some() { ExecutionStatus::Failed } else { ExecutionStatus::Completed };
        record.issue_id = issue_id;
        record.error_message = error;
        record.completed_at = Some(Utc::now());
        record
    }
}
