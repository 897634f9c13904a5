//! Workflow Orchestrator - runs a workflow's steps in order.
//!
//! The orchestrator:
//! 1. Resolves each step id against the agent lookup
//! 2. Pipes every step's output into the next step as context
//! 3. Parses structured output from issue-producing roles into a draft
//! 4. Contains step failures to the step (logged, never fatal to the run)
//! 5. Stamps the final draft into an Issue and applies the approval gate

use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::approval;
use crate::models::agent::AgentDefinition;
use crate::models::distribution::PlannedPost;
use crate::models::execution::ExecutionLogEntry;
use crate::models::issue::{Issue, IssueDraft};
use crate::workflow::json::{parse_structured, ParsedJson};
use crate::workflow::roles::{role_spec, DraftHandling};
use crate::workflow::step::AgentStepExecutor;

const PARSE_WARNING: &str = "Failed to parse JSON";

/// Outcome of one workflow run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRunResult {
    pub success: bool,
    pub issue: Option<Issue>,
    pub logs: Vec<ExecutionLogEntry>,
    /// The issue is waiting on a human decision and must not be published.
    pub halted: bool,
    /// Posts planned by an `x_posting` step, to be scheduled by the caller.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub planned_posts: Vec<PlannedPost>,
}

/// What one step did to the run state.
enum StepOutcome {
    Draft(IssueDraft),
    Plan(Vec<PlannedPost>),
    Unchanged,
}

pub struct WorkflowOrchestrator {
    steps: AgentStepExecutor,
}

impl WorkflowOrchestrator {
    pub fn new(steps: AgentStepExecutor) -> Self {
        Self { steps }
    }

    /// Run `step_ids` in order. Unresolved and inactive steps are logged as
    /// skipped; failing steps are logged as errors and the run moves on.
    pub async fn run(
        &self,
        step_ids: &[String],
        agents: &HashMap<String, AgentDefinition>,
        requires_approval: bool,
    ) -> WorkflowRunResult {
        let mut context = String::new();
        let mut current_draft: Option<IssueDraft> = None;
        let mut planned_posts: Vec<PlannedPost> = Vec::new();
        let mut logs: Vec<ExecutionLogEntry> = Vec::with_capacity(step_ids.len());

        for (i, step_id) in step_ids.iter().enumerate() {
            let Some(agent) = agents.get(step_id) else {
                tracing::warn!("[Orchestrator] Step {}: agent '{}' not found, skipping", i + 1, step_id);
                logs.push(ExecutionLogEntry::skipped(step_id.clone(), "Agent not found"));
                continue;
            };
            if !agent.is_active {
                tracing::info!("[Orchestrator] Step {}: agent '{}' is inactive, skipping", i + 1, agent.name);
                logs.push(ExecutionLogEntry::skipped(agent.name.clone(), "Agent inactive"));
                continue;
            }

            tracing::info!(
                "[Orchestrator] Step {}/{}: {} ({})",
                i + 1,
                step_ids.len(),
                agent.name,
                agent.role.as_str()
            );

            let output = match self.steps.execute(agent, &context).await {
                Ok(output) => output,
                Err(e) if e.is_auth() => {
                    tracing::error!("[Orchestrator] Step '{}' was refused by the provider: {}", agent.name, e);
                    logs.push(ExecutionLogEntry::error(
                        agent.name.clone(),
                        format!("{} (check the provider API key)", e),
                    ));
                    continue;
                }
                Err(e) => {
                    tracing::error!("[Orchestrator] Step '{}' failed: {}", agent.name, e);
                    logs.push(ExecutionLogEntry::error(agent.name.clone(), e.to_string()));
                    continue;
                }
            };
            context = output;

            let (entry, outcome) = absorb_output(agent, &context);
            logs.push(entry);
            match outcome {
                StepOutcome::Draft(draft) => current_draft = Some(draft),
                StepOutcome::Plan(posts) => planned_posts = posts,
                StepOutcome::Unchanged => {}
            }
        }

        let Some(draft) = current_draft else {
            tracing::warn!("[Orchestrator] Run produced no draft");
            return WorkflowRunResult {
                success: false,
                issue: None,
                logs,
                halted: false,
                planned_posts,
            };
        };

        let mut issue = draft.into_issue(Utc::now());
        let halted = approval::apply_gate(&mut issue, requires_approval);
        tracing::info!(
            "[Orchestrator] Run complete: {} stories, approval {}",
            issue.stories.len(),
            issue.approval_status.as_str()
        );

        WorkflowRunResult {
            success: true,
            issue: Some(issue),
            logs,
            halted,
            planned_posts,
        }
    }
}

/// Decide what a step's output means for the run state. Output that does
/// not read as an issue draft leaves the previous draft in place.
fn absorb_output(agent: &AgentDefinition, output: &str) -> (ExecutionLogEntry, StepOutcome) {
    let name = agent.name.clone();
    match role_spec(agent.role).draft {
        DraftHandling::PassThrough => (ExecutionLogEntry::success(name), StepOutcome::Unchanged),
        DraftHandling::Replace => match parse_structured(output) {
            ParsedJson::Parsed(v) if v.is_object() => match to_draft(v) {
                Some(draft) => (ExecutionLogEntry::success(name), StepOutcome::Draft(draft)),
                None => (ExecutionLogEntry::warning(name, PARSE_WARNING), StepOutcome::Unchanged),
            },
            _ => (ExecutionLogEntry::warning(name, PARSE_WARNING), StepOutcome::Unchanged),
        },
        DraftHandling::ImageMerge => match parse_structured(output).into_object().and_then(to_draft) {
            Some(draft) => (ExecutionLogEntry::success(name), StepOutcome::Draft(draft)),
            None => (ExecutionLogEntry::success(name), StepOutcome::Unchanged),
        },
        DraftHandling::PostingPlan => match parse_structured(output).into_object() {
            Some(v) if is_posting_plan(&v) => {
                match serde_json::from_value::<Vec<PlannedPost>>(v["posts"].clone()) {
                    Ok(posts) => (ExecutionLogEntry::success(name), StepOutcome::Plan(posts)),
                    Err(e) => (
                        ExecutionLogEntry::warning(name, format!("Invalid posting plan: {}", e)),
                        StepOutcome::Unchanged,
                    ),
                }
            }
            Some(v) => match to_draft(v) {
                Some(draft) => (ExecutionLogEntry::success(name), StepOutcome::Draft(draft)),
                None => (ExecutionLogEntry::warning(name, PARSE_WARNING), StepOutcome::Unchanged),
            },
            None => (ExecutionLogEntry::warning(name, PARSE_WARNING), StepOutcome::Unchanged),
        },
    }
}

fn to_draft(v: Value) -> Option<IssueDraft> {
    serde_json::from_value(v)
        .map_err(|e| tracing::warn!("[Orchestrator] Output is not a valid issue draft: {}", e))
        .ok()
}

fn is_posting_plan(v: &Value) -> bool {
    v.get("posts").map_or(false, Value::is_array) && v.get("stories").is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::agent::AgentRole;
    use crate::models::execution::StepStatus;

    fn agent(role: AgentRole) -> AgentDefinition {
        AgentDefinition::new(role.as_str(), role, "", "")
    }

    #[test]
    fn writer_parse_failure_is_a_warning() {
        let (entry, outcome) = absorb_output(&agent(AgentRole::Writer), "Here is my draft, enjoy!");
        assert_eq!(entry.status, StepStatus::Warning);
        assert_eq!(entry.error.as_deref(), Some(PARSE_WARNING));
        assert!(matches!(outcome, StepOutcome::Unchanged));
    }

    #[test]
    fn fenced_writer_output_becomes_draft() {
        let (entry, outcome) =
            absorb_output(&agent(AgentRole::Reviewer), "```json\n{\"stories\": []}\n```");
        assert_eq!(entry.status, StepStatus::Success);
        assert!(matches!(outcome, StepOutcome::Draft(_)));
    }

    #[test]
    fn off_shape_reviewer_output_keeps_the_previous_draft() {
        let out = r#"{"stories": [{"category": null, "headline": "x", "paragraphs": "text"}]}"#;
        let (entry, outcome) = absorb_output(&agent(AgentRole::Reviewer), out);
        assert_eq!(entry.status, StepStatus::Warning);
        assert_eq!(entry.error.as_deref(), Some(PARSE_WARNING));
        assert!(matches!(outcome, StepOutcome::Unchanged));
    }

    #[test]
    fn null_story_fields_still_make_a_draft() {
        let out = r#"{"stories": [{"category": null, "headline": "Halving math"}]}"#;
        let (entry, outcome) = absorb_output(&agent(AgentRole::Writer), out);
        assert_eq!(entry.status, StepStatus::Success);
        match outcome {
            StepOutcome::Draft(draft) => {
                assert_eq!(draft.stories[0].category, "");
                assert_eq!(draft.stories[0].headline, "Halving math");
            }
            _ => panic!("expected a draft"),
        }
    }

    #[test]
    fn image_parse_failure_still_counts_as_success() {
        let (entry, outcome) = absorb_output(&agent(AgentRole::Image), "not json");
        assert_eq!(entry.status, StepStatus::Success);
        assert!(matches!(outcome, StepOutcome::Unchanged));
    }

    #[test]
    fn posting_plan_is_kept_apart_from_the_draft() {
        let out = r#"{"posts": [{"storyIndex": 1, "text": "gm"}]}"#;
        let (entry, outcome) = absorb_output(&agent(AgentRole::XPosting), out);
        assert_eq!(entry.status, StepStatus::Success);
        match outcome {
            StepOutcome::Plan(posts) => {
                assert_eq!(posts.len(), 1);
                assert_eq!(posts[0].story_index, 1);
                assert_eq!(posts[0].delay_minutes, None);
            }
            _ => panic!("expected a posting plan"),
        }
    }

    #[test]
    fn research_output_never_touches_the_draft() {
        let (entry, outcome) = absorb_output(&agent(AgentRole::Researcher), "{\"stories\": []}");
        assert_eq!(entry.status, StepStatus::Success);
        assert!(matches!(outcome, StepOutcome::Unchanged));
    }
}
