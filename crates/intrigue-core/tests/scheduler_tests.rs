//! Scheduler: due checks, execution records, dedupe and batch isolation.

mod common;

use chrono::{DateTime, TimeZone, Utc};

use common::{issue_json, test_state, FakeImages, ScriptedPoster, ScriptedText};
use intrigue_core::models::agent::{AgentRole, CreateAgentInput};
use intrigue_core::models::execution::ExecutionStatus;
use intrigue_core::models::issue::ApprovalStatus;
use intrigue_core::models::schedule::CreateScheduleInput;
use intrigue_core::models::workflow::CreateWorkflowInput;
use intrigue_core::scheduler::ScheduleOutcome;
use intrigue_core::AppState;

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, h, m, 0).unwrap()
}

async fn seed_workflow(state: &AppState, roles: &[AgentRole], requires_approval: Option<bool>) -> String {
    let mut steps = Vec::new();
    for role in roles {
        let agent = state
            .agent_store
            .create(CreateAgentInput {
                id: None,
                name: format!("{} agent", role.as_str()),
                role: *role,
                instructions: String::new(),
                model: String::new(),
                is_active: true,
            })
            .await
            .unwrap();
        steps.push(agent.id);
    }
    state
        .workflow_store
        .create(CreateWorkflowInput {
            id: None,
            name: "Daily Issue".into(),
            description: String::new(),
            steps,
            is_active: true,
            requires_approval,
            approval_message: None,
        })
        .await
        .unwrap()
        .id
}

async fn seed_schedule(state: &AppState, workflow_id: &str, name: &str, cron: &str) -> String {
    state
        .schedule_store
        .create(CreateScheduleInput {
            workflow_id: workflow_id.to_string(),
            name: name.to_string(),
            description: String::new(),
            cron_expression: cron.to_string(),
            timezone: "UTC".into(),
            is_active: true,
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn due_schedule_runs_once_per_window() {
    let text = ScriptedText::ok(&[issue_json(&["Morning move"]).as_str(), issue_json(&["Should not run"]).as_str()]);
    let state = test_state(text.clone(), FakeImages::new(None), ScriptedPoster::new(vec![]));
    let wf = seed_workflow(&state, &[AgentRole::Writer], None).await;
    let schedule_id = seed_schedule(&state, &wf, "daily", "0 6 * * *").await;

    let first = state.scheduler.run_due(at(5, 58)).await.unwrap();
    assert_eq!((first.processed, first.succeeded, first.failed, first.skipped), (1, 1, 0, 0));

    let second = state.scheduler.run_due(at(6, 3)).await.unwrap();
    assert_eq!((second.processed, second.succeeded, second.skipped), (0, 0, 1));
    assert_eq!(text.requests.lock().unwrap().len(), 1);

    let executions = state.execution_store.list_by_schedule(&schedule_id).await.unwrap();
    assert_eq!(executions.len(), 1);
    let exec = &executions[0];
    assert_eq!(exec.status, ExecutionStatus::Completed);
    assert_eq!(exec.fire_at, Some(at(6, 0)));
    assert!(exec.completed_at.is_some());

    let issue = state.issue_store.get(exec.issue_id.as_deref().unwrap()).await.unwrap().unwrap();
    assert_eq!(issue.issue_number, 1);
    assert_eq!(issue.approval_status, ApprovalStatus::PendingReview);

    let schedule = state.schedule_store.get(&schedule_id).await.unwrap().unwrap();
    assert!(schedule.last_run_at.is_some());
}

#[tokio::test]
async fn schedule_outside_window_is_not_run() {
    let text = ScriptedText::ok(&[]);
    let state = test_state(text.clone(), FakeImages::new(None), ScriptedPoster::new(vec![]));
    let wf = seed_workflow(&state, &[AgentRole::Writer], None).await;
    seed_schedule(&state, &wf, "daily", "0 6 * * *").await;

    let summary = state.scheduler.run_due(at(5, 50)).await.unwrap();
    assert_eq!(summary.processed, 0);
    assert!(text.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_workflow_fails_without_stopping_the_batch() {
    let text = ScriptedText::ok(&[issue_json(&["Survivor"]).as_str()]);
    let state = test_state(text, FakeImages::new(None), ScriptedPoster::new(vec![]));
    let orphan = seed_schedule(&state, "workflow-that-was-deleted", "orphan", "0 6 * * *").await;
    let wf = seed_workflow(&state, &[AgentRole::Writer], Some(false)).await;
    seed_schedule(&state, &wf, "healthy", "0 6 * * *").await;

    let summary = state.scheduler.run_due(at(6, 1)).await.unwrap();

    assert!(summary.success);
    assert_eq!((summary.processed, summary.succeeded, summary.failed), (2, 1, 1));
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].contains("not found"));

    let orphan_runs = state.execution_store.list_by_schedule(&orphan).await.unwrap();
    assert_eq!(orphan_runs.len(), 1);
    assert_eq!(orphan_runs[0].status, ExecutionStatus::Failed);

    let issues = state.issue_store.list().await.unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].approval_status, ApprovalStatus::Approved);
}

#[tokio::test]
async fn failed_run_is_recorded_with_its_logs_and_can_retry() {
    let text = ScriptedText::ok(&["not json at all", issue_json(&["Second try"]).as_str()]);
    let state = test_state(text, FakeImages::new(None), ScriptedPoster::new(vec![]));
    let wf = seed_workflow(&state, &[AgentRole::Writer], None).await;
    let schedule_id = seed_schedule(&state, &wf, "daily", "0 6 * * *").await;

    let first = state.scheduler.run_due(at(6, 0)).await.unwrap();
    assert_eq!((first.processed, first.failed), (1, 1));

    // A failed execution does not block the same window.
    let second = state.scheduler.run_due(at(6, 2)).await.unwrap();
    assert_eq!((second.processed, second.succeeded), (1, 1));

    let runs = state.execution_store.list_by_schedule(&schedule_id).await.unwrap();
    let failed = runs.iter().find(|r| r.status == ExecutionStatus::Failed).unwrap();
    assert_eq!(failed.logs.len(), 1);
    assert_eq!(failed.logs[0].error.as_deref(), Some("Failed to parse JSON"));
    assert!(failed.error_message.is_some());
}

#[tokio::test]
async fn storage_error_mid_run_fails_the_execution_instead_of_stranding_it() {
    let text = ScriptedText::ok(&[issue_json(&["After repair"]).as_str()]);
    let state = test_state(text, FakeImages::new(None), ScriptedPoster::new(vec![]));
    let wf = seed_workflow(&state, &[AgentRole::Writer], None).await;
    let schedule_id = seed_schedule(&state, &wf, "daily", "0 6 * * *").await;

    // Agent lookup happens after the execution row is written.
    state
        .db
        .with_conn_async(|conn| conn.execute_batch("ALTER TABLE agents RENAME TO agents_moved"))
        .await
        .unwrap();

    let first = state.scheduler.run_due(at(6, 0)).await.unwrap();
    assert_eq!((first.processed, first.succeeded, first.failed), (1, 0, 1));
    assert_eq!(first.errors.len(), 1);

    let runs = state.execution_store.list_by_schedule(&schedule_id).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, ExecutionStatus::Failed);
    assert!(runs[0].completed_at.is_some());
    assert!(runs[0].error_message.as_deref().unwrap().contains("agents"));

    state
        .db
        .with_conn_async(|conn| conn.execute_batch("ALTER TABLE agents_moved RENAME TO agents"))
        .await
        .unwrap();

    let second = state.scheduler.run_due(at(6, 3)).await.unwrap();
    assert_eq!((second.processed, second.succeeded, second.skipped), (1, 1, 0));
}

#[tokio::test]
async fn manual_run_ignores_the_due_window_and_numbers_issues() {
    let text = ScriptedText::ok(&[issue_json(&["One"]).as_str(), issue_json(&["Two"]).as_str()]);
    let state = test_state(text, FakeImages::new(None), ScriptedPoster::new(vec![]));
    let wf = seed_workflow(&state, &[AgentRole::Writer], None).await;
    let schedule_id = seed_schedule(&state, &wf, "weekly", "0 6 * * 1").await;
    let schedule = state.schedule_store.get(&schedule_id).await.unwrap().unwrap();

    for expected in [1, 2] {
        match state.scheduler.run_schedule(&schedule, None).await.unwrap() {
            ScheduleOutcome::Completed(record) => {
                assert_eq!(record.status, ExecutionStatus::Completed);
                assert!(record.fire_at.is_none());
                let issue = state.issue_store.get(record.issue_id.as_deref().unwrap()).await.unwrap().unwrap();
                assert_eq!(issue.issue_number, expected);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}

#[tokio::test]
async fn planned_posts_are_queued_after_the_issue_is_stored() {
    let plan = r#"{"posts": [{"storyIndex": 0, "text": "Miners are rallying"}, {"storyIndex": 7, "text": "bad index"}, {"storyIndex": 0, "text": "Later", "delayMinutes": 90}]}"#;
    let text = ScriptedText::ok(&[issue_json(&["Miners rally"]).as_str(), plan]);
    let state = test_state(text, FakeImages::new(None), ScriptedPoster::new(vec![]));
    let wf = seed_workflow(&state, &[AgentRole::Writer, AgentRole::XPosting], None).await;
    let schedule_id = seed_schedule(&state, &wf, "daily", "0 6 * * *").await;
    let schedule = state.schedule_store.get(&schedule_id).await.unwrap().unwrap();

    let started = Utc::now();
    let ScheduleOutcome::Completed(record) = state.scheduler.run_schedule(&schedule, None).await.unwrap() else {
        panic!("run should complete");
    };
    let issue_id = record.issue_id.unwrap();

    let distributions = state.distribution_store.list_by_issue(&issue_id).await.unwrap();
    assert_eq!(distributions.len(), 1);
    assert_eq!(distributions[0].channel, "x");

    let entries = state.x_post_store.list_by_distribution(&distributions[0].id).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].post_text, "Miners are rallying");
    assert!(entries[0].scheduled_time >= started + chrono::Duration::minutes(30));
    assert!(entries[1].scheduled_time >= started + chrono::Duration::minutes(90));
}
