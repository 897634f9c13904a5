//! `intrigue workflow` - Import and run content workflows.

use intrigue_core::import::WorkflowBundle;
use intrigue_core::models::execution::StepStatus;
use intrigue_core::AppState;

use super::print_json;

pub async fn list(state: &AppState) -> Result<(), String> {
    let workflows = state.workflow_store.list().await.map_err(|e| e.to_string())?;
    print_json(&serde_json::json!({ "workflows": workflows }));
    Ok(())
}

/// Upsert the agents and workflows of a YAML bundle.
pub async fn import(state: &AppState, file: &str) -> Result<(), String> {
    let bundle = WorkflowBundle::from_file(file).map_err(|e| e.to_string())?;
    let summary = bundle
        .import(&state.agent_store, &state.workflow_store)
        .await
        .map_err(|e| e.to_string())?;

    println!(
        "📄 Imported {} agent(s) and {} workflow(s) from {}",
        summary.agents, summary.workflows, file
    );
    for step in &summary.dangling_steps {
        println!("   ⚠️  step '{}' does not match any agent and will be skipped", step);
    }
    Ok(())
}

/// Run a stored workflow and store the issue it produces.
pub async fn run(state: &AppState, id: &str) -> Result<(), String> {
    let workflow = state
        .workflow_store
        .get(id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("Workflow {} not found", id))?;

    println!("📄 Running workflow: {} ({} step(s))", workflow.name, workflow.steps.len());

    let result = state
        .scheduler
        .run_workflow(&workflow)
        .await
        .map_err(|e| e.to_string())?;

    for log in &result.logs {
        let marker = match log.status {
            StepStatus::Success => "✅",
            StepStatus::Warning => "⚠️ ",
            StepStatus::Error => "❌",
            StepStatus::Skipped => "⏭️ ",
        };
        match &log.error {
            Some(err) => println!("   {} {}: {}", marker, log.agent, err),
            None => println!("   {} {}", marker, log.agent),
        }
    }

    match (&result.issue, result.success) {
        (Some(issue), true) => {
            println!(
                "\n🎉 Issue #{} stored as {} ({})",
                issue.issue_number,
                issue.id,
                issue.approval_status.as_str()
            );
            if result.halted {
                println!("   Waiting for approval: intrigue issue approve --id {}", issue.id);
            }
            Ok(())
        }
        _ => Err("Workflow produced no issue".to_string()),
    }
}
