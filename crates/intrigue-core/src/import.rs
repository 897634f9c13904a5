//! YAML bundles of agents and workflows.
//!
//! ```yaml
//! agents:
//!   - id: researcher
//!     name: "Research Analyst"
//!     role: researcher
//!     model: gemini-2.5-flash
//!   - id: writer
//!     name: "Newsletter Writer"
//!     role: writer
//!     instructions: "Plain English, no hype."
//! workflows:
//!   - id: daily
//!     name: "Daily Issue"
//!     steps: [researcher, writer]
//!     requiresApproval: true
//! ```
//!
//! Entries with an `id` are upserted, so re-importing a bundle is safe.

use serde::{Deserialize, Serialize};

use crate::error::ServerError;
use crate::models::agent::CreateAgentInput;
use crate::models::workflow::CreateWorkflowInput;
use crate::store::{AgentStore, WorkflowStore};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowBundle {
    #[serde(default)]
    pub agents: Vec<CreateAgentInput>,
    #[serde(default)]
    pub workflows: Vec<CreateWorkflowInput>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub agents: usize,
    pub workflows: usize,
    /// Workflow steps naming agents that exist neither in the bundle nor in
    /// the database. Kept, since steps are soft references.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dangling_steps: Vec<String>,
}

impl WorkflowBundle {
    pub fn from_yaml(yaml: &str) -> Result<Self, ServerError> {
        serde_yaml::from_str(yaml).map_err(|e| ServerError::BadRequest(format!("Failed to parse bundle YAML: {}", e)))
    }

    pub fn from_file(path: &str) -> Result<Self, ServerError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ServerError::BadRequest(format!("Failed to read bundle file '{}': {}", path, e)))?;
        Self::from_yaml(&content)
    }

    /// Agents first, so workflow steps can be checked against them.
    pub async fn import(self, agents: &AgentStore, workflows: &WorkflowStore) -> Result<ImportSummary, ServerError> {
        let mut summary = ImportSummary::default();

        for input in self.agents {
            let agent = agents.create(input).await?;
            tracing::info!("[Import] Agent '{}' ({})", agent.name, agent.id);
            summary.agents += 1;
        }

        for input in self.workflows {
            let known = agents.lookup(&input.steps).await?;
            for step in &input.steps {
                if !known.contains_key(step) {
                    tracing::warn!("[Import] Workflow '{}' references unknown agent '{}'", input.name, step);
                    summary.dangling_steps.push(format!("{}: {}", input.name, step));
                }
            }
            let workflow = workflows.create(input).await?;
            tracing::info!("[Import] Workflow '{}' ({} steps)", workflow.name, workflow.steps.len());
            summary.workflows += 1;
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::agent::AgentRole;

    const BUNDLE: &str = r#"
agents:
  - id: researcher
    name: "Research Analyst"
    role: researcher
  - id: writer
    name: "Newsletter Writer"
    role: writer
    instructions: "Plain English, no hype."
    isActive: false
workflows:
  - id: daily
    name: "Daily Issue"
    steps: [researcher, writer, ghost]
    requiresApproval: false
"#;

    #[test]
    fn parses_bundle_with_defaults() {
        let bundle = WorkflowBundle::from_yaml(BUNDLE).unwrap();
        assert_eq!(bundle.agents.len(), 2);
        assert_eq!(bundle.agents[0].role, AgentRole::Researcher);
        assert!(bundle.agents[0].is_active);
        assert!(!bundle.agents[1].is_active);
        assert_eq!(bundle.workflows[0].requires_approval, Some(false));
    }

    #[test]
    fn rejects_unknown_roles() {
        let err = WorkflowBundle::from_yaml("agents:\n  - name: x\n    role: editor\n").unwrap_err();
        assert!(matches!(err, ServerError::BadRequest(_)));
    }

    #[tokio::test]
    async fn import_is_repeatable_and_reports_dangling_steps() {
        let db = Database::open_in_memory().unwrap();
        let agents = AgentStore::new(db.clone());
        let workflows = WorkflowStore::new(db);

        let first = WorkflowBundle::from_yaml(BUNDLE).unwrap().import(&agents, &workflows).await.unwrap();
        assert_eq!(first.agents, 2);
        assert_eq!(first.dangling_steps, vec!["Daily Issue: ghost".to_string()]);

        WorkflowBundle::from_yaml(BUNDLE).unwrap().import(&agents, &workflows).await.unwrap();
        assert_eq!(agents.list().await.unwrap().len(), 2);
        let wf = workflows.get("daily").await.unwrap().unwrap();
        assert_eq!(wf.steps, vec!["researcher", "writer", "ghost"]);
        assert!(!wf.needs_approval());
    }
}
