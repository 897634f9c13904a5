//! Agent Step Executor - runs one agent against the incoming context.

use std::sync::Arc;

use futures_util::future::join_all;

use crate::models::agent::{AgentDefinition, AgentRole};
use crate::models::issue::IssueDraft;
use crate::workflow::generation::{GenerationError, GenerationRequest, TextGenerator};
use crate::workflow::image::{build_image_prompt, ImageGenerator};
use crate::workflow::json::parse_structured;
use crate::workflow::roles::role_spec;

/// Turns `(agent, context)` into the next context string.
#[derive(Clone)]
pub struct AgentStepExecutor {
    text: Arc<dyn TextGenerator>,
    images: Arc<dyn ImageGenerator>,
    default_model: String,
}

impl AgentStepExecutor {
    pub fn new(
        text: Arc<dyn TextGenerator>,
        images: Arc<dyn ImageGenerator>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            text,
            images,
            default_model: default_model.into(),
        }
    }

    /// Execute one step. Inactive agents pass the context through untouched.
    /// Backend failures propagate; this layer never retries.
    pub async fn execute(&self, agent: &AgentDefinition, context: &str) -> Result<String, GenerationError> {
        if !agent.is_active {
            return Ok(context.to_string());
        }

        if agent.role == AgentRole::Image {
            return Ok(self.illustrate(context).await);
        }

        let spec = role_spec(agent.role);
        let model = if agent.model.trim().is_empty() {
            self.default_model.clone()
        } else {
            agent.model.clone()
        };
        let request = GenerationRequest {
            model,
            prompt: spec.build_prompt(agent, context),
            json_mode: spec.json_mode,
            web_search: spec.web_search,
        };

        tracing::info!("[Orchestrator] Step '{}' ({}) calling text backend", agent.name, agent.role.as_str());
        self.text.generate(&request).await
    }

    /// Fill in missing story images, one request per story, concurrently.
    /// Returns the context unchanged when it is not an issue draft.
    async fn illustrate(&self, context: &str) -> String {
        let Some(value) = parse_structured(context).into_object() else {
            tracing::warn!("[ImageGen] Context is not a JSON issue; leaving it unchanged");
            return context.to_string();
        };
        let mut draft: IssueDraft = match serde_json::from_value(value) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!("[ImageGen] Context does not look like an issue: {}", e);
                return context.to_string();
            }
        };

        let pending: Vec<usize> = draft
            .stories
            .iter()
            .enumerate()
            .filter(|(_, s)| s.image.as_deref().map_or(true, |url| url.trim().is_empty()))
            .map(|(i, _)| i)
            .collect();

        tracing::info!("[ImageGen] Generating {} image(s)", pending.len());

        let jobs = pending.iter().map(|&i| {
            let story = &draft.stories[i];
            let prompt = build_image_prompt(&story.category, &story.headline);
            let images = Arc::clone(&self.images);
            async move { (i, images.generate(&prompt).await) }
        });

        for (i, result) in join_all(jobs).await {
            match result {
                Ok(url) => draft.stories[i].image = Some(url),
                Err(e) => {
                    tracing::warn!("[ImageGen] Story {} image failed: {}", i, e);
                    draft.stories[i].image = None;
                }
            }
        }

        serde_json::to_string(&draft).unwrap_or_else(|_| context.to_string())
    }
}
