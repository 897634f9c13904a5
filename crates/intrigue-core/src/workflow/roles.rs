//! Role dispatch table.
//!
//! Every `AgentRole` maps to a `RoleSpec` describing how its prompt is
//! built, which backend modes it needs, and what the orchestrator does
//! with its output. The `match` in `role_spec` keeps the table exhaustive.

use crate::models::agent::{AgentDefinition, AgentRole};

/// What the orchestrator does with a step's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftHandling {
    /// Output is context for the next step only.
    PassThrough,
    /// Output must be the full issue as JSON; a parse failure is a warning.
    Replace,
    /// Image step: replaces the draft when it parses, and is a success
    /// either way.
    ImageMerge,
    /// `x_posting`: either a posting plan or a full issue.
    PostingPlan,
}

#[derive(Debug, Clone, Copy)]
pub struct RoleSpec {
    pub role: AgentRole,
    pub title: &'static str,
    pub json_mode: bool,
    pub web_search: bool,
    pub draft: DraftHandling,
    /// Output instructions appended to every prompt for this role. `None`
    /// for roles that never reach the text backend.
    pub output_contract: Option<&'static str>,
}

const ISSUE_SHAPE: &str = r#"{
  "intro": { "headline": "string", "body": "string" },
  "stories": [
    {
      "category": "PRICE WATCH | GLOBAL | WHALE WATCH | LESSON | SPOTLIGHT",
      "headline": "string",
      "paragraphs": ["string", "..."],
      "highlight": false,
      "take": "optional one-line opinion"
    }
  ]
}"#;

pub fn role_spec(role: AgentRole) -> RoleSpec {
    match role {
        AgentRole::Researcher => RoleSpec {
            role,
            title: "Research Analyst",
            json_mode: false,
            web_search: true,
            draft: DraftHandling::PassThrough,
            output_contract: Some(
                "Search for the most important Bitcoin developments of the last 24 hours: price action, \
                 macro and regulatory news, large holder and institutional moves, and notable ecosystem \
                 stories. Return a research brief as a bulleted list. Every item needs the key facts, \
                 concrete numbers where available, and its source.",
            ),
        },
        AgentRole::Planner => RoleSpec {
            role,
            title: "Editorial Planner",
            json_mode: false,
            web_search: false,
            draft: DraftHandling::PassThrough,
            output_contract: Some(
                "Turn the research into an issue plan: an intro angle and four to six stories. For each \
                 story give its category, a working headline, and the facts it must cover.",
            ),
        },
        AgentRole::Writer => RoleSpec {
            role,
            title: "Newsletter Writer",
            json_mode: true,
            web_search: false,
            draft: DraftHandling::Replace,
            output_contract: Some(
                "Write the full issue. Respond with JSON only, matching this shape exactly:",
            ),
        },
        AgentRole::Reviewer => RoleSpec {
            role,
            title: "Senior Editor",
            json_mode: true,
            web_search: false,
            draft: DraftHandling::Replace,
            output_contract: Some(
                "Review the issue for accuracy, clarity and tone, and fix what needs fixing. Keep the story \
                 order. Respond with the complete revised issue as JSON only, in this shape:",
            ),
        },
        AgentRole::Seo => RoleSpec {
            role,
            title: "SEO Editor",
            json_mode: true,
            web_search: false,
            draft: DraftHandling::Replace,
            output_contract: Some(
                "Tighten headlines and the intro for search and social sharing without changing facts. \
                 Respond with the complete issue as JSON only, in this shape:",
            ),
        },
        AgentRole::Image => RoleSpec {
            role,
            title: "Art Director",
            json_mode: false,
            web_search: false,
            draft: DraftHandling::ImageMerge,
            output_contract: None,
        },
        AgentRole::ContentReview => RoleSpec {
            role,
            title: "Content Reviewer",
            json_mode: false,
            web_search: false,
            draft: DraftHandling::PassThrough,
            output_contract: Some(
                "Review the content for factual risk, missing context and tone problems. Return review notes \
                 as plain text. Do not rewrite the issue.",
            ),
        },
        AgentRole::XPosting => RoleSpec {
            role,
            title: "Social Editor",
            json_mode: true,
            web_search: false,
            draft: DraftHandling::PostingPlan,
            output_contract: Some(
                "Plan X posts promoting the issue's stories. Each post must stand alone and stay under 280 \
                 characters. Respond with JSON only: \
                 {\"posts\": [{\"storyIndex\": 0, \"text\": \"string\", \"delayMinutes\": 30}]}",
            ),
        },
    }
}

impl RoleSpec {
    /// Build the full prompt for an agent of this role.
    pub fn build_prompt(&self, agent: &AgentDefinition, context: &str) -> String {
        let mut prompt = format!(
            "You are the {} for Bitcoin Intrigue, a daily Bitcoin newsletter for curious, \
             non-technical readers.\n",
            self.title
        );

        let instructions = agent.instructions.trim();
        if !instructions.is_empty() {
            prompt.push_str("\n## Instructions\n\n");
            prompt.push_str(instructions);
            prompt.push('\n');
        }

        prompt.push_str("\n## Context\n\n");
        if context.trim().is_empty() {
            prompt.push_str("(No previous context. This is the first step.)\n");
        } else {
            prompt.push_str(context.trim());
            prompt.push('\n');
        }

        if let Some(contract) = self.output_contract {
            prompt.push_str("\n## Output\n\n");
            prompt.push_str(contract);
            if matches!(self.draft, DraftHandling::Replace) {
                prompt.push_str("\n\n");
                prompt.push_str(ISSUE_SHAPE);
            }
            prompt.push('\n');
        }

        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_roles_request_json_mode() {
        for role in [AgentRole::Writer, AgentRole::Reviewer, AgentRole::Seo, AgentRole::XPosting] {
            assert!(role_spec(role).json_mode, "{:?} should use JSON mode", role);
        }
        assert!(!role_spec(AgentRole::Researcher).json_mode);
        assert!(role_spec(AgentRole::Researcher).web_search);
        assert!(!role_spec(AgentRole::Writer).web_search);
    }

    #[test]
    fn every_text_role_has_an_output_contract() {
        for role in AgentRole::ALL {
            let spec = role_spec(role);
            assert_eq!(spec.role, role);
            assert_eq!(spec.output_contract.is_none(), role == AgentRole::Image);
        }
    }

    #[test]
    fn prompt_embeds_instructions_and_context() {
        let agent = AgentDefinition::new("Writer", AgentRole::Writer, "Keep it punchy.", "gemini-2.5-flash");
        let prompt = role_spec(AgentRole::Writer).build_prompt(&agent, "- ETF inflows hit $1B");
        assert!(prompt.contains("Newsletter Writer"));
        assert!(prompt.contains("Keep it punchy."));
        assert!(prompt.contains("ETF inflows hit $1B"));
        assert!(prompt.contains("\"stories\""));
    }

    #[test]
    fn first_step_prompt_notes_missing_context() {
        let agent = AgentDefinition::new("Researcher", AgentRole::Researcher, "", "");
        let prompt = role_spec(AgentRole::Researcher).build_prompt(&agent, "");
        assert!(prompt.contains("No previous context"));
        assert!(!prompt.contains("## Instructions"));
    }
}
