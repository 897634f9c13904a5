//! Workflow engine - sequential agent pipelines that produce newsletter issues.
//!
//! # Architecture
//!
//! ```text
//! WorkflowDefinition.steps ──► WorkflowOrchestrator
//!                                    │  context string piped step to step
//!                              AgentStepExecutor ── roles::role_spec(role)
//!                               │              │
//!                     TextGenerator      ImageGenerator (image role only)
//!                   (gemini / openai)     (submit + poll)
//! ```

pub mod executor;
pub mod generation;
pub mod image;
pub mod json;
pub mod roles;
pub mod step;

pub use executor::{WorkflowOrchestrator, WorkflowRunResult};
pub use generation::{GenerationError, GenerationRequest, HttpTextGenerator, TextGenerator};
pub use image::{build_image_prompt, HttpImageGenerator, ImageCategory, ImageError, ImageGenerator};
pub use json::{parse_structured, ParsedJson};
pub use roles::{role_spec, DraftHandling, RoleSpec};
pub use step::AgentStepExecutor;
