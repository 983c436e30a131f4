//! Generation pipeline.
//!
//! [`Generator`] is the one capability the conversation workflow needs: turn a
//! message history and a user profile into a reply string.
//! [`GenerationPipeline`] implements it as a fixed, linear run of stages over
//! a [`PipelineState`]:
//!
//! ```text
//! start -> [trim] -> [system prompt] -> generate -> end
//! ```
//!
//! The bracketed stages are optional and chosen at build time.  Each call is
//! stateless; nothing is remembered between invocations.

pub mod model;
pub mod trim;

use std::sync::Arc;

use async_trait::async_trait;
use minijinja::{Environment, context};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::entities::{Message, UserProfile};

pub use model::{ChatModel, OpenAiCompatibleConfig, OpenAiCompatibleModel};
pub use trim::{DEFAULT_TOKEN_BUDGET, count_tokens_approximately, trim_messages};

/// Why a generation attempt failed.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    /// The model endpoint could not be reached or answered with an error.
    #[error("model service error: {0}")]
    Service(String),

    /// The model answered, but without a usable reply string.
    #[error("malformed model response: {0}")]
    MalformedResponse(String),

    /// The pipeline itself is misconfigured (e.g. a bad prompt template).
    #[error("stage '{stage}' failed: {message}")]
    Stage { stage: &'static str, message: String },
}

#[async_trait]
pub trait Generator: Send + Sync {
    async fn invoke(
        &self,
        messages: &[Message],
        profile: &UserProfile,
    ) -> Result<String, GenerationError>;
}

/// Data threaded through the stages.
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub messages: Vec<Message>,
    pub profile: UserProfile,
    /// Set by the generate stage; validated after the last stage.
    pub response: Option<Value>,
}

impl PipelineState {
    pub fn new(messages: Vec<Message>, profile: UserProfile) -> Self {
        Self {
            messages,
            profile,
            response: None,
        }
    }

    /// Extract the reply, rejecting a missing or non-string response.
    pub fn into_reply(self) -> Result<String, GenerationError> {
        match self.response {
            Some(Value::String(reply)) => Ok(reply),
            Some(other) => Err(GenerationError::MalformedResponse(format!(
                "response payload is missing a response string (got {})",
                json_kind(&other)
            ))),
            None => Err(GenerationError::MalformedResponse(
                "pipeline produced no response".into(),
            )),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One step of the pipeline.
#[derive(Debug, Clone)]
pub enum Stage {
    /// Keep only the most recent messages within a token budget.
    Trim { max_tokens: usize },
    /// Prepend a system message rendered from a template with the profile.
    SystemPrompt { template: String },
    /// Call the chat model and store its raw reply.
    Generate,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Trim { .. } => "trim",
            Stage::SystemPrompt { .. } => "system_prompt",
            Stage::Generate => "generate",
        }
    }

    async fn run(
        &self,
        mut state: PipelineState,
        model: &dyn ChatModel,
    ) -> Result<PipelineState, GenerationError> {
        match self {
            Stage::Trim { max_tokens } => {
                let before = state.messages.len();
                state.messages = trim_messages(&state.messages, *max_tokens);
                debug!(before, after = state.messages.len(), max_tokens, "history trimmed");
            }
            Stage::SystemPrompt { template } => {
                let prompt = render_system_prompt(template, &state.profile)?;
                state.messages.insert(0, Message::system(prompt));
            }
            Stage::Generate => {
                state.response = Some(model.complete(&state.messages).await?);
            }
        }
        Ok(state)
    }
}

fn render_system_prompt(template: &str, profile: &UserProfile) -> Result<String, GenerationError> {
    Environment::new()
        .render_str(template, context! { user => profile })
        .map_err(|e| GenerationError::Stage {
            stage: "system_prompt",
            message: e.to_string(),
        })
}

/// The production [`Generator`]: optional trim and system prompt, then one
/// model call.
pub struct GenerationPipeline {
    model: Arc<dyn ChatModel>,
    stages: Vec<Stage>,
}

impl std::fmt::Debug for GenerationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationPipeline")
            .field("model", &self.model.name())
            .field("stages", &self.stages)
            .finish()
    }
}

impl GenerationPipeline {
    pub fn builder(model: Arc<dyn ChatModel>) -> GenerationPipelineBuilder {
        GenerationPipelineBuilder {
            model,
            trim: None,
            system_prompt: None,
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }
}

#[async_trait]
impl Generator for GenerationPipeline {
    async fn invoke(
        &self,
        messages: &[Message],
        profile: &UserProfile,
    ) -> Result<String, GenerationError> {
        let mut state = PipelineState::new(messages.to_vec(), profile.clone());
        for stage in &self.stages {
            debug!(stage = stage.name(), "running pipeline stage");
            state = stage.run(state, self.model.as_ref()).await?;
        }
        state.into_reply()
    }
}

/// Assembles a [`GenerationPipeline`]; stage order is fixed regardless of the
/// order the options are set in.
pub struct GenerationPipelineBuilder {
    model: Arc<dyn ChatModel>,
    trim: Option<usize>,
    system_prompt: Option<String>,
}

impl GenerationPipelineBuilder {
    /// Enable history trimming to `max_tokens`.
    pub fn trim(mut self, max_tokens: usize) -> Self {
        self.trim = Some(max_tokens);
        self
    }

    /// Prepend a system message rendered from `template` (minijinja syntax,
    /// the profile is available as `user`).
    pub fn system_prompt(mut self, template: impl Into<String>) -> Self {
        self.system_prompt = Some(template.into());
        self
    }

    /// Fails if the system prompt template does not parse.
    pub fn build(self) -> Result<GenerationPipeline, GenerationError> {
        let mut stages = Vec::new();
        if let Some(max_tokens) = self.trim {
            stages.push(Stage::Trim { max_tokens });
        }
        if let Some(template) = self.system_prompt {
            Environment::new()
                .template_from_str(&template)
                .map_err(|e| GenerationError::Stage {
                    stage: "system_prompt",
                    message: e.to_string(),
                })?;
            stages.push(Stage::SystemPrompt { template });
        }
        stages.push(Stage::Generate);
        Ok(GenerationPipeline {
            model: self.model,
            stages,
        })
    }
}
