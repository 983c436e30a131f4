//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use parley_core::pipeline::{OpenAiCompatibleConfig, OpenAiCompatibleModel};
use parley_core::{Database, GenerationError, GenerationPipeline, Generator};

use crate::config::Config;

/// State shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// User and conversation records.
    pub store: Arc<Database>,
    /// Produces assistant replies.
    pub generator: Arc<dyn Generator>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

/// Build the production generation pipeline described by `cfg`.
pub fn build_generator(cfg: &Config) -> Result<Arc<dyn Generator>, GenerationError> {
    let model = OpenAiCompatibleModel::new(OpenAiCompatibleConfig {
        base_url: cfg.model_base_url.clone(),
        model: cfg.model.clone(),
        api_key: cfg.model_api_key.clone(),
    })?;

    let mut builder = GenerationPipeline::builder(Arc::new(model));
    if cfg.trim_history {
        builder = builder.trim(cfg.token_budget);
    }
    if let Some(template) = &cfg.system_prompt {
        builder = builder.system_prompt(template.clone());
    }
    Ok(Arc::new(builder.build()?))
}
