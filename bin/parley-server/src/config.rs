//! Server configuration, loaded from environment variables at startup.

use parley_core::pipeline::DEFAULT_TOKEN_BUDGET;
use parley_core::pipeline::model::{DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Runtime configuration for parley-server.
///
/// Every field has a default so the server starts without any environment
/// variables set (the model call will fail without an API key, though).
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:8002"`).
    pub bind_address: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Also write daily-rolling log files into this directory.
    pub log_dir: Option<String>,

    /// Comma-separated list of allowed CORS origins; `None` allows any.
    pub cors_allowed_origins: Option<String>,

    /// Serve Swagger UI at `/swagger-ui`.
    pub enable_swagger: bool,

    /// Model name sent with each completion request.
    pub model: String,

    /// Base URL of the OpenAI-compatible endpoint.
    pub model_base_url: String,

    pub model_api_key: Option<String>,

    /// Trim history to `token_budget` before calling the model.
    pub trim_history: bool,

    pub token_budget: usize,

    /// minijinja template for a system message; the profile is `user`.
    pub system_prompt: Option<String>,

    /// API base URL used by the UI page; empty means same origin.
    pub api_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8002".to_owned(),
            log_level: "info".to_owned(),
            log_json: false,
            log_dir: None,
            cors_allowed_origins: None,
            enable_swagger: true,
            model: DEFAULT_MODEL.to_owned(),
            model_base_url: DEFAULT_BASE_URL.to_owned(),
            model_api_key: None,
            trim_history: false,
            token_budget: DEFAULT_TOKEN_BUDGET,
            system_prompt: None,
            api_base_url: String::new(),
        }
    }
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_address: env_or("PARLEY_BIND", &defaults.bind_address),
            log_level: env_or("PARLEY_LOG", &defaults.log_level),
            log_json: parse_bool("PARLEY_LOG_JSON", defaults.log_json),
            log_dir: env_opt("PARLEY_LOG_DIR"),
            cors_allowed_origins: env_opt("PARLEY_CORS_ORIGINS"),
            enable_swagger: parse_bool("PARLEY_ENABLE_SWAGGER", defaults.enable_swagger),
            model: env_or("PARLEY_MODEL", &defaults.model),
            model_base_url: env_or("PARLEY_MODEL_BASE_URL", &defaults.model_base_url),
            model_api_key: env_opt("OPENAI_API_KEY"),
            trim_history: parse_bool("PARLEY_TRIM_HISTORY", defaults.trim_history),
            token_budget: parse_env("PARLEY_TOKEN_BUDGET", defaults.token_budget),
            system_prompt: env_opt("PARLEY_SYSTEM_PROMPT"),
            api_base_url: env_or("PARLEY_API_BASE_URL", &defaults.api_base_url),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_point_at_openai_without_trimming() {
        let cfg = Config::default();
        assert_eq!(cfg.model, "gpt-4.1-mini");
        assert_eq!(cfg.token_budget, 128);
        assert!(!cfg.trim_history);
        assert!(cfg.enable_swagger);
    }
}
