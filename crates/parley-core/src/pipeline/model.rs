//! Chat model clients.
//!
//! A [`ChatModel`] returns the raw reply value exactly as the provider sent
//! it; checking that it is a usable string is the pipeline's job, so a
//! malformed reply is reported differently from a failed call.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, instrument};

use crate::entities::Message;
use crate::pipeline::GenerationError;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Longest slice of an error body echoed into an error message.
const ERROR_BODY_PREVIEW: usize = 512;

#[async_trait]
pub trait ChatModel: Send + Sync {
    fn name(&self) -> &str;

    /// Submit `messages` and return the reply content value.
    async fn complete(&self, messages: &[Message]) -> Result<Value, GenerationError>;
}

/// Connection settings for an OpenAI-compatible `chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl Default for OpenAiCompatibleConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            api_key: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

impl<'a> From<&'a Message> for WireMessage<'a> {
    fn from(message: &'a Message) -> Self {
        Self {
            role: message.role.as_str(),
            content: &message.content,
        }
    }
}

/// Client for OpenAI and servers speaking the same protocol (Ollama, vLLM, ...).
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleModel {
    config: OpenAiCompatibleConfig,
    client: Client,
}

impl OpenAiCompatibleModel {
    pub fn new(config: OpenAiCompatibleConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| GenerationError::Service(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatibleModel {
    fn name(&self) -> &str {
        &self.config.model
    }

    #[instrument(skip(self, messages), fields(model = %self.config.model, messages = messages.len()))]
    async fn complete(&self, messages: &[Message]) -> Result<Value, GenerationError> {
        let body = CompletionRequest {
            model: &self.config.model,
            messages: messages.iter().map(WireMessage::from).collect(),
        };

        let mut request = self.client.post(self.api_url("chat/completions")).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            error!(error = %e, base_url = %self.config.base_url, "model request failed");
            GenerationError::Service(format!("failed to reach model endpoint: {e}"))
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            GenerationError::Service(format!("failed to read model response: {e}"))
        })?;

        if !status.is_success() {
            let preview: String = text.chars().take(ERROR_BODY_PREVIEW).collect();
            return Err(GenerationError::Service(format!(
                "model endpoint returned {status}: {preview}"
            )));
        }

        let payload: Value = serde_json::from_str(&text).map_err(|e| {
            GenerationError::Service(format!("model response is not JSON: {e}"))
        })?;

        let reply = reply_content(&payload);
        debug!(is_string = reply.is_string(), "model replied");
        Ok(reply)
    }
}

/// `choices[0].message.content`, or `null` when any part of the path is missing.
pub fn reply_content(payload: &Value) -> Value {
    payload
        .pointer("/choices/0/message/content")
        .cloned()
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn reply_content_reads_first_choice() {
        let payload = json!({
            "choices": [
                { "message": { "role": "assistant", "content": "hello" } },
                { "message": { "role": "assistant", "content": "ignored" } }
            ]
        });
        assert_eq!(reply_content(&payload), json!("hello"));
    }

    #[test]
    fn reply_content_is_null_when_missing() {
        assert_eq!(reply_content(&json!({})), Value::Null);
        assert_eq!(reply_content(&json!({ "choices": [] })), Value::Null);
        assert_eq!(
            reply_content(&json!({ "choices": [{ "message": {} }] })),
            Value::Null
        );
    }

    #[test]
    fn reply_content_keeps_non_string_values() {
        let payload = json!({ "choices": [{ "message": { "content": 123 } }] });
        assert_eq!(reply_content(&payload), json!(123));
    }

    #[test]
    fn request_body_uses_wire_roles() {
        let messages = vec![Message::system("be brief"), Message::user("hi")];
        let body = CompletionRequest {
            model: "m",
            messages: messages.iter().map(WireMessage::from).collect(),
        };
        let value = serde_json::to_value(&body).expect("serialize");
        assert_eq!(
            value,
            json!({
                "model": "m",
                "messages": [
                    { "role": "system", "content": "be brief" },
                    { "role": "user", "content": "hi" }
                ]
            })
        );
    }

    #[test]
    fn api_url_joins_without_double_slash() {
        let model = OpenAiCompatibleModel::new(OpenAiCompatibleConfig {
            base_url: "http://localhost:11434/v1/".into(),
            ..OpenAiCompatibleConfig::default()
        })
        .expect("client");
        assert_eq!(
            model.api_url("chat/completions"),
            "http://localhost:11434/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_service_error() {
        let model = OpenAiCompatibleModel::new(OpenAiCompatibleConfig {
            base_url: "http://127.0.0.1:9/v1".into(),
            ..OpenAiCompatibleConfig::default()
        })
        .expect("client");
        let err = model.complete(&[Message::user("hi")]).await.unwrap_err();
        assert!(matches!(err, GenerationError::Service(_)), "got {err:?}");
    }
}
