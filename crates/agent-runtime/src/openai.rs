//! OpenAI-compatible Chat Completions Provider
//!
//! Groq and OpenAI expose the same `/chat/completions` wire format with
//! native function calling, so one client serves both.
//!
//! | Backend | Base URL | Key |
//! |---------|----------|-----|
//! | Groq    | `https://api.groq.com/openai/v1` | `GROQ_API_KEY` |
//! | OpenAI  | `https://api.openai.com/v1`      | `OPENAI_API_KEY` |

use std::collections::HashMap;
use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{Completion, FinishReason, GenerationOptions, LlmProvider, ModelInfo, ProviderInfo, TokenUsage},
    tool::{ToolCall, ToolSchema},
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_OPENAI_MODEL: &str = "o4-mini";

/// Client configuration
#[derive(Clone, Debug)]
pub struct OpenAiCompatConfig {
    /// Display name ("Groq", "OpenAI")
    pub name: String,

    pub base_url: String,

    /// API key; `None` leaves the backend configured but unusable
    pub api_key: Option<String>,

    /// Env var the key is read from, for diagnostics
    pub key_var: String,

    pub model: String,

    /// HTTP timeout in seconds
    pub timeout_secs: u64,
}

impl OpenAiCompatConfig {
    pub fn groq_from_env() -> Self {
        Self::from_env("Groq", GROQ_BASE_URL, "GROQ_API_KEY", DEFAULT_GROQ_MODEL)
    }

    pub fn openai_from_env() -> Self {
        Self::from_env("OpenAI", OPENAI_BASE_URL, "OPENAI_API_KEY", DEFAULT_OPENAI_MODEL)
    }

    fn from_env(name: &str, base_url: &str, key_var: &str, model: &str) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            api_key: std::env::var(key_var).ok().filter(|k| !k.trim().is_empty()),
            key_var: key_var.into(),
            model: model.into(),
            timeout_secs: 60,
        }
    }
}

/// Provider speaking the OpenAI chat completions protocol
pub struct OpenAiCompatProvider {
    client: Client,
    config: OpenAiCompatConfig,
}

impl OpenAiCompatProvider {
    pub fn new(config: OpenAiCompatConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("HTTP client: {}", e)))?;

        if config.api_key.is_none() {
            tracing::warn!(backend = %config.name, "{} not set - backend calls will fail", config.key_var);
        }

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &OpenAiCompatConfig {
        &self.config
    }

    fn api_key(&self) -> Result<&str> {
        self.config.api_key.as_deref().ok_or_else(|| {
            AgentError::BackendUnavailable(format!("{} not set", self.config.key_var))
        })
    }

    fn build_request<'a>(
        messages: &'a [Message],
        tools: &'a [ToolSchema],
        options: &'a GenerationOptions,
    ) -> ChatRequest<'a> {
        ChatRequest {
            model: &options.model,
            messages: messages.iter().map(WireMessage::from_message).collect(),
            tools: tools.iter().map(WireTool::from_schema).collect(),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        }
    }

    fn convert_response(response: ChatResponse, model: &str) -> Result<Completion> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Parse("response has no choices".into()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(WireToolCall::into_tool_call)
            .collect();

        let finish_reason = choice.finish_reason.as_deref().map(|r| match r {
            "stop" => FinishReason::Stop,
            "length" => FinishReason::Length,
            "tool_calls" | "function_call" => FinishReason::ToolUse,
            "content_filter" => FinishReason::ContentFilter,
            _ => FinishReason::Error,
        });

        Ok(Completion {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            model: response.model.unwrap_or_else(|| model.to_string()),
            usage: response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            finish_reason,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: self.config.name.clone(),
            model: self.config.model.clone(),
            supports_tools: true,
        }
    }

    async fn health_check(&self) -> Result<bool> {
        if self.config.api_key.is_none() {
            return Ok(false);
        }
        match self.list_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!(backend = %self.config.name, "Health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let key = self.api_key()?;
        let request = Self::build_request(messages, tools, options);

        let response = self.client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::BackendUnavailable(format!("{}: {}", self.config.name, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    AgentError::Config(format!("{} rejected the API key: {}", self.config.name, body))
                }
                _ => AgentError::BackendUnavailable(format!("{} returned {}: {}", self.config.name, status, body)),
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Parse(format!("{} response: {}", self.config.name, e)))?;

        Self::convert_response(body, &options.model)
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let key = self.api_key()?;
        let response: ModelsResponse = self.client
            .get(format!("{}/models", self.config.base_url))
            .bearer_auth(key)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AgentError::BackendUnavailable(e.to_string()))?
            .json()
            .await
            .map_err(|e| AgentError::Parse(e.to_string()))?;

        Ok(response
            .data
            .into_iter()
            .map(|m| ModelInfo {
                name: m.id.clone(),
                id: m.id,
            })
            .collect())
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl WireMessage {
    fn from_message(message: &Message) -> Self {
        let role = match (message.role, &message.tool_call_id) {
            (Role::System, _) => "system",
            (Role::User, _) => "user",
            (Role::Assistant, _) => "assistant",
            (Role::Tool, Some(_)) => "tool",
            // Tool output without a call id cannot be paired, pass it as context
            (Role::Tool, None) => "user",
        };

        Self {
            role,
            content: message.content.clone(),
            tool_calls: message.tool_calls.iter().map(WireToolCall::from_tool_call).collect(),
            tool_call_id: message.tool_call_id.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunction,
}

fn function_kind() -> String {
    "function".into()
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    /// JSON-encoded argument object
    arguments: String,
}

impl WireToolCall {
    fn from_tool_call(call: &ToolCall) -> Self {
        Self {
            id: call.id.clone(),
            kind: function_kind(),
            function: WireFunction {
                name: call.name.clone(),
                arguments: serde_json::to_string(&call.arguments).unwrap_or_else(|_| "{}".into()),
            },
        }
    }

    fn into_tool_call(self) -> ToolCall {
        let arguments = match serde_json::from_str::<Value>(&self.function.arguments) {
            Ok(Value::Object(map)) => map.into_iter().collect(),
            Ok(Value::Null) => HashMap::new(),
            Ok(other) => {
                tracing::warn!(tool = %self.function.name, args = %other, "Tool arguments are not an object");
                HashMap::new()
            }
            Err(e) => {
                tracing::warn!(tool = %self.function.name, error = %e, "Tool arguments are not valid JSON");
                HashMap::new()
            }
        };

        ToolCall::new(self.function.name, arguments).with_id(self.id)
    }
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionDef,
}

#[derive(Debug, Serialize)]
struct WireFunctionDef {
    name: String,
    description: String,
    parameters: Value,
}

impl WireTool {
    fn from_schema(schema: &ToolSchema) -> Self {
        Self {
            kind: "function",
            function: WireFunctionDef {
                name: schema.name.clone(),
                description: schema.description.clone(),
                parameters: schema.parameters_json_schema(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Vec<WireModel>,
}

#[derive(Debug, Deserialize)]
struct WireModel {
    id: String,
}
