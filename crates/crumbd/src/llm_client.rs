//! Model client abstraction.
//!
//! The orchestrator only needs one operation: send a chat transcript, get one
//! assistant message back. `HttpLlmClient` speaks the OpenAI-compatible chat
//! completions API (x.ai by default); `FakeLlmClient` replays scripted replies
//! for tests.

use async_trait::async_trait;
use crumb_shared::tools::ToolSpec;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

/// Model client errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("{0} is not set; export the model provider API key before starting crumbd")]
    MissingCredential(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Invalid JSON response: {0}")]
    InvalidJson(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Model returned no message")]
    EmptyResponse,
}

/// Whether the model may call tools this round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    Auto,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments, exactly as the model produced them
    #[serde(default, deserialize_with = "arguments_text")]
    pub arguments: String,
}

/// A tool call emitted by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionCall,
}

impl ToolInvocation {
    pub fn new(id: &str, name: &str, arguments: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: function_kind(),
            function: FunctionCall {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        }
    }

    /// Read one `tool_calls` entry without failing the whole message. A
    /// missing id gets a positional one; a missing or non-string name is
    /// left empty and dispatches as a no-op.
    fn from_wire(index: usize, entry: &Value) -> Self {
        let id = entry
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("call_{}", index));
        let function = entry.get("function");
        let name = function
            .and_then(|f| f.get("name"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        let arguments = match function.and_then(|f| f.get("arguments")) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        Self::new(&id, name, &arguments)
    }
}

fn function_kind() -> String {
    "function".to_string()
}

/// Some providers send arguments as an object instead of a string.
fn arguments_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    })
}

/// One transcript entry, serialized in chat-completions wire format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ChatMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolInvocation>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System { content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User { content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Tool {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
        }
    }
}

/// The assistant's reply for one round
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantMessage {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolInvocation>,
}

impl AssistantMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn with_tool_calls(content: Option<&str>, tool_calls: Vec<ToolInvocation>) -> Self {
        Self {
            content: content.map(str::to_string),
            tool_calls,
        }
    }

    /// The transcript entry echoing this reply back to the model
    pub fn to_message(&self) -> ChatMessage {
        ChatMessage::Assistant {
            content: self.content.clone(),
            tool_calls: self.tool_calls.clone(),
        }
    }
}

/// One model invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolSpec>,
    pub tool_choice: ToolChoice,
    pub max_tokens: u32,
}

impl ChatRequest {
    /// Chat-completions request body
    pub fn to_wire(&self) -> Value {
        let tools: Vec<Value> = self
            .tools
            .iter()
            .map(|spec| json!({ "type": "function", "function": spec }))
            .collect();
        json!({
            "model": self.model,
            "messages": self.messages,
            "tools": tools,
            "tool_choice": self.tool_choice,
            "max_tokens": self.max_tokens,
        })
    }
}

/// Generic model client
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Run one chat round and return the first choice's message
    async fn chat(&self, request: &ChatRequest) -> Result<AssistantMessage, LlmError>;
}

/// OpenAI-compatible chat completions client
pub struct HttpLlmClient {
    endpoint: String,
    api_key: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl HttpLlmClient {
    pub fn new(endpoint: &str, api_key: String, timeout_secs: u64) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LlmError::HttpError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            timeout_secs,
            client,
        })
    }
}

#[derive(Deserialize)]
struct WireMessage {
    content: Option<String>,
    /// Entries are read one by one so a single bad call cannot sink the reply
    #[serde(default)]
    tool_calls: Value,
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn chat(&self, request: &ChatRequest) -> Result<AssistantMessage, LlmError> {
        let url = format!("{}/chat/completions", self.endpoint);
        debug!(
            "chat round: {} messages, tool_choice={:?}",
            request.messages.len(),
            request.tool_choice
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request.to_wire())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(self.timeout_secs)
                } else {
                    LlmError::HttpError(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(LlmError::HttpError(format!(
                "HTTP {} from model provider: {}",
                status, snippet
            )));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidJson(format!("Failed to parse response: {}", e)))?;

        parse_completion(&response_json)
    }
}

/// Pull the first choice's message out of a chat-completions response.
pub fn parse_completion(response: &Value) -> Result<AssistantMessage, LlmError> {
    let message = response
        .get("choices")
        .and_then(|v| v.get(0))
        .and_then(|v| v.get("message"))
        .filter(|v| !v.is_null())
        .ok_or(LlmError::EmptyResponse)?;

    let wire: WireMessage = serde_json::from_value(message.clone())
        .map_err(|e| LlmError::InvalidJson(format!("Unexpected message shape: {}", e)))?;

    Ok(AssistantMessage {
        content: wire.content,
        tool_calls: wire
            .tool_calls
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .enumerate()
                    .map(|(i, entry)| ToolInvocation::from_wire(i, entry))
                    .collect()
            })
            .unwrap_or_default(),
    })
}

/// Scripted model client for tests
pub struct FakeLlmClient {
    responses: Mutex<VecDeque<Result<AssistantMessage, LlmError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl FakeLlmClient {
    /// Replies are returned in order, one per call
    pub fn new(responses: Vec<Result<AssistantMessage, LlmError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(messages: Vec<AssistantMessage>) -> Self {
        Self::new(messages.into_iter().map(Ok).collect())
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<ChatRequest> {
        lock(&self.requests).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl LlmClient for FakeLlmClient {
    async fn chat(&self, request: &ChatRequest) -> Result<AssistantMessage, LlmError> {
        lock(&self.requests).push(request.clone());
        lock(&self.responses)
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyResponse))
    }
}
