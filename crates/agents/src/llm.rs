use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use snoozy_core::domain::conversation::{Role, Turn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

/// One entry in the message list sent to the completion API. Assistant
/// entries may carry a tool invocation instead of text; tool entries carry
/// the serialized result of executing that invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolInvocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: Some(content.into()),
            tool_call: None,
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: Some(content.into()),
            tool_call: None,
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: Some(content.into()),
            tool_call: None,
            tool_call_id: None,
        }
    }

    pub fn assistant_tool_call(invocation: ToolInvocation) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: None,
            tool_call: Some(invocation),
            tool_call_id: None,
        }
    }

    pub fn tool_result(invocation_id: impl Into<String>, payload: &Value) -> Self {
        Self {
            role: ChatRole::Tool,
            content: Some(payload.to_string()),
            tool_call: None,
            tool_call_id: Some(invocation_id.into()),
        }
    }

    pub fn from_turn(turn: &Turn) -> Self {
        match turn.role {
            Role::User => Self::user(turn.content.clone()),
            Role::Assistant => Self::assistant(turn.content.clone()),
        }
    }
}

/// A structured request, emitted by the model, naming one declared tool.
/// Arguments stay a raw JSON string: whether they parse against the tool's
/// schema is a protocol-level question, answered by the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl ToolInvocation {
    pub fn parse_arguments(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.arguments)
    }
}

/// Declared tool: name, human-readable description, JSON-schema parameters.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

/// Whether the model may, must, or must not call a tool on this request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolChoice {
    Auto,
    Required(&'static str),
    None,
}

#[derive(Clone, Debug)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolSpec>,
    pub tool_choice: ToolChoice,
    pub temperature: f32,
}

impl ChatRequest {
    pub fn text_only(messages: Vec<ChatMessage>, temperature: f32) -> Self {
        Self { messages, tools: Vec::new(), tool_choice: ToolChoice::None, temperature }
    }
}

/// What the model answered: free text, one tool invocation, or (rarely)
/// both. Additional tool calls beyond the first are dropped by the client;
/// the dispatch protocol serves at most one per turn.
#[derive(Clone, Debug, PartialEq)]
pub struct AssistantReply {
    pub content: Option<String>,
    pub tool_call: Option<ToolInvocation>,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm request failed: {0}")]
    Transport(String),
    #[error("llm returned http {status}: {body}")]
    Api { status: u16, body: String },
    #[error("llm response could not be decoded: {0}")]
    Decode(String),
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<AssistantReply, LlmError>;
}
