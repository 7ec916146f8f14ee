use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::debug;

use crate::llm::{
    AssistantReply, ChatClient, ChatMessage, ChatRequest, ChatRole, LlmError, ToolChoice,
    ToolInvocation,
};

/// Chat-completions client for any OpenAI-compatible endpoint. One request
/// per call, no retries: a stalled or failed call fails only the turn that
/// issued it.
pub struct OpenAiChatClient {
    client: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl OpenAiChatClient {
    pub fn new(
        api_key: SecretString,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| LlmError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    fn request_body(&self, request: &ChatRequest) -> Value {
        let messages: Vec<Value> = request.messages.iter().map(wire_message).collect();
        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": request.temperature,
        });

        if !request.tools.is_empty() && request.tool_choice != ToolChoice::None {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|spec| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": spec.name,
                            "description": spec.description,
                            "parameters": spec.parameters,
                        }
                    })
                })
                .collect();
            body["tools"] = Value::Array(tools);
            body["tool_choice"] = match request.tool_choice {
                ToolChoice::Auto => json!("auto"),
                ToolChoice::Required(name) => {
                    json!({"type": "function", "function": {"name": name}})
                }
                ToolChoice::None => unreachable!("tool_choice none is handled above"),
            };
        }

        body
    }
}

#[async_trait]
impl ChatClient for OpenAiChatClient {
    async fn chat(&self, request: ChatRequest) -> Result<AssistantReply, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(&request);
        debug!(
            event_name = "llm.request",
            model = %self.model,
            message_count = request.messages.len(),
            tool_count = request.tools.len(),
            "sending chat completion request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|err| LlmError::Transport(err.to_string()))?;

        let status = response.status();
        let text = response.text().await.map_err(|err| LlmError::Transport(err.to_string()))?;

        if !status.is_success() {
            return Err(LlmError::Api { status: status.as_u16(), body: text });
        }

        let payload: Value =
            serde_json::from_str(&text).map_err(|err| LlmError::Decode(err.to_string()))?;
        parse_reply(&payload)
    }
}

fn wire_message(message: &ChatMessage) -> Value {
    match message.role {
        ChatRole::System => json!({"role": "system", "content": message.content}),
        ChatRole::User => json!({"role": "user", "content": message.content}),
        ChatRole::Assistant => match &message.tool_call {
            Some(invocation) => json!({
                "role": "assistant",
                "content": message.content,
                "tool_calls": [{
                    "id": invocation.id,
                    "type": "function",
                    "function": {
                        "name": invocation.name,
                        "arguments": invocation.arguments,
                    }
                }]
            }),
            None => json!({"role": "assistant", "content": message.content}),
        },
        ChatRole::Tool => json!({
            "role": "tool",
            "tool_call_id": message.tool_call_id,
            "content": message.content,
        }),
    }
}

fn parse_reply(payload: &Value) -> Result<AssistantReply, LlmError> {
    let message = payload
        .pointer("/choices/0/message")
        .ok_or_else(|| LlmError::Decode("response has no choices".to_string()))?;

    let content = message
        .get("content")
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_string);

    let tool_call = message
        .pointer("/tool_calls/0")
        .map(|raw| -> Result<ToolInvocation, LlmError> {
            let id = raw
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| LlmError::Decode("tool call has no id".to_string()))?;
            let name = raw
                .pointer("/function/name")
                .and_then(Value::as_str)
                .ok_or_else(|| LlmError::Decode("tool call has no function name".to_string()))?;
            // Arguments arrive as a JSON-encoded string; pass it through
            // verbatim so schema violations surface at the protocol layer.
            let arguments = match raw.pointer("/function/arguments") {
                Some(Value::String(text)) => text.clone(),
                Some(other) => other.to_string(),
                None => "{}".to_string(),
            };
            Ok(ToolInvocation { id: id.to_string(), name: name.to_string(), arguments })
        })
        .transpose()?;

    if content.is_none() && tool_call.is_none() {
        return Err(LlmError::Decode(
            "response carried neither content nor a tool call".to_string(),
        ));
    }

    Ok(AssistantReply { content, tool_call })
}
