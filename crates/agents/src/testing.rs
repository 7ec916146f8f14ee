//! Test doubles shared across the agent runtime's test modules.

use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use snoozy_core::domain::product::{MattressSize, Product, ProductId};

use crate::llm::{AssistantReply, ChatClient, ChatRequest, LlmError, ToolInvocation};

/// A `ChatClient` that replays a fixed script of replies and records every
/// request it receives, in the manner of a scripted transport.
pub struct ScriptedChatClient {
    replies: Mutex<VecDeque<Result<AssistantReply, LlmError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedChatClient {
    pub fn with_replies(replies: Vec<Result<AssistantReply, LlmError>>) -> Self {
        Self { replies: Mutex::new(replies.into()), requests: Mutex::new(Vec::new()) }
    }

    pub fn text(content: &str) -> Result<AssistantReply, LlmError> {
        Ok(AssistantReply { content: Some(content.to_string()), tool_call: None })
    }

    pub fn tool_call(name: &str, arguments: &str) -> Result<AssistantReply, LlmError> {
        Ok(AssistantReply {
            content: None,
            tool_call: Some(ToolInvocation {
                id: format!("call-{name}"),
                name: name.to_string(),
                arguments: arguments.to_string(),
            }),
        })
    }

    pub async fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl ChatClient for ScriptedChatClient {
    async fn chat(&self, request: ChatRequest) -> Result<AssistantReply, LlmError> {
        self.requests.lock().await.push(request);
        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Transport("script exhausted".to_string())))
    }
}

pub fn product_fixture(id: &str, name: &str, price_cents: i64, sizes: Vec<MattressSize>) -> Product {
    Product {
        id: ProductId(id.to_string()),
        name: name.to_string(),
        price: Decimal::new(price_cents, 2),
        kind: "All-Foam".to_string(),
        height: "10 inches".to_string(),
        construction_layers: vec!["2\" Memory Foam Comfort Layer".to_string()],
        key_features: vec!["Pressure-relieving memory foam".to_string()],
        best_for: vec!["Side sleepers".to_string()],
        available_sizes: sizes,
        warranty: "10 years".to_string(),
        trial_period: "100 nights".to_string(),
        created_at: Utc::now(),
    }
}

pub fn catalog_fixture() -> Vec<Product> {
    vec![
        product_fixture(
            "ultra-comfort-mattress",
            "Ultra Comfort Mattress",
            129_900,
            vec![
                MattressSize::Twin,
                MattressSize::TwinXl,
                MattressSize::Full,
                MattressSize::Queen,
                MattressSize::King,
                MattressSize::CaliforniaKing,
            ],
        ),
        product_fixture(
            "eco-green",
            "Eco Green Mattress",
            119_900,
            vec![
                MattressSize::Twin,
                MattressSize::TwinXl,
                MattressSize::Full,
                MattressSize::Queen,
                MattressSize::King,
            ],
        ),
        product_fixture(
            "dream-sleep",
            "Dream Sleep Mattress",
            89_900,
            vec![MattressSize::Twin, MattressSize::Full, MattressSize::Queen, MattressSize::King],
        ),
    ]
}
