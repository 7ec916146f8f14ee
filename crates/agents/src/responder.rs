use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use snoozy_core::domain::conversation::{recent_window, Turn};

use crate::llm::{
    ChatClient, ChatMessage, ChatRequest, LlmError, ToolChoice, ToolInvocation, ToolSpec,
};
use crate::tools::{OrderTools, ProductDetailsTools, ReviewTools, ToolError};

/// Failures inside the router/responder dispatch protocol. None of these
/// reach the transport: the session orchestrator logs them and answers with
/// a fixed apology.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("protocol violation: {0}")]
    Protocol(String),
}

/// The closed set of responder identities. Selection is always an exhaustive
/// match; there is no runtime registry to fall out of sync with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResponderKind {
    ProductDetails,
    Reviews,
    Orders,
}

impl ResponderKind {
    pub const ALL: [ResponderKind; 3] =
        [ResponderKind::ProductDetails, ResponderKind::Reviews, ResponderKind::Orders];

    pub fn id(&self) -> &'static str {
        match self {
            ResponderKind::ProductDetails => "product_details",
            ResponderKind::Reviews => "reviews",
            ResponderKind::Orders => "orders",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ResponderKind::ProductDetails => "Product Details",
            ResponderKind::Reviews => "Reviews",
            ResponderKind::Orders => "Orders",
        }
    }

    pub fn responsibilities(&self) -> &'static [&'static str] {
        match self {
            ResponderKind::ProductDetails => &[
                "Product information, features, specifications",
                "Price inquiries",
                "Product comparisons",
                "Technical questions",
            ],
            ResponderKind::Reviews => &[
                "Customer feedback and experiences",
                "Ratings and review analysis",
                "Customer satisfaction metrics",
            ],
            ResponderKind::Orders => &[
                "Purchase processing",
                "Order status and tracking",
                "Shipping and delivery",
                "Payment handling",
            ],
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }
}

/// One specialty's tool table. Specs, prompt construction, and execution all
/// dispatch through the same exhaustive match.
pub enum ToolHandler {
    ProductDetails(ProductDetailsTools),
    Reviews(ReviewTools),
    Orders(OrderTools),
}

impl ToolHandler {
    pub fn specs(&self) -> Vec<ToolSpec> {
        match self {
            ToolHandler::ProductDetails(_) => ProductDetailsTools::specs(),
            ToolHandler::Reviews(_) => ReviewTools::specs(),
            ToolHandler::Orders(_) => OrderTools::specs(),
        }
    }

    pub async fn system_prompt(&self) -> Result<String, ToolError> {
        match self {
            ToolHandler::ProductDetails(tools) => tools.system_prompt().await,
            ToolHandler::Reviews(tools) => tools.system_prompt().await,
            ToolHandler::Orders(tools) => tools.system_prompt().await,
        }
    }

    pub async fn execute(&self, name: &str, arguments: &Value) -> Result<Value, ToolError> {
        match self {
            ToolHandler::ProductDetails(tools) => tools.execute(name, arguments).await,
            ToolHandler::Reviews(tools) => tools.execute(name, arguments).await,
            ToolHandler::Orders(tools) => tools.execute(name, arguments).await,
        }
    }
}

/// One specialty responder: a system prompt built from live store data, the
/// specialty's tool table, and the two-call tool protocol around the LLM.
pub struct Responder {
    kind: ResponderKind,
    handler: ToolHandler,
    client: Arc<dyn ChatClient>,
    temperature: f32,
    history_turns: usize,
}

impl Responder {
    pub fn new(
        kind: ResponderKind,
        handler: ToolHandler,
        client: Arc<dyn ChatClient>,
        temperature: f32,
        history_turns: usize,
    ) -> Self {
        Self { kind, handler, client, temperature, history_turns }
    }

    pub fn kind(&self) -> ResponderKind {
        self.kind
    }

    /// Produce the final reply for one user turn.
    ///
    /// At most one tool call is served. If the model requests one, the tool
    /// executes locally, its result is appended to the message list, and one
    /// follow-up call (with no tool schema) produces the final text.
    /// Not-found conditions are fed back to the model as structured payloads
    /// so it can explain them; everything else propagates as an error.
    pub async fn respond(&self, message: &str, history: &[Turn]) -> Result<String, AgentError> {
        let system_prompt = self.handler.system_prompt().await?;

        let mut messages = Vec::with_capacity(self.history_turns + 2);
        messages.push(ChatMessage::system(system_prompt));
        messages.extend(
            recent_window(history, self.history_turns).iter().map(ChatMessage::from_turn),
        );
        messages.push(ChatMessage::user(message));

        let reply = self
            .client
            .chat(ChatRequest {
                messages: messages.clone(),
                tools: self.handler.specs(),
                tool_choice: ToolChoice::Auto,
                temperature: self.temperature,
            })
            .await?;

        let Some(invocation) = reply.tool_call else {
            return reply.content.ok_or_else(|| {
                AgentError::Protocol("model returned neither text nor a tool call".to_string())
            });
        };

        debug!(
            event_name = "responder.tool_requested",
            responder = self.kind.id(),
            tool = invocation.name.as_str(),
            "model requested a tool call"
        );

        let payload = self.serve_tool_call(&invocation).await?;
        messages.push(ChatMessage::assistant_tool_call(invocation.clone()));
        messages.push(ChatMessage::tool_result(&invocation.id, &payload));

        let followup =
            self.client.chat(ChatRequest::text_only(messages, self.temperature)).await?;
        followup.content.ok_or_else(|| {
            AgentError::Protocol("follow-up call returned no text".to_string())
        })
    }

    async fn serve_tool_call(&self, invocation: &ToolInvocation) -> Result<Value, AgentError> {
        let arguments = invocation.parse_arguments().map_err(|err| {
            ToolError::MalformedArguments {
                tool: invocation.name.clone(),
                detail: err.to_string(),
            }
        })?;

        match self.handler.execute(&invocation.name, &arguments).await {
            Ok(result) => Ok(result),
            Err(error) => match error.not_found_payload() {
                Some(payload) => {
                    warn!(
                        event_name = "responder.tool_not_found",
                        responder = self.kind.id(),
                        tool = invocation.name.as_str(),
                        error = %error,
                        "tool reported a not-found condition"
                    );
                    Ok(payload)
                }
                None => Err(error.into()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use snoozy_core::domain::conversation::Turn;
    use snoozy_db::repositories::{InMemoryOrderRepository, InMemoryProductRepository};

    use super::{AgentError, Responder, ResponderKind, ToolHandler};
    use crate::llm::{ChatRole, ToolChoice};
    use crate::testing::{catalog_fixture, ScriptedChatClient};
    use crate::tools::{OrderTools, ProductDetailsTools, ToolError};

    async fn product_responder(client: Arc<ScriptedChatClient>) -> Responder {
        let products =
            Arc::new(InMemoryProductRepository::with_products(catalog_fixture()).await);
        Responder::new(
            ResponderKind::ProductDetails,
            ToolHandler::ProductDetails(ProductDetailsTools::new(products)),
            client,
            0.7,
            5,
        )
    }

    #[test]
    fn kinds_round_trip_through_their_ids() {
        for kind in ResponderKind::ALL {
            assert_eq!(ResponderKind::from_id(kind.id()), Some(kind));
        }
        assert_eq!(ResponderKind::from_id("billing"), None);
    }

    #[tokio::test]
    async fn plain_text_reply_skips_the_tool_round() {
        let client = Arc::new(ScriptedChatClient::with_replies(vec![ScriptedChatClient::text(
            "We carry six mattresses, what matters most to you?",
        )]));
        let responder = product_responder(client.clone()).await;

        let reply = responder.respond("what do you sell?", &[]).await.expect("reply");
        assert!(reply.contains("six mattresses"));
        assert_eq!(client.requests().await.len(), 1, "no follow-up call without a tool call");
    }

    #[tokio::test]
    async fn tool_call_is_executed_and_fed_back() {
        let client = Arc::new(ScriptedChatClient::with_replies(vec![
            ScriptedChatClient::tool_call(
                "get_product_details",
                "{\"product_id\": \"eco-green\"}",
            ),
            ScriptedChatClient::text("The Eco Green runs $1199 with a 180 night trial."),
        ]));
        let responder = product_responder(client.clone()).await;

        let reply = responder.respond("tell me about the eco green", &[]).await.expect("reply");
        assert!(reply.contains("Eco Green"));

        let requests = client.requests().await;
        assert_eq!(requests.len(), 2);

        // First call offers the tool table, second call must not.
        assert!(!requests[0].tools.is_empty());
        assert_eq!(requests[0].tool_choice, ToolChoice::Auto);
        assert!(requests[1].tools.is_empty());

        // The follow-up sees the invocation and its serialized result.
        let followup = &requests[1].messages;
        let tool_message = followup
            .iter()
            .find(|message| message.role == ChatRole::Tool)
            .expect("tool result in follow-up");
        assert!(tool_message.content.as_deref().unwrap_or_default().contains("eco-green"));
    }

    #[tokio::test]
    async fn history_is_bounded_to_the_configured_window() {
        let client = Arc::new(ScriptedChatClient::with_replies(vec![ScriptedChatClient::text(
            "sure",
        )]));
        let responder = product_responder(client.clone()).await;

        let history: Vec<Turn> = (0..8)
            .map(|index| {
                if index % 2 == 0 {
                    Turn::user(format!("question {index}"))
                } else {
                    Turn::assistant(format!("answer {index}"))
                }
            })
            .collect();

        responder.respond("next question", &history).await.expect("reply");

        let request = &client.requests().await[0];
        // system + 5 history turns + current user message
        assert_eq!(request.messages.len(), 7);
        assert_eq!(request.messages[1].content.as_deref(), Some("answer 3"));
        assert_eq!(request.messages[5].content.as_deref(), Some("answer 7"));
    }

    #[tokio::test]
    async fn not_found_tool_results_continue_the_protocol() {
        let client = Arc::new(ScriptedChatClient::with_replies(vec![
            ScriptedChatClient::tool_call(
                "get_product_details",
                "{\"product_id\": \"cloud nine supreme\"}",
            ),
            ScriptedChatClient::text("We don't carry that one, but the Eco Green is similar."),
        ]));
        let responder = product_responder(client.clone()).await;

        let reply = responder.respond("do you have cloud nine?", &[]).await.expect("reply");
        assert!(reply.contains("don't carry"));

        let requests = client.requests().await;
        let tool_message = requests[1]
            .messages
            .iter()
            .find(|message| message.role == ChatRole::Tool)
            .expect("tool result");
        assert!(tool_message
            .content
            .as_deref()
            .unwrap_or_default()
            .contains("product_not_found"));
    }

    #[tokio::test]
    async fn malformed_tool_arguments_fail_the_turn() {
        let client = Arc::new(ScriptedChatClient::with_replies(vec![
            ScriptedChatClient::tool_call("get_product_details", "not valid json"),
        ]));
        let responder = product_responder(client).await;

        let result = responder.respond("details please", &[]).await;
        assert!(matches!(
            result,
            Err(AgentError::Tool(ToolError::MalformedArguments { .. }))
        ));
    }

    #[tokio::test]
    async fn validation_failures_propagate_as_errors() {
        let products =
            Arc::new(InMemoryProductRepository::with_products(catalog_fixture()).await);
        let orders = Arc::new(InMemoryOrderRepository::default());
        let client = Arc::new(ScriptedChatClient::with_replies(vec![
            ScriptedChatClient::tool_call(
                "create_order",
                &json!({
                    "product_id": "eco-green",
                    "size": "California King",
                    "delivery_address": "123 Main St",
                    "payment_method": "credit_card"
                })
                .to_string(),
            ),
        ]));
        let responder = Responder::new(
            ResponderKind::Orders,
            ToolHandler::Orders(OrderTools::new(products, orders)),
            client,
            0.7,
            5,
        );

        let result = responder.respond("order a california king eco green", &[]).await;
        assert!(matches!(result, Err(AgentError::Tool(ToolError::Validation(_)))));
    }

    #[tokio::test]
    async fn silent_model_reply_is_a_protocol_violation() {
        let client = Arc::new(ScriptedChatClient::with_replies(vec![Ok(
            crate::llm::AssistantReply { content: None, tool_call: None },
        )]));
        let responder = product_responder(client).await;

        let result = responder.respond("hello", &[]).await;
        assert!(matches!(result, Err(AgentError::Protocol(_))));
    }
}
