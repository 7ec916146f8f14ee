use std::fmt::Write as _;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tracing::info;

use snoozy_core::config::AgentsConfig;
use snoozy_core::domain::conversation::{recent_window, Turn};

use crate::llm::{ChatClient, ChatMessage, ChatRequest, ToolChoice, ToolSpec};
use crate::responder::{AgentError, ResponderKind};

const ROUTE_TOOL: &str = "route_to_agent";

/// One enabled responder as the router sees it: identity plus the routing
/// keyword hints from configuration.
#[derive(Clone, Debug)]
pub struct RouterProfile {
    pub kind: ResponderKind,
    pub keywords: Vec<String>,
}

impl RouterProfile {
    /// The enabled subset of the configured responders, in declaration order.
    pub fn enabled_from_config(agents: &AgentsConfig) -> Vec<Self> {
        let mut profiles = Vec::new();
        for (kind, profile) in [
            (ResponderKind::ProductDetails, &agents.product_details),
            (ResponderKind::Reviews, &agents.reviews),
            (ResponderKind::Orders, &agents.orders),
        ] {
            if profile.enabled {
                profiles.push(Self { kind, keywords: profile.keywords.clone() });
            }
        }
        profiles
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RouterDecision {
    pub kind: ResponderKind,
    pub confidence: f64,
    pub rationale: String,
}

#[derive(Debug, Deserialize)]
struct RouteArguments {
    agent_type: String,
    confidence: f64,
    reasoning: String,
}

/// Classifies one message into exactly one responder identity via a forced
/// tool call at low temperature. Stateless beyond the enabled set captured
/// at construction; a model answer outside the expected shape is fatal for
/// the turn, never silently defaulted.
pub struct Router {
    client: Arc<dyn ChatClient>,
    profiles: Vec<RouterProfile>,
    temperature: f32,
    history_turns: usize,
}

impl Router {
    pub fn new(
        client: Arc<dyn ChatClient>,
        profiles: Vec<RouterProfile>,
        temperature: f32,
        history_turns: usize,
    ) -> Self {
        Self { client, profiles, temperature, history_turns }
    }

    pub async fn route(
        &self,
        message: &str,
        history: &[Turn],
    ) -> Result<RouterDecision, AgentError> {
        let mut messages = vec![ChatMessage::system(self.system_prompt())];
        messages
            .extend(recent_window(history, self.history_turns).iter().map(ChatMessage::from_turn));
        messages.push(ChatMessage::user(message));

        let reply = self
            .client
            .chat(ChatRequest {
                messages,
                tools: vec![self.route_spec()],
                tool_choice: ToolChoice::Required(ROUTE_TOOL),
                temperature: self.temperature,
            })
            .await?;

        let invocation = reply.tool_call.ok_or_else(|| {
            AgentError::Protocol("router model answered in free text".to_string())
        })?;
        if invocation.name != ROUTE_TOOL {
            return Err(AgentError::Protocol(format!(
                "router model called `{}` instead of `{ROUTE_TOOL}`",
                invocation.name
            )));
        }

        let arguments: RouteArguments = invocation
            .parse_arguments()
            .ok()
            .and_then(|value| serde_json::from_value(value).ok())
            .ok_or_else(|| {
                AgentError::Protocol("router tool arguments did not match the schema".to_string())
            })?;

        let kind = self
            .profiles
            .iter()
            .map(|profile| profile.kind)
            .find(|kind| kind.id() == arguments.agent_type)
            .ok_or_else(|| {
                AgentError::Protocol(format!(
                    "router selected unknown or disabled agent `{}`",
                    arguments.agent_type
                ))
            })?;

        if !(0.0..=1.0).contains(&arguments.confidence) {
            return Err(AgentError::Protocol(format!(
                "router confidence {} is outside [0, 1]",
                arguments.confidence
            )));
        }

        info!(
            event_name = "router.decision",
            agent = kind.id(),
            confidence = arguments.confidence,
            rationale = arguments.reasoning.as_str(),
            "routing decision made"
        );

        Ok(RouterDecision {
            kind,
            confidence: arguments.confidence,
            rationale: arguments.reasoning,
        })
    }

    fn system_prompt(&self) -> String {
        let mut agents_block = String::new();
        for (index, profile) in self.profiles.iter().enumerate() {
            let _ = writeln!(agents_block, "{}. {} Agent", index + 1, profile.kind.display_name());
            for responsibility in profile.kind.responsibilities() {
                let _ = writeln!(agents_block, "   - {responsibility}");
            }
            let _ = writeln!(agents_block, "   KEYWORDS: {}", profile.keywords.join(", "));
        }

        format!(
            "You are a router agent that directs customer queries to specialized agents.\n\
\n\
AVAILABLE AGENTS:\n{agents_block}\n\
ROUTING RULES:\n\
1. Order Process Priority:\n\
   - ANY purchase intent -> Orders Agent\n\
   - ANY order details -> Orders Agent\n\
   - STAY with Orders Agent until order complete\n\
\n\
2. Context Awareness:\n\
   - Check conversation history for active orders\n\
   - Maintain agent continuity when appropriate\n\
   - Consider multi-step interactions\n\
\n\
3. Default Behaviors:\n\
   - Product comparisons -> Product Details first\n\
   - Purchase intent -> Orders immediately\n\
   - Review requests -> Reviews directly\n\
\n\
RESPONSE FORMAT:\n\
Use the route_to_agent function with:\n\
- agent_type: Selected agent ID\n\
- confidence: Routing confidence (0-1)\n\
- reasoning: Brief explanation"
        )
    }

    fn route_spec(&self) -> ToolSpec {
        let agent_ids: Vec<&'static str> =
            self.profiles.iter().map(|profile| profile.kind.id()).collect();

        ToolSpec {
            name: ROUTE_TOOL,
            description: "Route the query to a specialized agent",
            parameters: json!({
                "type": "object",
                "properties": {
                    "agent_type": {
                        "type": "string",
                        "enum": agent_ids,
                        "description": "The type of agent to route to"
                    },
                    "confidence": {
                        "type": "number",
                        "minimum": 0,
                        "maximum": 1,
                        "description": "Confidence in routing decision"
                    },
                    "reasoning": {
                        "type": "string",
                        "description": "Brief explanation for routing choice"
                    }
                },
                "required": ["agent_type", "confidence", "reasoning"]
            }),
        }
    }
}
