use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{error, info};

use snoozy_core::config::AppConfig;
use snoozy_core::domain::conversation::{recent_window, Turn};
use snoozy_db::repositories::{OrderRepository, ProductRepository, ReviewRepository};

use crate::llm::ChatClient;
use crate::responder::{AgentError, Responder, ResponderKind, ToolHandler};
use crate::router::{Router, RouterProfile};
use crate::tools::{OrderTools, ProductDetailsTools, ReviewTools};

/// The only failure text a customer ever sees. Raw errors go to the log.
pub const APOLOGY: &str =
    "I apologize, but I encountered an error processing your request. Please try again.";

/// Session orchestrator: owns every conversation history, routes each turn,
/// and keeps one lazily-built responder per kind for its own lifetime.
///
/// Concurrency: turns on *different* sessions proceed in parallel; turns on
/// the *same* session serialize on that session's lock, so interleaved
/// requests cannot corrupt a history. All handles are passed in explicitly,
/// there is no process-wide state.
pub struct SupportSystem {
    client: Arc<dyn ChatClient>,
    products: Arc<dyn ProductRepository>,
    reviews: Arc<dyn ReviewRepository>,
    orders: Arc<dyn OrderRepository>,
    router: Router,
    reply_temperature: f32,
    responder_history_turns: usize,
    responders: RwLock<HashMap<ResponderKind, Arc<Responder>>>,
    sessions: RwLock<HashMap<String, Arc<Mutex<Vec<Turn>>>>>,
}

impl SupportSystem {
    pub fn new(
        client: Arc<dyn ChatClient>,
        products: Arc<dyn ProductRepository>,
        reviews: Arc<dyn ReviewRepository>,
        orders: Arc<dyn OrderRepository>,
        config: &AppConfig,
    ) -> Self {
        let profiles = RouterProfile::enabled_from_config(&config.agents);
        info!(
            event_name = "session.system_initialized",
            enabled_responders = profiles.len(),
            "support system initialized"
        );

        let router = Router::new(
            client.clone(),
            profiles,
            config.llm.routing_temperature,
            config.chat.router_history_turns,
        );

        Self {
            client,
            products,
            reviews,
            orders,
            router,
            reply_temperature: config.llm.reply_temperature,
            responder_history_turns: config.chat.responder_history_turns,
            responders: RwLock::new(HashMap::new()),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Process one customer message and return the reply text.
    ///
    /// The turn pair is appended to the session history only on success; a
    /// failed turn leaves the history exactly as it was and returns the
    /// apology.
    pub async fn process_query(&self, session_id: &str, message: &str) -> String {
        info!(event_name = "session.query_received", session_id, "processing query");

        let session = self.session_handle(session_id).await;
        let mut history = session.lock().await;
        let context = recent_window(&history, self.responder_history_turns).to_vec();

        match self.run_turn(message, &context).await {
            Ok(reply) => {
                history.push(Turn::user(message));
                history.push(Turn::assistant(reply.clone()));
                info!(
                    event_name = "session.query_answered",
                    session_id,
                    history_len = history.len(),
                    "query processed"
                );
                reply
            }
            Err(agent_error) => {
                error!(
                    event_name = "session.query_failed",
                    session_id,
                    error = %agent_error,
                    "turn failed; replying with apology"
                );
                APOLOGY.to_string()
            }
        }
    }

    /// Empty (never delete) a session's history. A cleared session keeps its
    /// entry and routes normally on the next message.
    pub async fn clear_conversation(&self, session_id: &str) {
        info!(event_name = "session.cleared", session_id, "clearing conversation history");
        let session = self.session_handle(session_id).await;
        session.lock().await.clear();
    }

    async fn run_turn(&self, message: &str, context: &[Turn]) -> Result<String, AgentError> {
        let decision = self.router.route(message, context).await?;
        let responder = self.responder_for(decision.kind).await;
        responder.respond(message, context).await
    }

    async fn responder_for(&self, kind: ResponderKind) -> Arc<Responder> {
        if let Some(responder) = self.responders.read().await.get(&kind) {
            return responder.clone();
        }

        let mut responders = self.responders.write().await;
        responders.entry(kind).or_insert_with(|| Arc::new(self.build_responder(kind))).clone()
    }

    fn build_responder(&self, kind: ResponderKind) -> Responder {
        info!(event_name = "session.responder_built", responder = kind.id(), "building responder");
        let handler = match kind {
            ResponderKind::ProductDetails => {
                ToolHandler::ProductDetails(ProductDetailsTools::new(self.products.clone()))
            }
            ResponderKind::Reviews => {
                ToolHandler::Reviews(ReviewTools::new(self.products.clone(), self.reviews.clone()))
            }
            ResponderKind::Orders => {
                ToolHandler::Orders(OrderTools::new(self.products.clone(), self.orders.clone()))
            }
        };

        Responder::new(
            kind,
            handler,
            self.client.clone(),
            self.reply_temperature,
            self.responder_history_turns,
        )
    }

    async fn session_handle(&self, session_id: &str) -> Arc<Mutex<Vec<Turn>>> {
        if let Some(session) = self.sessions.read().await.get(session_id) {
            return session.clone();
        }

        let mut sessions = self.sessions.write().await;
        sessions.entry(session_id.to_string()).or_default().clone()
    }
}
