use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use snoozy_agents::SupportSystem;

/// Shared handler state: the orchestrator plus the greeting returned on
/// connect and on clear.
#[derive(Clone)]
pub struct ChatState {
    pub support: Arc<SupportSystem>,
    pub welcome_message: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatMessageBody {
    pub message: String,
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponseBody {
    pub response: String,
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct ClearResponseBody {
    pub status: &'static str,
    pub message: &'static str,
    pub welcome_message: String,
}

/// One frame on the chat socket:
/// `{"type": "assistant" | "status" | "error", "content": "..."}`.
#[derive(Debug, Serialize)]
struct WsFrame<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    content: &'a str,
}

pub fn router(state: ChatState) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/chat/{session_id}/clear", post(clear_chat))
        .route("/ws/chat/{session_id}", get(ws_chat))
        .with_state(state)
}

/// Request/response chat. The session id is minted when the caller does not
/// supply one; the reply is always text, even on internal failure.
pub async fn chat(
    State(state): State<ChatState>,
    Json(body): Json<ChatMessageBody>,
) -> Json<ChatResponseBody> {
    let session_id = body.session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let response = state.support.process_query(&session_id, &body.message).await;
    Json(ChatResponseBody { response, session_id })
}

pub async fn clear_chat(
    Path(session_id): Path<String>,
    State(state): State<ChatState>,
) -> Json<ClearResponseBody> {
    state.support.clear_conversation(&session_id).await;
    Json(ClearResponseBody {
        status: "success",
        message: "Chat history cleared",
        welcome_message: state.welcome_message.clone(),
    })
}

pub async fn ws_chat(
    upgrade: WebSocketUpgrade,
    Path(session_id): Path<String>,
    State(state): State<ChatState>,
) -> impl IntoResponse {
    upgrade.on_upgrade(move |socket| run_socket(socket, session_id, state))
}

async fn run_socket(mut socket: WebSocket, session_id: String, state: ChatState) {
    info!(event_name = "ws.session_opened", session_id = session_id.as_str(), "socket opened");

    if send_frame(&mut socket, "assistant", &state.welcome_message).await.is_err() {
        return;
    }

    while let Some(inbound) = socket.recv().await {
        let message = match inbound {
            Ok(message) => message,
            Err(error) => {
                warn!(
                    event_name = "ws.receive_failed",
                    session_id = session_id.as_str(),
                    error = %error,
                    "socket receive failed"
                );
                break;
            }
        };

        match message {
            Message::Text(text) => {
                if send_frame(&mut socket, "status", "typing").await.is_err() {
                    break;
                }

                let reply = state.support.process_query(&session_id, text.as_str()).await;
                if send_frame(&mut socket, "assistant", &reply).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            other => {
                debug!(
                    event_name = "ws.frame_ignored",
                    session_id = session_id.as_str(),
                    frame = ?other,
                    "ignoring non-text frame"
                );
            }
        }
    }

    info!(event_name = "ws.session_closed", session_id = session_id.as_str(), "socket closed");
}

async fn send_frame(socket: &mut WebSocket, kind: &str, content: &str) -> Result<(), axum::Error> {
    let frame = serde_json::to_string(&WsFrame { kind, content })
        .unwrap_or_else(|_| String::from("{\"type\":\"error\",\"content\":\"serialization failed\"}"));
    socket.send(Message::Text(frame.into())).await
}
