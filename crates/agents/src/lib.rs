//! Agent runtime: the router + specialized-responder dispatch protocol.
//!
//! A turn flows through three layers, each of which only talks to the one
//! below it:
//!
//! 1. [`session::SupportSystem`] owns conversation histories, serializes
//!    concurrent turns on the same session, and converts every internal
//!    failure into a fixed apology reply.
//! 2. [`router::Router`] classifies the message into exactly one
//!    [`responder::ResponderKind`] with a forced tool call at low
//!    temperature.
//! 3. [`responder::Responder`] drives the tool-calling protocol for its
//!    specialty: one LLM call with the tool table, at most one tool
//!    execution, one follow-up call for the final text.
//!
//! The LLM never decides prices, sizes, or order validity. Those checks are
//! deterministic domain code behind the tool handlers.

pub mod catalog;
pub mod llm;
pub mod openai;
pub mod responder;
pub mod router;
pub mod session;
#[cfg(test)]
pub(crate) mod testing;
pub mod tools;

pub use llm::{AssistantReply, ChatClient, ChatMessage, ChatRequest, LlmError, ToolInvocation};
pub use responder::{Responder, ResponderKind};
pub use router::{Router, RouterDecision};
pub use session::SupportSystem;
