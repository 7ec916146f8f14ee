use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message exchanged within a session. Histories are append-only ordered
/// sequences of turns, owned exclusively by the session orchestrator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// The bounded suffix of a history used as model context: the last `window`
/// turns, or the whole history when it is shorter.
pub fn recent_window(turns: &[Turn], window: usize) -> &[Turn] {
    let start = turns.len().saturating_sub(window);
    &turns[start..]
}
