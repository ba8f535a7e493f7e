//! Turn and conversation identifier types.
//!
//! These are the value objects that flow through the whole system:
//! player chats → orchestrator accepts the turn → builder wraps it with
//! history → transport returns the NPC's reply.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one conversation session.
///
/// A fresh id is minted every time a player starts talking to an NPC, so a
/// reply that was in flight when the session ended can be told apart from a
/// reply that belongs to a newer session with the same player.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a turn in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions and world context for the model
    System,
    /// The player
    User,
    /// The NPC
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One role-tagged message unit. Serializes as `{"role": .., "content": ..}`,
/// which is exactly the shape both wire formats expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_serializes_to_wire_shape() {
        let json = serde_json::to_value(Turn::user("Hello there, stranger!")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"role": "user", "content": "Hello there, stranger!"})
        );
    }

    #[test]
    fn conversation_ids_are_unique() {
        assert_ne!(ConversationId::new(), ConversationId::new());
    }

    #[test]
    fn system_turn_is_detected() {
        assert!(Turn::system("rules").is_system());
        assert!(!Turn::assistant("hi").is_system());
        assert_eq!(Role::Assistant.as_str(), "assistant");
    }
}
