//! Dialogue event system — lets other plugins observe conversations.
//!
//! Events are published when something interesting happens in a conversation.
//! Subscribers react without being wired into the orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::identity::{Location, PlayerId};

/// Why a conversation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Cancelled,
    TimedOut,
    Disconnected,
}

/// All dialogue events in the system.
///
/// NPC locations are copied into the event when it is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DialogueEvent {
    ConversationStarted {
        player: PlayerId,
        npc_name: String,
        timestamp: DateTime<Utc>,
    },

    /// A player said something to an NPC
    PlayerToNpcMessage {
        player: PlayerId,
        npc_name: String,
        message: String,
        npc_location: Option<Location>,
        timestamp: DateTime<Utc>,
    },

    /// An NPC said something to a player (greetings included)
    NpcToPlayerMessage {
        player: PlayerId,
        npc_name: String,
        message: String,
        npc_location: Option<Location>,
        timestamp: DateTime<Utc>,
    },

    ConversationEnded {
        player: PlayerId,
        reason: EndReason,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for dialogue events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DialogueEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DialogueEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DialogueEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let player = PlayerId::new();

        bus.publish(DialogueEvent::ConversationEnded {
            player,
            reason: EndReason::TimedOut,
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            DialogueEvent::ConversationEnded { player: p, reason, .. } => {
                assert_eq!(*p, player);
                assert_eq!(*reason, EndReason::TimedOut);
            }
            _ => panic!("Expected ConversationEnded event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(DialogueEvent::ConversationStarted {
            player: PlayerId::new(),
            npc_name: "Mira".into(),
            timestamp: Utc::now(),
        });
    }
}
