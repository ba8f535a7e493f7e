//! Outbound channels — how the dialogue core talks back to the game.
//!
//! The presentation layer owns wording, colours and animation frames; the
//! core only says *what* happened. All methods are called on the
//! authoritative thread.

use serde::{Deserialize, Serialize};

use crate::identity::{NpcRef, PlayerId};

/// A user-visible status notice. The sink decides how to phrase it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    ConversationStarted { npc: String, cancel_phrase: String },
    ConversationEnded,
    ConversationTimedOut,
    MessageTooShort { min: usize },
    OnCooldown,
    NotInConversation,
}

/// Delivers chat lines and notices to a player.
pub trait MessageSink: Send + Sync {
    /// A line spoken by an NPC.
    fn send_npc_message(&self, player: PlayerId, npc: &NpcRef, text: &str);

    /// Echo of the player's own line, formatted as speech towards the NPC.
    fn echo_player_message(&self, player: PlayerId, npc: &NpcRef, text: &str);

    fn notify(&self, player: PlayerId, notice: Notice);
}

/// "Thinking" indicators over an NPC (hologram, sneak/swing animation).
pub trait Presentation: Send + Sync {
    fn start_thinking(&self, player: PlayerId, npc: &NpcRef);

    /// Must be safe to call when nothing is running.
    fn stop_thinking(&self, player: PlayerId, npc: &NpcRef);
}

/// A presentation layer that shows nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPresentation;

impl Presentation for NoopPresentation {
    fn start_thinking(&self, _player: PlayerId, _npc: &NpcRef) {}

    fn stop_thinking(&self, _player: PlayerId, _npc: &NpcRef) {}
}
