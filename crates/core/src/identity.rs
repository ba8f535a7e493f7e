//! Participant identities — who is talking to whom, and where.
//!
//! Everything here is a plain value. Locations in particular are `Copy`, so
//! an event or a snapshot that captures one can never observe a later move
//! of the entity it was read from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::ConversationId;

/// Unique identity of a connected player. Key for every per-player map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A reference to an NPC as the game engine knows it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NpcRef {
    /// Engine-assigned NPC id
    pub id: u32,

    /// Display name, also the key for per-NPC prompts
    pub name: String,
}

impl NpcRef {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl std::fmt::Display for NpcRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

/// A point in a named world.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The same point shifted upwards, e.g. to float an indicator over a head.
    pub fn above(self, dy: f64) -> Self {
        Self {
            y: self.y + dy,
            ..self
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.0}, {:.0}, {:.0}", self.x, self.y, self.z)
    }
}

/// The live association between a player and the NPC they are talking to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSession {
    pub id: ConversationId,
    pub player: PlayerId,
    pub npc: NpcRef,
    pub started_at: DateTime<Utc>,
}

impl ConversationSession {
    pub fn new(player: PlayerId, npc: NpcRef) -> Self {
        Self {
            id: ConversationId::new(),
            player,
            npc,
            started_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_is_copied_by_value() {
        let mut original = Location::new(10.0, 64.0, -3.0);
        let captured = original;
        original.y = 80.0;
        assert_eq!(captured.y, 64.0);
        assert_eq!(original.above(1.0).y, 81.0);
    }

    #[test]
    fn sessions_get_distinct_ids() {
        let player = PlayerId::new();
        let npc = NpcRef::new(7, "Blacksmith Tom");
        let a = ConversationSession::new(player, npc.clone());
        let b = ConversationSession::new(player, npc);
        assert_ne!(a.id, b.id);
        assert_eq!(a.player, b.player);
    }

    #[test]
    fn npc_display_includes_id() {
        assert_eq!(NpcRef::new(3, "Mira").to_string(), "Mira#3");
    }
}
