//! WorldView trait — read access to authoritative game state.
//!
//! The game engine owns the world and only allows reads from its main
//! thread. Implementations of this trait are therefore synchronous and are
//! only ever called from the authoritative thread; every snapshot they return
//! is an owned copy that may travel to worker tasks afterwards.

use serde::{Deserialize, Serialize};

use crate::error::ContextError;
use crate::identity::{Location, NpcRef, PlayerId};

/// A copy of the facts about a player at the moment of the read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub name: String,

    /// Client locale such as `en_us` or `de_de`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,

    pub world: String,
    pub location: Location,
    pub health: f32,
    pub max_health: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub held_item: Option<String>,
}

/// A copy of the facts about an NPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcSnapshot {
    pub npc: NpcRef,

    /// `None` when the NPC is not spawned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl NpcSnapshot {
    pub fn is_spawned(&self) -> bool {
        self.location.is_some()
    }
}

/// Facts about the surroundings of a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    /// World time in ticks (0..24000)
    pub time_of_day: u64,
    pub weather: Weather,
    pub biome: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nearby_blocks: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nearby_entities: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weather {
    Clear,
    Rain,
    Thunder,
}

impl Weather {
    pub fn as_str(&self) -> &'static str {
        match self {
            Weather::Clear => "clear",
            Weather::Rain => "raining",
            Weather::Thunder => "thunderstorm",
        }
    }
}

/// Read-only view of game state, called on the authoritative thread only.
pub trait WorldView: Send + Sync {
    fn player(&self, player: PlayerId) -> Result<PlayerSnapshot, ContextError>;

    fn npc(&self, npc: &NpcRef) -> Result<NpcSnapshot, ContextError>;

    fn environment(&self, player: PlayerId) -> Result<EnvironmentSnapshot, ContextError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unspawned_npc_has_no_location() {
        let snap = NpcSnapshot {
            npc: NpcRef::new(1, "Mira"),
            location: None,
        };
        assert!(!snap.is_spawned());
    }

    #[test]
    fn weather_names() {
        assert_eq!(Weather::Thunder.as_str(), "thunderstorm");
    }
}
