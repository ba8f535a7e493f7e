//! Context assembly — gathers the facts for one turn.
//!
//! Runs on the authoritative thread because every world read does. The
//! result is an owned [`TurnContext`] that is handed to worker tasks.
//!
//! Sections:
//! 1. **Environment**: time of day, weather, biome and, for conversation
//!    turns, what is around the player
//! 2. **Player**: name, health, held item, position
//! 3. **NPC**: name, configured persona, position
//! 4. **Knowledge**: compiled server knowledge

use std::sync::Arc;

use archtalk_config::AppConfig;
use archtalk_core::context::{RequestContext, RequestKind, non_empty};
use archtalk_core::error::ContextError;
use archtalk_core::identity::{Location, NpcRef, PlayerId};
use archtalk_core::world::{EnvironmentSnapshot, NpcSnapshot, PlayerSnapshot, WorldView};

/// Everything a worker needs from the world for one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnContext {
    pub request: RequestContext,
    pub player_name: String,
    pub locale: Option<String>,
    pub npc_location: Option<Location>,
}

pub struct ContextAssembler {
    world: Arc<dyn WorldView>,
    config: Arc<AppConfig>,
    knowledge: String,
}

impl ContextAssembler {
    pub fn new(world: Arc<dyn WorldView>, config: Arc<AppConfig>) -> Self {
        let knowledge = config.knowledge_text();
        Self {
            world,
            config,
            knowledge,
        }
    }

    /// Gather the context for one turn. Must run on the authoritative thread.
    pub fn assemble(
        &self,
        player: PlayerId,
        npc: &NpcRef,
        kind: RequestKind,
    ) -> Result<TurnContext, ContextError> {
        let player_snapshot = self.world.player(player)?;
        let npc_snapshot = self.world.npc(npc)?;
        let environment = self.world.environment(player)?;

        let request = RequestContext {
            environment: non_empty(describe_environment(&environment, kind)),
            player: non_empty(describe_player(&player_snapshot)),
            npc: non_empty(self.describe_npc(&npc_snapshot)),
            knowledge: non_empty(self.knowledge.clone()),
        };

        Ok(TurnContext {
            request,
            player_name: player_snapshot.name,
            locale: player_snapshot.locale,
            npc_location: npc_snapshot.location,
        })
    }

    /// Where the NPC stands right now, if it is spawned.
    pub fn npc_location(&self, npc: &NpcRef) -> Option<Location> {
        self.world.npc(npc).ok().and_then(|snap| snap.location)
    }

    /// The NPC's configured prompt, or the default prompt.
    pub fn persona(&self, npc: &NpcRef) -> String {
        self.config
            .npc_prompt(&npc.name)
            .unwrap_or_else(|| self.config.default_prompt.clone())
    }

    /// System turn a new conversation starts with.
    pub fn system_prompt(&self, npc: &NpcRef) -> String {
        let mut going_on = self.persona(npc);
        if !self.knowledge.is_empty() {
            going_on.push(' ');
            going_on.push_str(&self.knowledge);
        }

        format!(
            "You are {name}, a resident of the vibrant world of Minecraft. \
You interact with players in a casual manner, making them feel part of an ongoing adventure. \
Engage them with stories, observations, and comments that reflect your unique personality and knowledge. \
Offer help or guidance only when they seek it, making your interactions feel natural and integral to their experience. \
You're not just an NPC, you're a living, breathing part of this world with your own thoughts and feelings. \
Here's whats going on: {going_on}",
            name = npc.name,
        )
    }

    /// Instruction sent for a greeting.
    pub fn greeting_prompt(&self, npc: &NpcRef, player_name: &str) -> String {
        format!(
            "{persona}\nA player known as {player_name} approaches you. \
Greet them naturally in-character, and by name. Keep it under {max} completion_tokens. \
Tell them to right click on you to continue this conversation.",
            persona = self.persona(npc),
            max = self.config.max_response_length,
        )
    }

    fn describe_npc(&self, snap: &NpcSnapshot) -> String {
        let mut out = snap.npc.name.clone();
        if let Some(location) = snap.location {
            out.push_str(&format!(" at {location}"));
        }
        out.push_str(". Persona: ");
        out.push_str(&self.persona(&snap.npc));
        out
    }
}

fn describe_player(snap: &PlayerSnapshot) -> String {
    let mut out = format!(
        "{}, health {:.0}/{:.0}",
        snap.name, snap.health, snap.max_health
    );
    if let Some(item) = &snap.held_item {
        out.push_str(&format!(", holding {item}"));
    }
    out.push_str(&format!(", in {} at {}", snap.world, snap.location));
    out
}

fn describe_environment(env: &EnvironmentSnapshot, kind: RequestKind) -> String {
    let mut out = format!(
        "{}, weather {}, biome {}",
        time_of_day(env.time_of_day),
        env.weather.as_str(),
        env.biome
    );
    if kind == RequestKind::Conversation {
        if !env.nearby_blocks.is_empty() {
            out.push_str(&format!(". Nearby blocks: {}", env.nearby_blocks.join(", ")));
        }
        if !env.nearby_entities.is_empty() {
            out.push_str(&format!(". Nearby: {}", env.nearby_entities.join(", ")));
        }
    }
    out
}

/// Name for a world time in ticks.
fn time_of_day(ticks: u64) -> &'static str {
    match ticks % 24_000 {
        0..12_000 => "daytime",
        12_000..13_800 => "dusk",
        13_800..22_200 => "night",
        _ => "dawn",
    }
}
