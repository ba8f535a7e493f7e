//! Console stand-ins for the game server: a one-player world, a sink that
//! prints to stdout and a spinner-less thinking indicator.

use std::io::Write;
use std::sync::Mutex;

use archtalk_core::channel::{MessageSink, Notice, Presentation};
use archtalk_core::error::ContextError;
use archtalk_core::identity::{Location, NpcRef, PlayerId};
use archtalk_core::world::{EnvironmentSnapshot, NpcSnapshot, PlayerSnapshot, Weather, WorldView};

/// A world with one player standing next to one NPC.
pub struct ConsoleWorld {
    player: PlayerSnapshot,
    npc: NpcSnapshot,
    started: std::time::Instant,
}

impl ConsoleWorld {
    pub fn new(player_name: &str, npc_name: &str) -> Self {
        let locale = std::env::var("LANG")
            .ok()
            .and_then(|l| l.split('.').next().map(str::to_lowercase));
        Self {
            player: PlayerSnapshot {
                id: PlayerId::new(),
                name: player_name.into(),
                locale,
                world: "world".into(),
                location: Location::new(0.0, 64.0, 0.0),
                health: 20.0,
                max_health: 20.0,
                held_item: None,
            },
            npc: NpcSnapshot {
                npc: NpcRef::new(1, npc_name),
                location: Some(Location::new(2.0, 64.0, 1.0)),
            },
            started: std::time::Instant::now(),
        }
    }

    pub fn player_id(&self) -> PlayerId {
        self.player.id
    }

    pub fn npc_ref(&self) -> NpcRef {
        self.npc.npc.clone()
    }
}

impl WorldView for ConsoleWorld {
    fn player(&self, player: PlayerId) -> Result<PlayerSnapshot, ContextError> {
        if player == self.player.id {
            Ok(self.player.clone())
        } else {
            Err(ContextError::PlayerOffline(player.to_string()))
        }
    }

    fn npc(&self, npc: &NpcRef) -> Result<NpcSnapshot, ContextError> {
        if npc.id == self.npc.npc.id {
            Ok(self.npc.clone())
        } else {
            Err(ContextError::NpcUnavailable(npc.name.clone()))
        }
    }

    fn environment(&self, _player: PlayerId) -> Result<EnvironmentSnapshot, ContextError> {
        // 20 ticks per second, starting at morning
        let ticks = 1_000 + self.started.elapsed().as_secs() * 20;
        Ok(EnvironmentSnapshot {
            time_of_day: ticks % 24_000,
            weather: Weather::Clear,
            biome: "plains".into(),
            nearby_blocks: vec!["oak_log".into(), "crafting_table".into()],
            nearby_entities: vec!["sheep".into()],
        })
    }
}

/// Prints NPC lines and notices to stdout.
#[derive(Default)]
pub struct ConsoleSink {
    out: Mutex<()>,
}

impl ConsoleSink {
    fn print(&self, line: &str) {
        let _guard = self.out.lock().unwrap_or_else(|e| e.into_inner());
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "\r{line}");
        let _ = write!(stdout, "  You > ");
        let _ = stdout.flush();
    }
}

/// Player-facing wording for a notice.
pub fn notice_text(notice: &Notice) -> String {
    match notice {
        Notice::ConversationStarted { npc, cancel_phrase } => {
            format!("You are now talking to {npc}. Type '{cancel_phrase}' to end the conversation.")
        }
        Notice::ConversationEnded => "The conversation has ended.".into(),
        Notice::ConversationTimedOut => "The conversation timed out.".into(),
        Notice::MessageTooShort { min } => {
            format!("Your message is too short, it must be at least {min} characters.")
        }
        Notice::OnCooldown => "Slow down, you're talking too fast!".into(),
        Notice::NotInConversation => "You are not talking to anyone.".into(),
    }
}

impl MessageSink for ConsoleSink {
    fn send_npc_message(&self, _player: PlayerId, npc: &NpcRef, text: &str) {
        self.print(&format!("  {} > {text}", npc.name));
    }

    fn echo_player_message(&self, _player: PlayerId, npc: &NpcRef, text: &str) {
        self.print(&format!("  (to {}) {text}", npc.name));
    }

    fn notify(&self, _player: PlayerId, notice: Notice) {
        self.print(&format!("  * {}", notice_text(&notice)));
    }
}

/// Shows a one-line "thinking" marker.
pub struct ConsolePresentation;

impl Presentation for ConsolePresentation {
    fn start_thinking(&self, _player: PlayerId, npc: &NpcRef) {
        eprint!("\r  {} is thinking...", npc.name);
    }

    fn stop_thinking(&self, _player: PlayerId, _npc: &NpcRef) {
        eprint!("\r                                        \r");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_knows_only_its_player_and_npc() {
        let world = ConsoleWorld::new("Steve", "Mira");
        assert_eq!(world.player(world.player_id()).unwrap().name, "Steve");
        assert!(world.player(PlayerId::new()).is_err());
        assert!(world.npc(&world.npc_ref()).unwrap().is_spawned());
        assert!(world.npc(&NpcRef::new(9, "Ghost")).is_err());
    }

    #[test]
    fn notice_wording_mentions_details() {
        let started = notice_text(&Notice::ConversationStarted {
            npc: "Mira".into(),
            cancel_phrase: "cancel".into(),
        });
        assert!(started.contains("Mira") && started.contains("'cancel'"));
        assert!(notice_text(&Notice::MessageTooShort { min: 10 }).contains("10"));
    }
}
