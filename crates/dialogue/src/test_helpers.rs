//! Shared test doubles for dialogue tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use archtalk_core::channel::{MessageSink, Notice, Presentation};
use archtalk_core::error::{ContextError, TransportError, TranslationError};
use archtalk_core::identity::{Location, NpcRef, PlayerId};
use archtalk_core::provider::{ChatPayload, Transport};
use archtalk_core::translate::Translator;
use archtalk_core::world::{EnvironmentSnapshot, NpcSnapshot, PlayerSnapshot, Weather, WorldView};

/// A world with a fixed environment and whatever players/NPCs were added.
#[derive(Clone, Default)]
pub struct StaticWorld {
    players: Arc<Mutex<HashMap<PlayerId, PlayerSnapshot>>>,
    npcs: Arc<Mutex<HashMap<u32, NpcSnapshot>>>,
}

impl StaticWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_player(&self, name: &str, locale: Option<&str>) -> PlayerId {
        let id = PlayerId::new();
        self.players.lock().unwrap().insert(
            id,
            PlayerSnapshot {
                id,
                name: name.into(),
                locale: locale.map(String::from),
                world: "world".into(),
                location: Location::new(0.0, 64.0, 0.0),
                health: 20.0,
                max_health: 20.0,
                held_item: Some("iron_sword".into()),
            },
        );
        id
    }

    pub fn add_npc(&self, id: u32, name: &str, location: Option<Location>) -> NpcRef {
        let npc = NpcRef::new(id, name);
        self.npcs.lock().unwrap().insert(
            id,
            NpcSnapshot {
                npc: npc.clone(),
                location,
            },
        );
        npc
    }

    pub fn remove_player(&self, player: PlayerId) {
        self.players.lock().unwrap().remove(&player);
    }
}

impl WorldView for StaticWorld {
    fn player(&self, player: PlayerId) -> Result<PlayerSnapshot, ContextError> {
        self.players
            .lock()
            .unwrap()
            .get(&player)
            .cloned()
            .ok_or_else(|| ContextError::PlayerOffline(player.to_string()))
    }

    fn npc(&self, npc: &NpcRef) -> Result<NpcSnapshot, ContextError> {
        self.npcs
            .lock()
            .unwrap()
            .get(&npc.id)
            .cloned()
            .ok_or_else(|| ContextError::NpcUnavailable(npc.name.clone()))
    }

    fn environment(&self, _player: PlayerId) -> Result<EnvironmentSnapshot, ContextError> {
        Ok(EnvironmentSnapshot {
            time_of_day: 6_000,
            weather: Weather::Clear,
            biome: "plains".into(),
            nearby_blocks: vec!["anvil".into(), "furnace".into()],
            nearby_entities: vec!["cow".into()],
        })
    }
}

/// A transport that replays scripted replies, optionally after a delay,
/// and records every payload it was given.
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<String, TransportError>>>,
    delay: Duration,
    payloads: Mutex<Vec<ChatPayload>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Result<String, TransportError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            delay: Duration::ZERO,
            payloads: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn replying(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.payloads.lock().unwrap().len()
    }

    pub fn payloads(&self) -> Vec<ChatPayload> {
        self.payloads.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn send(&self, payload: &ChatPayload) -> Result<String, TransportError> {
        self.payloads.lock().unwrap().push(payload.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("(no more scripted replies)".into()))
    }
}

/// Everything a sink was asked to show.
#[derive(Debug, Clone, PartialEq)]
pub enum Shown {
    Npc { npc: String, text: String },
    Echo { npc: String, text: String },
    Notice(Notice),
}

#[derive(Default)]
pub struct RecordingSink {
    shown: Mutex<Vec<(PlayerId, Shown)>>,
}

impl RecordingSink {
    pub fn shown_to(&self, player: PlayerId) -> Vec<Shown> {
        self.shown
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| *p == player)
            .map(|(_, s)| s.clone())
            .collect()
    }

    pub fn npc_lines(&self, player: PlayerId) -> Vec<String> {
        self.shown_to(player)
            .into_iter()
            .filter_map(|s| match s {
                Shown::Npc { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn notices(&self, player: PlayerId) -> Vec<Notice> {
        self.shown_to(player)
            .into_iter()
            .filter_map(|s| match s {
                Shown::Notice(n) => Some(n),
                _ => None,
            })
            .collect()
    }
}

impl MessageSink for RecordingSink {
    fn send_npc_message(&self, player: PlayerId, npc: &NpcRef, text: &str) {
        self.shown.lock().unwrap().push((
            player,
            Shown::Npc {
                npc: npc.name.clone(),
                text: text.into(),
            },
        ));
    }

    fn echo_player_message(&self, player: PlayerId, npc: &NpcRef, text: &str) {
        self.shown.lock().unwrap().push((
            player,
            Shown::Echo {
                npc: npc.name.clone(),
                text: text.into(),
            },
        ));
    }

    fn notify(&self, player: PlayerId, notice: Notice) {
        self.shown.lock().unwrap().push((player, Shown::Notice(notice)));
    }
}

/// Counts thinking indicators that are currently running.
#[derive(Default)]
pub struct CountingPresentation {
    running: Mutex<HashMap<PlayerId, bool>>,
    starts: AtomicUsize,
}

impl CountingPresentation {
    pub fn is_thinking(&self, player: PlayerId) -> bool {
        self.running.lock().unwrap().get(&player).copied().unwrap_or(false)
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }
}

impl Presentation for CountingPresentation {
    fn start_thinking(&self, player: PlayerId, _npc: &NpcRef) {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.running.lock().unwrap().insert(player, true);
    }

    fn stop_thinking(&self, player: PlayerId, _npc: &NpcRef) {
        self.running.lock().unwrap().insert(player, false);
    }
}

/// Prefixes text with the target language, or fails when told to.
pub struct TaggingTranslator {
    pub fail: bool,
}

#[async_trait]
impl Translator for TaggingTranslator {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, TranslationError> {
        if self.fail {
            Err(TranslationError::Unavailable("service down".into()))
        } else {
            Ok(format!("[{target_lang}] {text}"))
        }
    }
}
