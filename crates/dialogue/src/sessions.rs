//! Active-session markers and per-player chat cooldowns.

use std::time::Duration;

use archtalk_core::identity::{ConversationSession, NpcRef, PlayerId};
use archtalk_core::message::ConversationId;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;

/// Which NPC each player is talking to. One session per player; starting a
/// new one replaces the old.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<PlayerId, ConversationSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a session, returning the one it replaced.
    pub fn start(&self, session: ConversationSession) -> Option<ConversationSession> {
        self.sessions.insert(session.player, session)
    }

    pub fn get(&self, player: PlayerId) -> Option<ConversationSession> {
        self.sessions.get(&player).map(|s| s.clone())
    }

    pub fn npc(&self, player: PlayerId) -> Option<NpcRef> {
        self.sessions.get(&player).map(|s| s.npc.clone())
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        self.sessions.contains_key(&player)
    }

    /// Whether `session` is still the player's current conversation.
    pub fn is_active(&self, player: PlayerId, session: &ConversationId) -> bool {
        self.sessions
            .get(&player)
            .is_some_and(|s| s.id == *session)
    }

    /// Remove whatever session the player has.
    pub fn end(&self, player: PlayerId) -> Option<ConversationSession> {
        self.sessions.remove(&player).map(|(_, s)| s)
    }

    /// Remove the player's session only if it is `session`.
    pub fn end_if(&self, player: PlayerId, session: &ConversationId) -> Option<ConversationSession> {
        self.sessions
            .remove_if(&player, |_, s| s.id == *session)
            .map(|(_, s)| s)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Last accepted message per player. Entries never expire; they are only
/// compared against the interval.
pub struct CooldownTracker {
    last_accepted: DashMap<PlayerId, Instant>,
    interval: Duration,
}

impl CooldownTracker {
    pub fn new(interval: Duration) -> Self {
        Self {
            last_accepted: DashMap::new(),
            interval,
        }
    }

    /// Record a message if the player is outside the cooldown window.
    /// Returns `false` (and records nothing) while the window is open.
    pub fn try_accept(&self, player: PlayerId) -> bool {
        let now = Instant::now();
        match self.last_accepted.entry(player) {
            Entry::Occupied(mut last) => {
                if now.duration_since(*last.get()) < self.interval {
                    false
                } else {
                    last.insert(now);
                    true
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(now);
                true
            }
        }
    }

    /// Time left before the player may send again.
    pub fn remaining(&self, player: PlayerId) -> Option<Duration> {
        let last = *self.last_accepted.get(&player)?;
        self.interval
            .checked_sub(last.elapsed())
            .filter(|d| !d.is_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(player: PlayerId, npc: &str) -> ConversationSession {
        ConversationSession::new(player, NpcRef::new(7, npc))
    }

    #[test]
    fn start_replaces_previous_session() {
        let registry = SessionRegistry::new();
        let player = PlayerId::new();
        let first = session(player, "Mira");
        assert!(registry.start(first.clone()).is_none());

        let replaced = registry.start(session(player, "Blacksmith Tom")).unwrap();
        assert_eq!(replaced.id, first.id);
        assert_eq!(registry.npc(player).unwrap().name, "Blacksmith Tom");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn end_if_ignores_other_sessions() {
        let registry = SessionRegistry::new();
        let player = PlayerId::new();
        let current = session(player, "Mira");
        registry.start(current.clone());

        assert!(registry.end_if(player, &ConversationId::new()).is_none());
        assert!(registry.is_active(player, &current.id));
        assert!(registry.end_if(player, &current.id).is_some());
        assert!(registry.end(player).is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_blocks_within_interval() {
        let cooldowns = CooldownTracker::new(Duration::from_secs(3));
        let player = PlayerId::new();

        assert!(cooldowns.try_accept(player));
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!cooldowns.try_accept(player));
        assert!(cooldowns.remaining(player).is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cooldowns.try_accept(player));
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_message_does_not_extend_cooldown() {
        let cooldowns = CooldownTracker::new(Duration::from_secs(3));
        let player = PlayerId::new();

        assert!(cooldowns.try_accept(player));
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!cooldowns.try_accept(player));
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cooldowns.try_accept(player));
    }

    #[test]
    fn cooldowns_are_per_player() {
        let cooldowns = CooldownTracker::new(Duration::from_secs(60));
        assert!(cooldowns.try_accept(PlayerId::new()));
        assert!(cooldowns.try_accept(PlayerId::new()));
    }
}
