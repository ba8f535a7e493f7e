//! Live conversation state, keyed by player.
//!
//! Each entry holds the session it belongs to, the leading system turn and
//! the user/assistant exchanges after it. The system turn is stored apart
//! from the exchanges, so it is first in every snapshot no matter how many
//! pairs are appended or evicted.

use std::collections::VecDeque;

use archtalk_core::identity::PlayerId;
use archtalk_core::message::{ConversationId, Turn};
use dashmap::DashMap;
use tracing::debug;

#[derive(Debug, Clone)]
struct ConversationState {
    session: ConversationId,
    system: Turn,
    exchanges: VecDeque<Turn>,
}

impl ConversationState {
    fn turns(&self) -> Vec<Turn> {
        let mut turns = Vec::with_capacity(self.exchanges.len() + 1);
        turns.push(self.system.clone());
        turns.extend(self.exchanges.iter().cloned());
        turns
    }
}

/// Per-player turn history with FIFO eviction of whole pairs.
pub struct ConversationStore {
    entries: DashMap<PlayerId, ConversationState>,
    max_pairs: usize,
}

impl ConversationStore {
    /// `max_pairs` is the number of user/assistant pairs kept after the
    /// system turn.
    pub fn new(max_pairs: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_pairs: max_pairs.max(1),
        }
    }

    pub fn max_pairs(&self) -> usize {
        self.max_pairs
    }

    /// Start a fresh history holding only `system_prompt`. Replaces whatever
    /// the player had before.
    pub fn seed(&self, player: PlayerId, session: ConversationId, system_prompt: impl Into<String>) {
        self.entries.insert(
            player,
            ConversationState {
                session,
                system: Turn::system(system_prompt),
                exchanges: VecDeque::new(),
            },
        );
    }

    /// Ordered turns for `player`, system turn first.
    pub fn history(&self, player: PlayerId) -> Option<Vec<Turn>> {
        self.entries.get(&player).map(|state| state.turns())
    }

    /// Replace the exchanges for `player` with the non-system turns of
    /// `updated`, evicting the oldest pairs beyond the cap.
    ///
    /// Nothing is written unless the stored entry still belongs to `session`.
    /// Returns whether the commit happened.
    pub fn commit(&self, player: PlayerId, session: &ConversationId, updated: Vec<Turn>) -> bool {
        let Some(mut state) = self.entries.get_mut(&player) else {
            debug!(%player, "Dropping commit for ended conversation");
            return false;
        };
        if state.session != *session {
            debug!(%player, "Dropping commit for a replaced conversation");
            return false;
        }

        state.exchanges = updated.into_iter().filter(|t| !t.is_system()).collect();
        let cap = self.max_pairs * 2;
        while state.exchanges.len() > cap {
            state.exchanges.pop_front();
            state.exchanges.pop_front();
        }
        true
    }

    /// Drop the player's history. Removing an absent entry is a no-op.
    pub fn remove(&self, player: PlayerId) -> bool {
        self.entries.remove(&player).is_some()
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        self.entries.contains_key(&player)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(10)
    }
}
