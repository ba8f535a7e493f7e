//! Per-player inactivity timeouts.
//!
//! Each player is either unarmed or armed with one deadline. Arming or
//! resetting replaces the deadline; cancelling disarms. When a deadline
//! passes, the expiry hook runs exactly once for that arming. A fire that
//! races a cancel or a re-arm is dropped by the generation check.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use archtalk_core::identity::PlayerId;
use archtalk_core::message::ConversationId;
use dashmap::DashMap;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

/// Called when a conversation's deadline passes.
pub type ExpiryHook = Arc<dyn Fn(PlayerId, ConversationId) + Send + Sync>;

struct Armed {
    generation: u64,
    session: ConversationId,
    task: JoinHandle<()>,
}

pub struct TimeoutManager {
    duration: Duration,
    runtime: Handle,
    armed: Arc<DashMap<PlayerId, Armed>>,
    next_generation: AtomicU64,
    on_expire: ExpiryHook,
}

impl TimeoutManager {
    pub fn new(duration: Duration, runtime: Handle, on_expire: ExpiryHook) -> Self {
        Self {
            duration,
            runtime,
            armed: Arc::new(DashMap::new()),
            next_generation: AtomicU64::new(1),
            on_expire,
        }
    }

    fn spawn_deadline(&self, player: PlayerId, session: ConversationId, generation: u64) -> JoinHandle<()> {
        let armed = self.armed.clone();
        let on_expire = self.on_expire.clone();
        let duration = self.duration;
        self.runtime.spawn(async move {
            tokio::time::sleep(duration).await;
            let fired = armed
                .remove_if(&player, |_, a| a.generation == generation)
                .is_some();
            if fired {
                debug!(%player, "Conversation timed out");
                on_expire(player, session);
            }
        })
    }

    /// Arm (or re-arm) the deadline for `player`'s conversation `session`.
    pub fn start(&self, player: PlayerId, session: ConversationId) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let task = self.spawn_deadline(player, session.clone(), generation);
        let previous = self.armed.insert(
            player,
            Armed {
                generation,
                session,
                task,
            },
        );
        if let Some(previous) = previous {
            previous.task.abort();
        }
    }

    /// Push the deadline back by a full duration. No-op when unarmed.
    pub fn reset(&self, player: PlayerId) {
        let Some(mut slot) = self.armed.get_mut(&player) else {
            return;
        };
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let task = self.spawn_deadline(player, slot.session.clone(), generation);
        slot.generation = generation;
        let stale = std::mem::replace(&mut slot.task, task);
        stale.abort();
    }

    /// Disarm. Cancelling an unarmed player is a no-op.
    pub fn cancel(&self, player: PlayerId) -> bool {
        match self.armed.remove(&player) {
            Some((_, armed)) => {
                armed.task.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self, player: PlayerId) -> bool {
        self.armed.contains_key(&player)
    }
}

impl Drop for TimeoutManager {
    fn drop(&mut self) {
        for entry in self.armed.iter() {
            entry.task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn manager(duration: Duration) -> (TimeoutManager, mpsc::UnboundedReceiver<(PlayerId, ConversationId)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let hook: ExpiryHook = Arc::new(move |player, session| {
            let _ = tx.send((player, session));
        });
        (TimeoutManager::new(duration, Handle::current(), hook), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_duration() {
        let (timeouts, mut fired) = manager(Duration::from_secs(60));
        let player = PlayerId::new();
        let session = ConversationId::new();
        timeouts.start(player, session.clone());

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert!(fired.try_recv().is_err());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.recv().await.unwrap(), (player, session));
        assert!(!timeouts.is_armed(player));

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(fired.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_pushes_deadline_back() {
        let (timeouts, mut fired) = manager(Duration::from_secs(60));
        let player = PlayerId::new();
        timeouts.start(player, ConversationId::new());

        tokio::time::sleep(Duration::from_secs(45)).await;
        timeouts.reset(player);
        tokio::time::sleep(Duration::from_secs(45)).await;
        assert!(fired.try_recv().is_err());
        assert!(timeouts.is_armed(player));

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(fired.recv().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_fire() {
        let (timeouts, mut fired) = manager(Duration::from_secs(10));
        let player = PlayerId::new();
        timeouts.start(player, ConversationId::new());

        assert!(timeouts.cancel(player));
        assert!(!timeouts.cancel(player));
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(fired.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_when_unarmed_is_noop() {
        let (timeouts, mut fired) = manager(Duration::from_secs(10));
        let player = PlayerId::new();
        timeouts.reset(player);
        assert!(!timeouts.is_armed(player));
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(fired.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_reports_new_session() {
        let (timeouts, mut fired) = manager(Duration::from_secs(10));
        let player = PlayerId::new();
        timeouts.start(player, ConversationId::new());
        let second = ConversationId::new();
        timeouts.start(player, second.clone());

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(fired.recv().await.unwrap().1, second);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(fired.try_recv().is_err());
    }
}
