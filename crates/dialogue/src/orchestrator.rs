//! The conversation state machine.
//!
//! Per player: `IDLE --start--> ACTIVE`, `ACTIVE --message--> ACTIVE`,
//! `ACTIVE --cancel phrase | timeout | quit--> IDLE`.
//!
//! Entry points are called on the authoritative thread and never block it.
//! Accepted messages continue on the worker pool:
//!
//! 1. gather context on the authoritative thread (awaited hand-off)
//! 2. take the player's permit
//! 3. build and send the request, translate the reply
//! 4. commit the exchange and reset the timeout, unless the session ended
//! 5. deliver on the authoritative thread after the reply delay, again only
//!    if the session is still the same
//!
//! Failures are turn-scoped: the player sees a fallback line and history,
//! timeout and session are left as they were.

use std::sync::{Arc, Weak};

use archtalk_config::AppConfig;
use archtalk_core::channel::{MessageSink, NoopPresentation, Notice, Presentation};
use archtalk_core::context::RequestKind;
use archtalk_core::error::{ArchiveError, DialogueError};
use archtalk_core::event::{DialogueEvent, EndReason, EventBus};
use archtalk_core::identity::{ConversationSession, NpcRef, PlayerId};
use archtalk_core::memory::{ArchivedLine, ConversationArchive};
use archtalk_core::message::{ConversationId, Turn};
use archtalk_core::translate::{NoTranslation, Translator};
use archtalk_core::world::WorldView;
use archtalk_memory::ConversationStore;
use archtalk_providers::Backend;
use chrono::Utc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::assembler::{ContextAssembler, TurnContext};
use crate::delivery::{
    MAX_LINE_CHARS, MIN_ARCHIVED_SENTENCE_CHARS, filter_short_sentences, split_long_message,
};
use crate::permits::KeyedPermits;
use crate::pipeline::ChatPipeline;
use crate::scheduler::MainThread;
use crate::sessions::{CooldownTracker, SessionRegistry};
use crate::timeout::{ExpiryHook, TimeoutManager};

/// Line shown to the player when a turn fails.
pub const FALLBACK_REPLY: &str =
    "Sorry, I had a little hiccup understanding that. Could you say it again?";

/// What happened to an incoming chat line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Handed to the pipeline
    Accepted,
    /// Matched the cancel phrase; the conversation is over
    Ended,
    TooShort,
    OnCooldown,
    NotInConversation,
}

struct Inner {
    config: Arc<AppConfig>,
    assembler: Arc<ContextAssembler>,
    pipeline: ChatPipeline,
    store: ConversationStore,
    sessions: SessionRegistry,
    cooldowns: CooldownTracker,
    permits: KeyedPermits<PlayerId>,
    timeouts: TimeoutManager,
    sink: Arc<dyn MessageSink>,
    presentation: Arc<dyn Presentation>,
    archive: Option<Arc<dyn ConversationArchive>>,
    events: Arc<EventBus>,
    main: MainThread,
    runtime: Handle,
}

/// Coordinates sessions, history, timeouts and the pipeline for every
/// player. Cheap to clone.
#[derive(Clone)]
pub struct ConversationOrchestrator {
    inner: Arc<Inner>,
}

pub struct OrchestratorBuilder {
    config: AppConfig,
    world: Arc<dyn WorldView>,
    backend: Backend,
    sink: Arc<dyn MessageSink>,
    main: MainThread,
    presentation: Arc<dyn Presentation>,
    translator: Arc<dyn Translator>,
    archive: Option<Arc<dyn ConversationArchive>>,
    events: Arc<EventBus>,
    runtime: Option<Handle>,
}

impl OrchestratorBuilder {
    pub fn with_presentation(mut self, presentation: Arc<dyn Presentation>) -> Self {
        self.presentation = presentation;
        self
    }

    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    /// Archive delivered replies.
    pub fn with_archive(mut self, archive: Arc<dyn ConversationArchive>) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    /// Worker pool to run turns on. Defaults to the current runtime.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> Result<ConversationOrchestrator, DialogueError> {
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| DialogueError::Config {
                message: "no tokio runtime available for the worker pool".into(),
            })?,
        };

        let config = Arc::new(self.config);
        let assembler = Arc::new(ContextAssembler::new(self.world, config.clone()));
        let pipeline = ChatPipeline::new(self.backend, self.translator, &config.default_language);

        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| Inner {
            store: ConversationStore::new(config.max_conversation_pairs),
            sessions: SessionRegistry::new(),
            cooldowns: CooldownTracker::new(config.cooldown()),
            permits: KeyedPermits::new(),
            timeouts: TimeoutManager::new(
                config.conversation_timeout(),
                runtime.clone(),
                expiry_hook(weak.clone()),
            ),
            config,
            assembler,
            pipeline,
            sink: self.sink,
            presentation: self.presentation,
            archive: self.archive,
            events: self.events,
            main: self.main,
            runtime,
        });

        Ok(ConversationOrchestrator { inner })
    }
}

/// Timeouts fire on the worker pool; teardown is moved onto the
/// authoritative thread.
fn expiry_hook(inner: Weak<Inner>) -> ExpiryHook {
    Arc::new(move |player, session| {
        let Some(inner) = inner.upgrade() else {
            return;
        };
        let main = inner.main.clone();
        main.execute(move || inner.expire(player, &session));
    })
}

impl ConversationOrchestrator {
    pub fn builder(
        config: AppConfig,
        world: Arc<dyn WorldView>,
        backend: Backend,
        sink: Arc<dyn MessageSink>,
        main: MainThread,
    ) -> OrchestratorBuilder {
        OrchestratorBuilder {
            config,
            world,
            backend,
            sink,
            main,
            presentation: Arc::new(NoopPresentation),
            translator: Arc::new(NoTranslation),
            archive: None,
            events: Arc::new(EventBus::default()),
            runtime: None,
        }
    }

    /// Begin a conversation between `player` and `npc`, replacing any
    /// conversation the player already had.
    pub fn start_conversation(&self, player: PlayerId, npc: NpcRef) -> ConversationId {
        let inner = &self.inner;
        let session = ConversationSession::new(player, npc.clone());
        let id = session.id.clone();

        if let Some(previous) = inner.sessions.start(session) {
            inner.presentation.stop_thinking(player, &previous.npc);
            inner.events.publish(DialogueEvent::ConversationEnded {
                player,
                reason: EndReason::Cancelled,
                timestamp: Utc::now(),
            });
            info!(%player, npc = %previous.npc, "Conversation replaced");
        }
        inner
            .store
            .seed(player, id.clone(), inner.assembler.system_prompt(&npc));
        inner.timeouts.start(player, id.clone());

        inner.sink.notify(
            player,
            Notice::ConversationStarted {
                npc: npc.name.clone(),
                cancel_phrase: inner.config.conversation_end_phrase.clone(),
            },
        );
        inner.events.publish(DialogueEvent::ConversationStarted {
            player,
            npc_name: npc.name.clone(),
            timestamp: Utc::now(),
        });

        info!(%player, npc = %npc, "Conversation started");
        id
    }

    /// Handle a chat line from a player.
    pub fn receive_message(&self, player: PlayerId, message: &str) -> MessageOutcome {
        let inner = &self.inner;
        let Some(session) = inner.sessions.get(player) else {
            inner.sink.notify(player, Notice::NotInConversation);
            return MessageOutcome::NotInConversation;
        };

        let text = message.trim();
        if text.to_lowercase() == inner.config.conversation_end_phrase.trim().to_lowercase() {
            inner.sink.notify(player, Notice::ConversationEnded);
            inner.end(player, None, EndReason::Cancelled);
            return MessageOutcome::Ended;
        }

        let min = inner.config.min_char_length;
        if message.chars().count() < min {
            inner.sink.notify(player, Notice::MessageTooShort { min });
            return MessageOutcome::TooShort;
        }

        if !inner.cooldowns.try_accept(player) {
            debug!(%player, "Message rejected by cooldown");
            inner.sink.notify(player, Notice::OnCooldown);
            return MessageOutcome::OnCooldown;
        }

        inner.sink.echo_player_message(player, &session.npc, text);
        inner.events.publish(DialogueEvent::PlayerToNpcMessage {
            player,
            npc_name: session.npc.name.clone(),
            message: text.to_string(),
            npc_location: inner.assembler.npc_location(&session.npc),
            timestamp: Utc::now(),
        });
        inner.presentation.start_thinking(player, &session.npc);

        let worker = inner.clone();
        let text = text.to_string();
        inner.runtime.spawn(async move { worker.run_turn(session, text).await });

        MessageOutcome::Accepted
    }

    /// Greet a player on behalf of an NPC. Not tied to a conversation and
    /// never stored in history. The greeting is delivered through the sink.
    pub fn greet(&self, player: PlayerId, npc: NpcRef) -> JoinHandle<()> {
        let inner = self.inner.clone();
        self.inner.runtime.spawn(async move {
            let text = match inner.greeting(player, &npc).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(%player, npc = %npc, error = %e, "Greeting failed");
                    FALLBACK_REPLY.to_string()
                }
            };
            let target = inner.clone();
            inner.main.execute(move || target.deliver_greeting(player, &npc, &text));
        })
    }

    /// Generate a greeting without delivering it.
    pub async fn greeting(&self, player: PlayerId, npc: &NpcRef) -> Result<String, DialogueError> {
        self.inner.greeting(player, npc).await
    }

    /// End a player's conversation as if they typed the cancel phrase.
    pub fn end_conversation(&self, player: PlayerId) -> bool {
        let ended = self.inner.end(player, None, EndReason::Cancelled);
        if ended {
            self.inner.sink.notify(player, Notice::ConversationEnded);
        }
        ended
    }

    /// The player left the server.
    pub fn player_quit(&self, player: PlayerId) {
        self.inner.end(player, None, EndReason::Disconnected);
    }

    pub fn in_conversation(&self, player: PlayerId) -> bool {
        self.inner.sessions.contains(player)
    }

    pub fn active_npc(&self, player: PlayerId) -> Option<NpcRef> {
        self.inner.sessions.npc(player)
    }

    /// Stored turns for a player's conversation, system turn first.
    pub fn history(&self, player: PlayerId) -> Option<Vec<Turn>> {
        self.inner.store.history(player)
    }

    pub fn events(&self) -> Arc<EventBus> {
        self.inner.events.clone()
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn main_thread(&self) -> &MainThread {
        &self.inner.main
    }

    /// Drop archived lines older than `npc_memory_duration`.
    pub async fn purge_archive(&self) -> Result<usize, ArchiveError> {
        let Some(archive) = &self.inner.archive else {
            return Ok(0);
        };
        let retention = self
            .inner
            .config
            .memory_retention()
            .map_err(|e| ArchiveError::Storage(e.to_string()))?;
        archive.purge_older_than(retention).await
    }
}

impl Inner {
    async fn gather_context(
        &self,
        player: PlayerId,
        npc: &NpcRef,
        kind: RequestKind,
    ) -> Result<TurnContext, DialogueError> {
        let assembler = self.assembler.clone();
        let npc = npc.clone();
        let turn = self
            .main
            .call(move || assembler.assemble(player, &npc, kind))
            .await??;
        Ok(turn)
    }

    async fn greeting(&self, player: PlayerId, npc: &NpcRef) -> Result<String, DialogueError> {
        let turn = self.gather_context(player, npc, RequestKind::Greeting).await?;
        let prompt = self.assembler.greeting_prompt(npc, &turn.player_name);
        let result = self
            .permits
            .with_permit(player, self.pipeline.greet(&turn, &prompt))
            .await??;
        Ok(result.text)
    }

    async fn run_turn(self: Arc<Self>, session: ConversationSession, message: String) {
        let player = session.player;
        match self.converse(&session, &message).await {
            Ok(Some(reply)) => self.schedule_delivery(session, reply, true),
            Ok(None) => debug!(%player, "Conversation ended before the reply arrived, discarding it"),
            Err(e) if e.is_configuration() => {
                warn!(%player, npc = %session.npc, error = %e, "Backend is not configured");
                self.schedule_delivery(session, FALLBACK_REPLY.to_string(), false);
            }
            Err(e) => {
                error!(%player, npc = %session.npc, error = %e, "Conversation turn failed");
                self.schedule_delivery(session, FALLBACK_REPLY.to_string(), false);
            }
        }
    }

    /// Steps 1 to 4. `Ok(None)` when the session ended on the way.
    async fn converse(
        &self,
        session: &ConversationSession,
        message: &str,
    ) -> Result<Option<String>, DialogueError> {
        let player = session.player;
        let turn = self
            .gather_context(player, &session.npc, RequestKind::Conversation)
            .await?;

        self.permits
            .with_permit(player, async {
                if !self.sessions.is_active(player, &session.id) {
                    return Ok::<_, DialogueError>(None);
                }
                let Some(history) = self.store.history(player) else {
                    return Ok(None);
                };

                let result = self.pipeline.converse(&turn, history, message).await?;

                if !self.store.commit(player, &session.id, result.updated_history) {
                    return Ok(None);
                }
                self.timeouts.reset(player);
                Ok(Some(result.text))
            })
            .await?
    }

    fn schedule_delivery(self: Arc<Self>, session: ConversationSession, text: String, archive: bool) {
        let delay = self.config.reply_delay();
        let runtime = self.runtime.clone();
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let main = self.main.clone();
            main.execute(move || self.deliver(&session, &text, archive));
        });
    }

    /// Step 5, on the authoritative thread.
    fn deliver(&self, session: &ConversationSession, text: &str, archive: bool) {
        let player = session.player;
        if !self.sessions.is_active(player, &session.id) {
            debug!(%player, "Session changed before delivery, dropping reply");
            return;
        }

        let lines = if self.config.split_long_messages {
            split_long_message(text, MAX_LINE_CHARS)
        } else {
            vec![text.to_string()]
        };
        for line in &lines {
            self.sink.send_npc_message(player, &session.npc, line);
        }
        self.presentation.stop_thinking(player, &session.npc);

        self.events.publish(DialogueEvent::NpcToPlayerMessage {
            player,
            npc_name: session.npc.name.clone(),
            message: text.to_string(),
            npc_location: self.assembler.npc_location(&session.npc),
            timestamp: Utc::now(),
        });

        if archive {
            self.archive_reply(player, &session.npc, text);
        }
    }

    fn deliver_greeting(&self, player: PlayerId, npc: &NpcRef, text: &str) {
        self.sink.send_npc_message(player, npc, text);
        self.events.publish(DialogueEvent::NpcToPlayerMessage {
            player,
            npc_name: npc.name.clone(),
            message: text.to_string(),
            npc_location: self.assembler.npc_location(npc),
            timestamp: Utc::now(),
        });
    }

    fn archive_reply(&self, player: PlayerId, npc: &NpcRef, text: &str) {
        let Some(archive) = self.archive.clone() else {
            return;
        };
        let sentences = filter_short_sentences(text, MIN_ARCHIVED_SENTENCE_CHARS);
        if sentences.is_empty() {
            return;
        }

        let line = ArchivedLine::npc_reply(player, npc.name.clone(), sentences.join(" "));
        self.runtime.spawn(async move {
            if let Err(e) = archive.save(line).await {
                warn!(%player, error = %e, "Failed to archive NPC reply");
            }
        });
    }

    /// A deadline passed. Only ends the conversation it was armed for.
    fn expire(&self, player: PlayerId, session: &ConversationId) {
        if self.end(player, Some(session), EndReason::TimedOut) {
            self.sink.notify(player, Notice::ConversationTimedOut);
        }
    }

    /// Shared teardown. Returns `false` when there was nothing to end.
    fn end(&self, player: PlayerId, only: Option<&ConversationId>, reason: EndReason) -> bool {
        let removed = match only {
            Some(id) => self.sessions.end_if(player, id),
            None => self.sessions.end(player),
        };
        let Some(session) = removed else {
            return false;
        };

        self.store.remove(player);
        self.timeouts.cancel(player);
        self.presentation.stop_thinking(player, &session.npc);

        self.events.publish(DialogueEvent::ConversationEnded {
            player,
            reason,
            timestamp: Utc::now(),
        });
        info!(%player, npc = %session.npc, ?reason, "Conversation ended");
        true
    }
}
