//! The request/response pipeline for one turn: build the payload, send it,
//! and localize the reply.
//!
//! Greeting and conversation turns resolve to different result types, so a
//! greeting can never be committed to history by mistake.

use std::sync::Arc;

use archtalk_core::context::RequestKind;
use archtalk_core::error::DialogueError;
use archtalk_core::message::Turn;
use archtalk_core::provider::BuildInput;
use archtalk_core::translate::{Translator, language_code};
use archtalk_providers::Backend;
use tracing::{debug, warn};

use crate::assembler::TurnContext;

/// Reply shown for a successful but blank completion.
pub const EMPTY_REPLY: &str = "...";

/// A one-shot greeting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GreetingResult {
    pub text: String,
}

/// A conversation reply and the history it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationResult {
    pub text: String,
    /// Prior history followed by the new user and assistant turns
    pub updated_history: Vec<Turn>,
}

pub struct ChatPipeline {
    backend: Backend,
    translator: Arc<dyn Translator>,
    default_language: String,
}

impl ChatPipeline {
    pub fn new(backend: Backend, translator: Arc<dyn Translator>, default_language: impl Into<String>) -> Self {
        Self {
            backend,
            translator,
            default_language: default_language.into(),
        }
    }

    pub async fn greet(&self, turn: &TurnContext, prompt: &str) -> Result<GreetingResult, DialogueError> {
        let text = self.generate(turn, prompt, &[], RequestKind::Greeting).await?;
        Ok(GreetingResult { text })
    }

    pub async fn converse(
        &self,
        turn: &TurnContext,
        history: Vec<Turn>,
        message: &str,
    ) -> Result<ConversationResult, DialogueError> {
        let text = self
            .generate(turn, message, &history, RequestKind::Conversation)
            .await?;

        let mut updated_history = history;
        updated_history.push(Turn::user(message));
        updated_history.push(Turn::assistant(text.clone()));

        Ok(ConversationResult {
            text,
            updated_history,
        })
    }

    async fn generate(
        &self,
        turn: &TurnContext,
        message: &str,
        history: &[Turn],
        kind: RequestKind,
    ) -> Result<String, DialogueError> {
        let payload = self.backend.builder.build(BuildInput {
            context: &turn.request,
            message,
            history,
            kind,
        });

        if let Ok(json) = serde_json::to_string(&payload) {
            debug!(mode = self.backend.mode(), kind = kind.as_str(), payload = %json, "Outbound request");
        }

        let reply = self.backend.transport.send(&payload).await?;
        let reply = self.localize(reply, turn.locale.as_deref()).await;

        let reply = reply.trim();
        Ok(if reply.is_empty() {
            EMPTY_REPLY.to_string()
        } else {
            reply.to_string()
        })
    }

    /// Translate into the player's language when it differs from the
    /// default. Translation failures keep the original text.
    async fn localize(&self, text: String, locale: Option<&str>) -> String {
        let target = language_code(locale, &self.default_language);
        if target.eq_ignore_ascii_case(&self.default_language) {
            return text;
        }

        match self.translator.translate(&text, &target).await {
            Ok(translated) => translated,
            Err(e) => {
                warn!(lang = %target, error = %e, "Translation failed, delivering original reply");
                text
            }
        }
    }
}
