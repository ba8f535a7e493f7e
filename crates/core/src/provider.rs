//! Request builder and transport traits — the abstraction over LLM backends.
//!
//! A turn reaches the model in two steps: a pure [`RequestBuilder`] turns
//! (context, message, history, kind) into a wire payload, then a
//! [`Transport`] performs the HTTP exchange and hands back plain reply text.
//!
//! Implementations: local gateway ("MCP" mode) and direct chat completions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::{RequestContext, RequestKind};
use crate::error::TransportError;
use crate::message::Turn;

/// Upper bound on synthesized system text, in characters.
pub const MAX_SYSTEM_CHARS: usize = 6000;

/// Reply used when a 200 response does not have the expected envelope.
pub const MALFORMED_REPLY: &str = "I'm having trouble processing that right now.";

/// Everything a builder needs for one request.
#[derive(Debug, Clone, Copy)]
pub struct BuildInput<'a> {
    pub context: &'a RequestContext,
    pub message: &'a str,
    pub history: &'a [Turn],
    pub kind: RequestKind,
}

/// Gateway-mode request document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayRequest {
    pub context: RequestContext,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conversation_history: Vec<Turn>,
    pub request_type: RequestKind,
    pub provider: String,
    pub model: String,
    pub max_tokens: u32,
}

/// Direct chat-completion request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<Turn>,
}

/// A provider-specific payload, serialized as-is onto the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatPayload {
    Gateway(GatewayRequest),
    Direct(DirectRequest),
}

impl ChatPayload {
    /// The ordered turns the model will see.
    pub fn turns(&self) -> &[Turn] {
        match self {
            ChatPayload::Gateway(req) => &req.conversation_history,
            ChatPayload::Direct(req) => &req.messages,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            ChatPayload::Gateway(req) => &req.model,
            ChatPayload::Direct(req) => &req.model,
        }
    }
}

/// Builds a payload from one turn's inputs. Must be pure: the same input
/// always produces the same payload.
pub trait RequestBuilder: Send + Sync {
    /// A short name for logs ("gateway", "direct").
    fn name(&self) -> &str;

    fn build(&self, input: BuildInput<'_>) -> ChatPayload;
}

/// Performs the HTTP exchange for a payload.
///
/// A 200 response with an unexpected shape is not an error: implementations
/// log it and return [`MALFORMED_REPLY`] so the player still gets an answer.
#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &str;

    /// Send a payload and return the reply text.
    async fn send(&self, payload: &ChatPayload) -> std::result::Result<String, TransportError>;

    /// Can we reach the endpoint?
    async fn health_check(&self) -> std::result::Result<bool, TransportError> {
        Ok(true)
    }
}

/// Truncate synthesized system text to [`MAX_SYSTEM_CHARS`] characters.
pub fn cap_system_text(text: String) -> String {
    match text.char_indices().nth(MAX_SYSTEM_CHARS) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text,
    }
}
