//! Direct mode: requests go straight to an OpenAI-compatible
//! `/v1/chat/completions` endpoint with a bearer credential.

use async_trait::async_trait;
use archtalk_core::error::TransportError;
use archtalk_core::message::Turn;
use archtalk_core::provider::{
    BuildInput, ChatPayload, DirectRequest, MALFORMED_REPLY, RequestBuilder, Transport,
    cap_system_text,
};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::http_client;

/// The completion endpoint used when none is configured.
pub const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

const GUIDELINES: &str = "Guidelines: Use the Knowledge section as the canonical source of server \
facts (rules, staff, FAQs, links). If the answer isn't in Knowledge, say you don't know. | ";

/// Builds chat-completion bodies.
#[derive(Debug, Clone)]
pub struct DirectBuilder {
    model: String,
    max_tokens: u32,
    instruction: String,
}

impl DirectBuilder {
    pub fn new(model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            max_tokens,
            instruction: String::new(),
        }
    }

    /// Instruction placed at the head of every system turn.
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    fn system_text(&self, input: &BuildInput<'_>) -> String {
        let mut text = String::new();
        if !self.instruction.trim().is_empty() {
            text.push_str("Instruction: ");
            text.push_str(&self.instruction);
            text.push_str(" | ");
        }
        text.push_str(GUIDELINES);
        for stored in input.history.iter().filter(|t| t.is_system()) {
            if !stored.content.trim().is_empty() {
                text.push_str(stored.content.trim());
                text.push_str(" | ");
            }
        }
        text.push_str(&input.context.linearize());
        cap_system_text(text)
    }
}

impl RequestBuilder for DirectBuilder {
    fn name(&self) -> &str {
        "direct"
    }

    /// `[system, ...stored user/assistant turns, user]`. The system turn is
    /// always rebuilt; stored system content is folded into it.
    fn build(&self, input: BuildInput<'_>) -> ChatPayload {
        let mut messages = Vec::with_capacity(input.history.len() + 2);
        messages.push(Turn::system(self.system_text(&input)));
        messages.extend(input.history.iter().filter(|t| !t.is_system()).cloned());
        messages.push(Turn::user(input.message));

        ChatPayload::Direct(DirectRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages,
        })
    }
}

/// Posts chat-completion bodies with `Authorization: Bearer <key>`.
pub struct DirectTransport {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl DirectTransport {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self, TransportError> {
        Ok(Self {
            endpoint: OPENAI_CHAT_URL.to_string(),
            api_key,
            client: http_client(timeout)?,
        })
    }

    /// Point at another OpenAI-compatible endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn credential(&self) -> Result<&str, TransportError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(TransportError::MissingCredential)
    }

    /// First choice's content, trimmed; [`MALFORMED_REPLY`] for any other shape.
    fn extract_reply(body: &str) -> String {
        match serde_json::from_str::<ApiResponse>(body) {
            Ok(resp) => match resp.choices.into_iter().next() {
                Some(choice) => choice.message.content.trim().to_string(),
                None => {
                    warn!("No choices in completion response");
                    MALFORMED_REPLY.to_string()
                }
            },
            Err(e) => {
                warn!(error = %e, "Failed to parse completion response");
                MALFORMED_REPLY.to_string()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    content: String,
}

#[async_trait]
impl Transport for DirectTransport {
    fn name(&self) -> &str {
        "direct"
    }

    async fn send(&self, payload: &ChatPayload) -> Result<String, TransportError> {
        let api_key = self.credential()?;

        debug!(endpoint = %self.endpoint, model = %payload.model(), "Sending completion request");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        if status != 200 {
            warn!(status, body = %body, "Provider returned error");
            return Err(TransportError::Upstream {
                status_code: status,
                body,
            });
        }

        Ok(Self::extract_reply(&body))
    }

    async fn health_check(&self) -> Result<bool, TransportError> {
        Ok(self.credential().is_ok())
    }
}
