//! Gateway ("MCP") mode: requests go to a local inference gateway that
//! receives the structured context alongside the conversation.
//!
//! Wire contract:
//! - request: `{context, message, conversation_history, request_type, provider, model, max_tokens}`
//! - response: `{"output": "..."}`

use async_trait::async_trait;
use archtalk_core::error::TransportError;
use archtalk_core::message::Turn;
use archtalk_core::provider::{
    BuildInput, ChatPayload, GatewayRequest, MALFORMED_REPLY, RequestBuilder, Transport,
    cap_system_text,
};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::http_client;

/// Builds gateway request documents.
#[derive(Debug, Clone)]
pub struct GatewayBuilder {
    provider: String,
    model: String,
    max_tokens: u32,
}

impl GatewayBuilder {
    pub fn new(provider: impl Into<String>, model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            max_tokens,
        }
    }

    /// History with exactly one system turn at position 0. A stored system
    /// turn is reused as-is; otherwise one is synthesized from the context.
    fn history_with_system(input: &BuildInput<'_>) -> Vec<Turn> {
        let mut history = Vec::with_capacity(input.history.len() + 1);
        if !input.history.first().is_some_and(Turn::is_system) {
            history.push(Turn::system(cap_system_text(input.context.linearize())));
        }
        history.extend(input.history.iter().cloned());
        history
    }
}

impl RequestBuilder for GatewayBuilder {
    fn name(&self) -> &str {
        "gateway"
    }

    fn build(&self, input: BuildInput<'_>) -> ChatPayload {
        ChatPayload::Gateway(GatewayRequest {
            context: input.context.clone(),
            message: input.message.to_string(),
            conversation_history: Self::history_with_system(&input),
            request_type: input.kind,
            provider: self.provider.clone(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
        })
    }
}

/// Posts payloads to the gateway URL. No credential is sent.
pub struct GatewayTransport {
    server_url: String,
    client: reqwest::Client,
}

impl GatewayTransport {
    pub fn new(server_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        Ok(Self {
            server_url: server_url.into(),
            client: http_client(timeout)?,
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }
}

#[derive(Debug, Deserialize)]
struct GatewayResponse {
    output: String,
}

#[async_trait]
impl Transport for GatewayTransport {
    fn name(&self) -> &str {
        "gateway"
    }

    async fn send(&self, payload: &ChatPayload) -> Result<String, TransportError> {
        debug!(url = %self.server_url, model = %payload.model(), "Sending gateway request");

        let response = self
            .client
            .post(&self.server_url)
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
            warn!(status, body = %body, "Gateway returned error");
            return Err(TransportError::Upstream {
                status_code: status,
                body,
            });
        }

        match serde_json::from_str::<GatewayResponse>(&body) {
            Ok(parsed) => Ok(parsed.output.trim().to_string()),
            Err(e) => {
                warn!(error = %e, "Invalid response structure from gateway");
                debug!(body = %body, "Gateway response body");
                Ok(MALFORMED_REPLY.to_string())
            }
        }
    }

    async fn health_check(&self) -> Result<bool, TransportError> {
        // Any HTTP answer means the gateway is listening
        match self.client.get(&self.server_url).send().await {
            Ok(_) => Ok(true),
            Err(e) if e.is_connect() || e.is_timeout() => Ok(false),
            Err(e) => Err(TransportError::Network(e.to_string())),
        }
    }
}
