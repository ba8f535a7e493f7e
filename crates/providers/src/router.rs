//! Backend selection: pairs a request builder with the matching transport
//! based on the configured mode.

use std::sync::Arc;

use archtalk_config::AppConfig;
use archtalk_core::error::TransportError;
use archtalk_core::provider::{RequestBuilder, Transport};

use crate::direct::{DirectBuilder, DirectTransport};
use crate::gateway::{GatewayBuilder, GatewayTransport};

/// A builder and the transport that understands its payloads.
#[derive(Clone)]
pub struct Backend {
    pub builder: Arc<dyn RequestBuilder>,
    pub transport: Arc<dyn Transport>,
}

impl Backend {
    pub fn new(builder: Arc<dyn RequestBuilder>, transport: Arc<dyn Transport>) -> Self {
        Self { builder, transport }
    }

    /// "gateway" or "direct".
    pub fn mode(&self) -> &str {
        self.builder.name()
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("builder", &self.builder.name())
            .field("transport", &self.transport.name())
            .finish()
    }
}

/// Build the backend selected by `use_mcp`.
///
/// Direct mode without a credential still builds: the transport reports
/// `MissingCredential` per turn so a misconfigured server keeps running.
pub fn build_from_config(config: &AppConfig) -> Result<Backend, TransportError> {
    let timeout = config.http_timeout();

    if config.use_mcp {
        let builder = GatewayBuilder::new(&config.mcp.provider, &config.mcp.model, config.mcp.max_tokens);
        let transport = GatewayTransport::new(&config.mcp.server_url, timeout)?;
        Ok(Backend::new(Arc::new(builder), Arc::new(transport)))
    } else {
        if !config.has_api_key() {
            tracing::warn!("Direct mode selected but no api_key is configured");
        }
        let builder = DirectBuilder::new(&config.chatgpt_engine, config.max_response_length)
            .with_instruction(&config.default_prompt);
        let transport = DirectTransport::new(config.api_key.clone(), timeout)?;
        Ok(Backend::new(Arc::new(builder), Arc::new(transport)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_mode_by_default() {
        let backend = build_from_config(&AppConfig::default()).unwrap();
        assert_eq!(backend.mode(), "gateway");
        assert_eq!(backend.transport.name(), "gateway");
    }

    #[test]
    fn direct_mode_when_gateway_disabled() {
        let config = AppConfig {
            use_mcp: false,
            api_key: Some("sk-test".into()),
            ..AppConfig::default()
        };
        let backend = build_from_config(&config).unwrap();
        assert_eq!(backend.mode(), "direct");
        assert!(format!("{backend:?}").contains("direct"));
    }

    #[tokio::test]
    async fn direct_mode_without_key_reports_unhealthy() {
        let config = AppConfig {
            use_mcp: false,
            ..AppConfig::default()
        };
        let backend = build_from_config(&config).unwrap();
        assert!(!backend.transport.health_check().await.unwrap());
    }
}
