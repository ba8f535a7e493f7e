//! LLM backends for ArchTalk.
//!
//! Each mode pairs a pure `RequestBuilder` with a `Transport` from
//! `archtalk_core::provider`. The router selects the pair based on
//! configuration.

pub mod direct;
pub mod gateway;
pub mod router;

pub use direct::{DirectBuilder, DirectTransport};
pub use gateway::{GatewayBuilder, GatewayTransport};
pub use router::{Backend, build_from_config};

use archtalk_core::error::TransportError;
use std::time::Duration;

/// Shared HTTP client setup. The client timeout is the only bound on a
/// provider call.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, TransportError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| TransportError::Network(format!("failed to create HTTP client: {e}")))
}
