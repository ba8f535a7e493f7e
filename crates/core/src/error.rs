//! Error types for the ArchTalk domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; all of them are turn-scoped
//! and never tear down a conversation on their own.

use thiserror::Error;

/// The top-level error type for all ArchTalk operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Transport errors ---
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    // --- World / context errors ---
    #[error("Context error: {0}")]
    Context(#[from] ContextError),

    // --- Archive errors ---
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    // --- Translation errors ---
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures of the HTTP exchange with a gateway or completion API.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Missing API credential: set `api_key` or enable gateway mode")]
    MissingCredential,

    #[error("Upstream returned status {status_code}: {body}")]
    Upstream { status_code: u16, body: String },

    #[error("Malformed response envelope: {0}")]
    MalformedResponse(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to encode request: {0}")]
    Serialization(String),
}

/// Failures while reading game state for a request context.
#[derive(Debug, Clone, Error)]
pub enum ContextError {
    #[error("Player {0} is not online")]
    PlayerOffline(String),

    #[error("NPC '{0}' is not spawned")]
    NpcUnavailable(String),

    #[error("World read failed: {0}")]
    World(String),
}

#[derive(Debug, Clone, Error)]
pub enum TranslationError {
    #[error("Translation unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Turn-level failures surfaced by the dialogue pipeline.
#[derive(Debug, Clone, Error)]
pub enum DialogueError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("Operation interrupted: {0}")]
    Interrupted(String),

    #[error("Player is not in a conversation")]
    NotInConversation,
}

impl DialogueError {
    /// Whether this failure stems from missing or invalid configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::Transport(TransportError::MissingCredential)
        )
    }
}
