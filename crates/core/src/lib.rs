//! # ArchTalk Core
//!
//! Domain types, collaborator traits, and error definitions for AI-driven NPC
//! dialogue. This crate has **no framework dependencies**: it defines the
//! model that every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every collaborator the dialogue core talks to (the game world, the chat
//! sink, the presentation layer, archives, translators, LLM transports) is a
//! trait here. Implementations live elsewhere, which keeps the orchestrator
//! testable with scripted doubles.

pub mod channel;
pub mod context;
pub mod error;
pub mod event;
pub mod identity;
pub mod memory;
pub mod message;
pub mod provider;
pub mod translate;
pub mod world;

// Re-export key types at crate root for ergonomics
pub use channel::{MessageSink, Notice, Presentation};
pub use context::{RequestContext, RequestKind};
pub use error::{DialogueError, Error, Result, TransportError};
pub use event::{DialogueEvent, EndReason, EventBus};
pub use identity::{ConversationSession, Location, NpcRef, PlayerId};
pub use memory::{ArchivedLine, ConversationArchive};
pub use message::{ConversationId, Role, Turn};
pub use provider::{BuildInput, ChatPayload, RequestBuilder, Transport};
pub use translate::Translator;
pub use world::WorldView;
