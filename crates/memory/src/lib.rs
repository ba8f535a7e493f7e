//! Conversation memory for ArchTalk.
//!
//! [`ConversationStore`] holds live per-player turn history. The archive
//! backends receive finished NPC lines and are never read back into a live
//! conversation.

pub mod file_backend;
pub mod in_memory;
pub mod store;

pub use file_backend::FileArchive;
pub use in_memory::InMemoryArchive;
pub use store::ConversationStore;
