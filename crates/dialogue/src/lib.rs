//! # ArchTalk Dialogue
//!
//! Conversation orchestration for AI NPCs: one state machine per player,
//! a single authoritative thread for world access and chat delivery, and
//! a worker pool for everything that waits on the network.
//!
//! ```text
//! chat event ──▶ ConversationOrchestrator ──▶ worker: ContextAssembler (main thread)
//!                                                    │
//!                                                    ▼
//!                              KeyedPermits ──▶ ChatPipeline ──▶ Transport
//!                                                    │
//!                                                    ▼
//!                              ConversationStore ◀── commit ──▶ deliver (main thread)
//! ```

pub mod assembler;
pub mod delivery;
pub mod orchestrator;
pub mod permits;
pub mod pipeline;
pub mod scheduler;
pub mod sessions;
pub mod timeout;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use assembler::{ContextAssembler, TurnContext};
pub use orchestrator::{ConversationOrchestrator, FALLBACK_REPLY, MessageOutcome, OrchestratorBuilder};
pub use permits::KeyedPermits;
pub use pipeline::{ChatPipeline, ConversationResult, GreetingResult};
pub use scheduler::MainThread;
pub use sessions::{CooldownTracker, SessionRegistry};
pub use timeout::TimeoutManager;
