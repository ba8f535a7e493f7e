//! Archive trait — durable storage for finished NPC lines.
//!
//! The dialogue core only ever writes here. Nothing read from an archive is
//! fed back into a live conversation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ArchiveError;
use crate::identity::PlayerId;
use crate::message::Role;

/// A completed, filtered conversation line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedLine {
    /// Unique ID, assigned by the backend when empty
    #[serde(default)]
    pub id: String,

    pub player: PlayerId,
    pub npc_name: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,

    /// Whether the line was spoken by the NPC to the player
    pub from_npc: bool,
}

impl ArchivedLine {
    /// A line the NPC said to `player`, stamped now.
    pub fn npc_reply(player: PlayerId, npc_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            player,
            npc_name: npc_name.into(),
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            from_npc: true,
        }
    }
}

/// Implementations: in-memory (tests, ephemeral servers), JSONL file.
#[async_trait]
pub trait ConversationArchive: Send + Sync {
    /// The backend name (e.g., "in_memory", "jsonl").
    fn name(&self) -> &str;

    /// Store a line and return its ID.
    async fn save(&self, line: ArchivedLine) -> std::result::Result<String, ArchiveError>;

    /// Number of stored lines.
    async fn count(&self) -> std::result::Result<usize, ArchiveError>;

    /// Drop lines older than `max_age`; returns how many were removed.
    async fn purge_older_than(
        &self,
        max_age: std::time::Duration,
    ) -> std::result::Result<usize, ArchiveError>;
}

/// Cutoff timestamp for a retention window, saturating on overflow.
pub fn retention_cutoff(max_age: std::time::Duration) -> DateTime<Utc> {
    let age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
    Utc::now()
        .checked_sub_signed(age)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
