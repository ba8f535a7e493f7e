//! In-memory archive — useful for testing and servers without persistence.

use async_trait::async_trait;
use archtalk_core::error::ArchiveError;
use archtalk_core::memory::{ArchivedLine, ConversationArchive, retention_cutoff};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Archived lines kept in a Vec.
pub struct InMemoryArchive {
    lines: Arc<RwLock<Vec<ArchivedLine>>>,
}

impl InMemoryArchive {
    pub fn new() -> Self {
        Self {
            lines: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Lines stored for one NPC, oldest first.
    pub async fn lines_for(&self, npc_name: &str) -> Vec<ArchivedLine> {
        self.lines
            .read()
            .await
            .iter()
            .filter(|l| l.npc_name == npc_name)
            .cloned()
            .collect()
    }
}

impl Default for InMemoryArchive {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationArchive for InMemoryArchive {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn save(&self, mut line: ArchivedLine) -> Result<String, ArchiveError> {
        if line.id.is_empty() {
            line.id = Uuid::new_v4().to_string();
        }
        let id = line.id.clone();
        self.lines.write().await.push(line);
        Ok(id)
    }

    async fn count(&self) -> Result<usize, ArchiveError> {
        Ok(self.lines.read().await.len())
    }

    async fn purge_older_than(&self, max_age: Duration) -> Result<usize, ArchiveError> {
        let cutoff = retention_cutoff(max_age);
        let mut lines = self.lines.write().await;
        let before = lines.len();
        lines.retain(|l| l.timestamp >= cutoff);
        Ok(before - lines.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archtalk_core::identity::PlayerId;
    use chrono::Utc;

    #[tokio::test]
    async fn save_assigns_id() {
        let archive = InMemoryArchive::new();
        let id = archive
            .save(ArchivedLine::npc_reply(PlayerId::new(), "Mira", "The mines lie east."))
            .await
            .unwrap();
        assert!(!id.is_empty());
        assert_eq!(archive.count().await.unwrap(), 1);
        assert_eq!(archive.lines_for("Mira").await[0].id, id);
        assert!(archive.lines_for("Tom").await.is_empty());
    }

    #[tokio::test]
    async fn purge_drops_only_old_lines() {
        let archive = InMemoryArchive::new();
        let mut old = ArchivedLine::npc_reply(PlayerId::new(), "Mira", "An old tale of the north.");
        old.timestamp = Utc::now() - chrono::Duration::hours(3);
        archive.save(old).await.unwrap();
        archive
            .save(ArchivedLine::npc_reply(PlayerId::new(), "Mira", "Fresh news from town."))
            .await
            .unwrap();

        let removed = archive.purge_older_than(Duration::from_secs(3600)).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(archive.count().await.unwrap(), 1);
    }
}
