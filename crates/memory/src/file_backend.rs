//! File-based archive — JSON-lines storage of NPC lines.
//!
//! Storage location: `~/.archtalk/data/npc_lines.jsonl`. Each line is a
//! JSON-encoded `ArchivedLine`. Saves append; purges rewrite the file.

use async_trait::async_trait;
use archtalk_core::error::ArchiveError;
use archtalk_core::memory::{ArchivedLine, ConversationArchive, retention_cutoff};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

/// A JSONL-backed archive. Lines are loaded on creation and kept in memory.
pub struct FileArchive {
    path: PathBuf,
    lines: Arc<RwLock<Vec<ArchivedLine>>>,
}

impl FileArchive {
    /// Open the archive at `path`. A missing file starts empty and is
    /// created on first write.
    pub fn new(path: PathBuf) -> Self {
        let lines = Self::load_from_disk(&path);
        debug!(path = %path.display(), count = lines.len(), "NPC line archive loaded");
        Self {
            path,
            lines: Arc::new(RwLock::new(lines)),
        }
    }

    /// Default path: `~/.archtalk/data/npc_lines.jsonl`
    pub fn default_path() -> PathBuf {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home)
            .join(".archtalk")
            .join("data")
            .join("npc_lines.jsonl")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_disk(path: &Path) -> Vec<ArchivedLine> {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Vec::new();
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<ArchivedLine>(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted archive line");
                    None
                }
            })
            .collect()
    }

    fn ensure_parent(&self) -> Result<(), ArchiveError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ArchiveError::Storage(format!("Failed to create archive directory: {e}"))
            })?;
        }
        Ok(())
    }

    fn encode(line: &ArchivedLine) -> Result<String, ArchiveError> {
        serde_json::to_string(line)
            .map_err(|e| ArchiveError::Storage(format!("Failed to serialize archive line: {e}")))
    }

    fn append_to_disk(&self, line: &ArchivedLine) -> Result<(), ArchiveError> {
        self.ensure_parent()?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ArchiveError::Storage(format!("Failed to open archive file: {e}")))?;
        writeln!(file, "{}", Self::encode(line)?)
            .map_err(|e| ArchiveError::Storage(format!("Failed to write archive file: {e}")))
    }

    fn rewrite(&self, lines: &[ArchivedLine]) -> Result<(), ArchiveError> {
        self.ensure_parent()?;
        let mut content = String::new();
        for line in lines {
            content.push_str(&Self::encode(line)?);
            content.push('\n');
        }
        std::fs::write(&self.path, content)
            .map_err(|e| ArchiveError::Storage(format!("Failed to write archive file: {e}")))
    }
}

#[async_trait]
impl ConversationArchive for FileArchive {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn save(&self, mut line: ArchivedLine) -> Result<String, ArchiveError> {
        if line.id.is_empty() {
            line.id = Uuid::new_v4().to_string();
        }
        let id = line.id.clone();

        let mut lines = self.lines.write().await;
        self.append_to_disk(&line)?;
        lines.push(line);
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
        let removed = before - lines.len();
        if removed > 0 {
            self.rewrite(&lines)?;
            debug!(removed, "Purged expired archive lines");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archtalk_core::identity::PlayerId;
    use chrono::Utc;
    use tempfile::NamedTempFile;

    fn temp_path() -> PathBuf {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_path_buf();
        drop(tmp);
        path
    }

    fn line(content: &str) -> ArchivedLine {
        ArchivedLine::npc_reply(PlayerId::new(), "Blacksmith Tom", content)
    }

    #[tokio::test]
    async fn save_persists_across_reload() {
        let path = temp_path();

        let archive = FileArchive::new(path.clone());
        let id = archive.save(line("Iron is cheap this week.")).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Iron is cheap this week."));

        let reloaded = FileArchive::new(path);
        assert_eq!(reloaded.count().await.unwrap(), 1);
        assert_eq!(reloaded.lines.read().await[0].id, id);
    }

    #[tokio::test]
    async fn purge_rewrites_file() {
        let path = temp_path();
        let archive = FileArchive::new(path.clone());

        let mut old = line("Back in my day, swords were sharper.");
        old.timestamp = Utc::now() - chrono::Duration::days(2);
        archive.save(old).await.unwrap();
        archive.save(line("Come back tomorrow for the axe.")).await.unwrap();

        assert_eq!(archive.purge_older_than(Duration::from_secs(3600)).await.unwrap(), 1);

        let reloaded = FileArchive::new(path);
        assert_eq!(reloaded.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn handles_missing_file_gracefully() {
        let dir = tempfile::tempdir().unwrap();
        let archive = FileArchive::new(dir.path().join("nested").join("lines.jsonl"));
        assert_eq!(archive.count().await.unwrap(), 0);
        archive.save(line("First words spoken here.")).await.unwrap();
        assert!(archive.path().exists());
    }

    #[tokio::test]
    async fn skips_corrupted_lines() {
        let path = temp_path();
        let good = serde_json::to_string(&line("A valid archived line.")).unwrap();
        std::fs::write(&path, format!("{good}\nthis is not json\n{good}\n")).unwrap();

        let archive = FileArchive::new(path);
        assert_eq!(archive.count().await.unwrap(), 2);
    }
}
