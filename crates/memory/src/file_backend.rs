//! File-based memory backend: persistent JSON-lines vector store.
//!
//! Each line is a JSON-encoded `MemoryEntry` including its embedding.
//! Records are append-only, so a store is a single line appended to the file.
//!
//! Storage location: `<persist_directory>/memories.jsonl`
//! (default `~/.uhpm/vectorstore/memories.jsonl`).

use crate::embedder::Embedder;
use crate::vector;
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uhpm_core::error::MemoryError;
use uhpm_core::memory::{MemoryBackend, MemoryEntry, MemoryHit, Tags};
use uuid::Uuid;

/// File name inside the persist directory.
pub const STORE_FILE: &str = "memories.jsonl";

/// A file-backed memory store using JSONL (one JSON object per line).
///
/// Entries are loaded into memory on creation and appended to disk on every
/// store. This gives fast reads with durable writes.
pub struct FileBackend {
    path: PathBuf,
    entries: Arc<RwLock<Vec<MemoryEntry>>>,
    embedder: Arc<dyn Embedder>,
}

impl FileBackend {
    /// Create a new file-based backend at the given path.
    ///
    /// If the file exists, entries are loaded from it.
    /// If the file does not exist, starts empty (file created on first write).
    pub fn new(path: PathBuf, embedder: Arc<dyn Embedder>) -> Self {
        let entries = Self::load_from_disk(&path);
        debug!(path = %path.display(), count = entries.len(), "File memory backend loaded");
        Self {
            path,
            entries: Arc::new(RwLock::new(entries)),
            embedder,
        }
    }

    /// Open the store inside a persist directory, creating the directory.
    pub fn open(persist_directory: &Path, embedder: Arc<dyn Embedder>) -> Result<Self, MemoryError> {
        std::fs::create_dir_all(persist_directory).map_err(|e| {
            MemoryError::Storage(format!(
                "Failed to create persist directory {}: {e}",
                persist_directory.display()
            ))
        })?;
        Ok(Self::new(persist_directory.join(STORE_FILE), embedder))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load entries from a JSONL file.
    fn load_from_disk(path: &Path) -> Vec<MemoryEntry> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Vec::new(), // File doesn't exist yet, start empty
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<MemoryEntry>(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted memory entry");
                    None
                }
            })
            .collect()
    }

    async fn append(&self, entry: &MemoryEntry) -> Result<(), MemoryError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                MemoryError::Storage(format!("Failed to create memory directory: {e}"))
            })?;
        }

        let mut line = serde_json::to_string(entry).map_err(|e| {
            MemoryError::Storage(format!("Failed to serialize memory entry: {e}"))
        })?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to open memory file: {e}")))?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to write memory file: {e}")))?;
        file.flush()
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to flush memory file: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl MemoryBackend for FileBackend {
    fn name(&self) -> &str {
        "file"
    }

    async fn store(&self, text: &str, tags: Tags) -> Result<String, MemoryError> {
        let embedding = self.embedder.embed(text).await?;
        let entry = MemoryEntry {
            id: Uuid::new_v4().to_string(),
            content: text.to_string(),
            tags,
            created_at: Utc::now(),
            embedding: Some(embedding),
        };
        let id = entry.id.clone();

        // Hold the write lock across the append so lines never interleave.
        let mut entries = self.entries.write().await;
        self.append(&entry).await?;
        entries.push(entry);
        Ok(id)
    }

    async fn query(&self, text: &str, k: usize) -> Result<Vec<MemoryHit>, MemoryError> {
        let query_embedding = self
            .embedder
            .embed(text)
            .await
            .map_err(|e| MemoryError::QueryFailed(e.to_string()))?;
        let entries = self.entries.read().await;
        Ok(vector::rank(&entries, &query_embedding, k))
    }

    async fn get(&self, id: &str) -> Result<Option<MemoryEntry>, MemoryError> {
        let entries = self.entries.read().await;
        Ok(entries.iter().find(|e| e.id == id).cloned())
    }

    async fn count(&self) -> Result<usize, MemoryError> {
        Ok(self.entries.read().await.len())
    }
}
