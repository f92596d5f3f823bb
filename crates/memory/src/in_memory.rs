//! In-memory backend: useful for testing and ephemeral sessions.

use crate::embedder::{Embedder, HashingEmbedder};
use crate::vector;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use uhpm_core::error::MemoryError;
use uhpm_core::memory::{MemoryBackend, MemoryEntry, MemoryHit, Tags};
use uuid::Uuid;

/// An in-memory backend that stores records in a Vec.
/// Useful for testing and sessions where persistence isn't needed.
pub struct InMemoryBackend {
    entries: Arc<RwLock<Vec<MemoryEntry>>>,
    embedder: Arc<dyn Embedder>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::with_embedder(Arc::new(HashingEmbedder::default()))
    }

    pub fn with_embedder(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            embedder,
        }
    }

    /// Snapshot of every stored record, oldest first.
    pub async fn entries(&self) -> Vec<MemoryEntry> {
        self.entries.read().await.clone()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryBackend for InMemoryBackend {
    fn name(&self) -> &str {
        "in_memory"
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
        self.entries.write().await.push(entry);
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

#[cfg(test)]
mod tests {
    use super::*;
    use uhpm_core::memory::tags;

    #[tokio::test]
    async fn store_and_get() {
        let mem = InMemoryBackend::new();
        let id = mem
            .store("Busy parents who cycle to work", tags([("type", "persona")]))
            .await
            .unwrap();

        let entry = mem.get(&id).await.unwrap().unwrap();
        assert_eq!(entry.content, "Busy parents who cycle to work");
        assert_eq!(entry.tags["type"], "persona");
        assert!(entry.embedding.is_some());
        assert_eq!(mem.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn query_returns_nearest_first() {
        let mem = InMemoryBackend::new();
        mem.store("quarterly tax filing deadline", Tags::new()).await.unwrap();
        mem.store("persona for a reusable water bottle", tags([("type", "persona")]))
            .await
            .unwrap();
        mem.store("banner ad copy for running shoes", Tags::new()).await.unwrap();

        let hits = mem.query("water bottle persona", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "persona for a reusable water bottle");
        assert_eq!(hits[0].tags["type"], "persona");
        assert!(hits[0].distance <= hits[1].distance);
    }

    #[tokio::test]
    async fn query_on_empty_store() {
        let mem = InMemoryBackend::new();
        assert!(mem.query("anything", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_stores_are_all_kept() {
        let mem = Arc::new(InMemoryBackend::new());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let mem = Arc::clone(&mem);
                tokio::spawn(async move { mem.store(&format!("record {i}"), Tags::new()).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(mem.count().await.unwrap(), 16);
    }
}
