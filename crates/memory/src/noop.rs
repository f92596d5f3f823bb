//! No-op memory backend: disables persistent memory entirely.

use async_trait::async_trait;
use uhpm_core::error::MemoryError;
use uhpm_core::memory::{MemoryBackend, MemoryEntry, MemoryHit, Tags};

/// A no-op memory backend that stores nothing and recalls nothing.
pub struct NoopMemory;

#[async_trait]
impl MemoryBackend for NoopMemory {
    fn name(&self) -> &str {
        "none"
    }

    async fn store(&self, _text: &str, _tags: Tags) -> Result<String, MemoryError> {
        Ok(String::new())
    }

    async fn query(&self, _text: &str, _k: usize) -> Result<Vec<MemoryHit>, MemoryError> {
        Ok(Vec::new())
    }

    async fn get(&self, _id: &str) -> Result<Option<MemoryEntry>, MemoryError> {
        Ok(None)
    }

    async fn count(&self) -> Result<usize, MemoryError> {
        Ok(0)
    }
}
