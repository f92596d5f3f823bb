//! Memory trait: the append-only semantic store (the Memory Port).
//!
//! The pipeline only ever appends records and asks for the nearest records
//! to a piece of text. How texts are embedded and indexed is up to the
//! backend.

use crate::error::MemoryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tag mapping attached to a record (e.g. `type = persona`).
pub type Tags = BTreeMap<String, String>;

/// A single stored record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Unique ID for this record
    pub id: String,

    /// The stored text blob
    pub content: String,

    /// Tags for categorization and provenance
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: Tags,

    /// When this record was created
    pub created_at: DateTime<Utc>,

    /// Embedding vector computed at store time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// One result of a nearest-neighbour query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryHit {
    pub text: String,
    pub tags: Tags,
    /// Smaller is nearer.
    pub distance: f32,
}

/// The core MemoryBackend trait.
///
/// Implementations: JSONL file, in-memory (for testing), none (no-op).
/// Backends must tolerate concurrent use from independent pipeline runs.
#[async_trait]
pub trait MemoryBackend: Send + Sync {
    /// The backend name (e.g., "file", "in_memory", "none").
    fn name(&self) -> &str;

    /// Append a record and return its id.
    async fn store(&self, text: &str, tags: Tags) -> Result<String, MemoryError>;

    /// Return up to `k` records ordered nearest-first.
    async fn query(&self, text: &str, k: usize) -> Result<Vec<MemoryHit>, MemoryError>;

    /// Get a record by ID.
    async fn get(&self, id: &str) -> Result<Option<MemoryEntry>, MemoryError>;

    /// Total record count.
    async fn count(&self) -> Result<usize, MemoryError>;
}

/// Build a [`Tags`] map from string pairs.
pub fn tags<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Tags
where
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
