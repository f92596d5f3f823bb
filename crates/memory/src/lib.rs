//! Memory system implementations for UHPM.
//!
//! Every backend implements `uhpm_core::MemoryBackend`: append a text with
//! tags, or ask for the records nearest to a text.

pub mod embedder;
pub mod file_backend;
pub mod in_memory;
pub mod noop;
pub mod vector;

pub use embedder::{Embedder, HashingEmbedder, ProviderEmbedder};
pub use file_backend::FileBackend;
pub use in_memory::InMemoryBackend;
pub use noop::NoopMemory;
pub use vector::{cosine_distance, cosine_similarity};

use std::sync::Arc;
use tracing::info;
use uhpm_core::error::MemoryError;
use uhpm_core::memory::MemoryBackend;
use uhpm_core::provider::Provider;

/// Build the configured memory backend.
///
/// `provider` is only consulted when `memory.embedding_provider = "provider"`.
pub fn build_from_config(
    config: &uhpm_config::AppConfig,
    provider: Option<Arc<dyn Provider>>,
) -> Result<Arc<dyn MemoryBackend>, MemoryError> {
    let memory = &config.memory;

    let embedder: Arc<dyn Embedder> = match (memory.embedding_provider.as_str(), provider) {
        ("provider", Some(provider)) => {
            Arc::new(ProviderEmbedder::new(provider, &memory.embedding_model))
        }
        ("provider", None) => {
            return Err(MemoryError::EmbeddingFailed(
                "embedding_provider = \"provider\" but no provider is available".into(),
            ));
        }
        _ => Arc::new(HashingEmbedder::new(memory.embedding_dimensions)),
    };

    let backend: Arc<dyn MemoryBackend> = match memory.backend.as_str() {
        "none" => Arc::new(NoopMemory),
        "in_memory" => Arc::new(InMemoryBackend::with_embedder(embedder)),
        _ => Arc::new(FileBackend::open(&memory.persist_dir(), embedder)?),
    };

    info!(backend = backend.name(), "Memory backend ready");
    Ok(backend)
}
