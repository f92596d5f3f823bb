//! `uhpm memory`: inspect and feed the memory store.

use std::sync::Arc;
use uhpm_config::AppConfig;
use uhpm_core::memory::{MemoryBackend, Tags};

/// Open the configured store. Provider embeddings use the default provider.
fn open_memory(config: &AppConfig) -> Result<Arc<dyn MemoryBackend>, Box<dyn std::error::Error>> {
    let provider = uhpm_providers::build_from_config(config).default();
    Ok(uhpm_memory::build_from_config(config, provider)?)
}

pub async fn stats() -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let memory = open_memory(&config)?;

    println!("Memory Statistics");
    println!("=================");
    println!("  Backend:    {}", memory.name());
    println!(
        "  Embeddings: {} ({} dims)",
        config.memory.embedding_provider, config.memory.embedding_dimensions
    );
    println!("  Records:    {}", memory.count().await?);

    if config.memory.backend == "file" {
        let path = config.memory.persist_dir().join(uhpm_memory::file_backend::STORE_FILE);
        if path.exists() {
            let size_kb = std::fs::metadata(&path)?.len() as f64 / 1024.0;
            println!("  Store file: {} ({:.1} KB)", path.display(), size_kb);
        } else {
            println!("  Store file: (not created yet)");
        }
    }

    Ok(())
}

pub async fn search(query: &str, k: usize) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let memory = open_memory(&config)?;

    println!("Searching memories for: \"{query}\"");
    println!();

    let hits = memory.query(query, k).await?;
    if hits.is_empty() {
        println!("   No memories found.");
    }
    for (i, hit) in hits.iter().enumerate() {
        let preview: String = hit.text.chars().take(80).collect();
        println!("  {:>2}. [distance: {:.3}] {preview}", i + 1, hit.distance);
        if !hit.tags.is_empty() {
            let tags: Vec<String> = hit.tags.iter().map(|(k, v)| format!("{k}={v}")).collect();
            println!("      tags: {}", tags.join(", "));
        }
    }

    Ok(())
}

pub async fn add(text: &str, tag_args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let tags = parse_tags(tag_args)?;
    let config = super::load_config()?;
    let memory = open_memory(&config)?;

    let id = memory.store(text, tags).await?;
    println!("Stored memory {id}");
    Ok(())
}

/// Parse repeated `key=value` arguments.
fn parse_tags(args: &[String]) -> Result<Tags, String> {
    args.iter()
        .map(|arg| match arg.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.trim().to_string()))
            }
            _ => Err(format!("invalid tag '{arg}', expected key=value")),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_parse_key_value_pairs() {
        let tags = parse_tags(&["type=note".into(), "source = cli".into()]).unwrap();
        assert_eq!(tags["type"], "note");
        assert_eq!(tags["source"], "cli");
    }

    #[test]
    fn malformed_tag_is_rejected() {
        assert!(parse_tags(&["novalue".into()]).is_err());
        assert!(parse_tags(&["=x".into()]).is_err());
    }
}
