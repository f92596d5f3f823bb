//! The Generation Port: a single prompt-in, text-out call.
//!
//! No retries and no structure are enforced here. `Ok(None)` means the
//! backend answered with nothing; `Err` means the call itself faulted.

use crate::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[async_trait]
pub trait GenerationPort: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<Option<String>, ProviderError>;
}

/// A generation response classified by whether it carried JSON.
///
/// Consumers must handle the `Unstructured` branch explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Generated {
    Structured(serde_json::Value),
    Unstructured(String),
}

impl Generated {
    /// Classify raw model output.
    ///
    /// The whole text is tried first, then the body of a fenced code block,
    /// then the outermost `{...}` or `[...]` span.
    pub fn parse(raw: &str) -> Self {
        match extract_json(raw) {
            Some(value) => Generated::Structured(value),
            None => Generated::Unstructured(raw.to_string()),
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, Generated::Structured(_))
    }
}

/// Pull a JSON value out of model output.
pub fn extract_json(raw: &str) -> Option<serde_json::Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    if let Some(body) = fenced_body(trimmed)
        && let Ok(value) = serde_json::from_str(body.trim())
    {
        return Some(value);
    }

    [('{', '}'), ('[', ']')].into_iter().find_map(|(open, close)| {
        let start = trimmed.find(open)?;
        let end = trimmed.rfind(close)?;
        if end <= start {
            return None;
        }
        serde_json::from_str(&trimmed[start..=end]).ok()
    })
}

fn fenced_body(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    // Skip an optional language tag on the opening fence line.
    let body_start = after.find('\n')? + 1;
    let body = &after[body_start..];
    let end = body.find("```")?;
    Some(&body[..end])
}
