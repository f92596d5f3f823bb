//! The five capability agents plus the standalone planner.
//!
//! Every agent follows the same shape: build a role prompt, make one
//! generation call, parse the reply into its report type (falling back to a
//! documented default when the reply is missing or malformed), write the
//! reply to memory on a best-effort basis, and return the report.

pub mod analytics;
pub mod content;
pub mod experiment;
pub mod persona;
pub mod planner;
pub mod research;

pub use analytics::{AnalyticsAgent, CampaignInsights};
pub use content::{ContentAgent, ContentDraft};
pub use experiment::{ExperimentAgent, ExperimentReport, VariantScore};
pub use persona::{PersonaAgent, PersonaProfile};
pub use planner::{PlannerAgent, TaskPlan};
pub use research::{ResearchAgent, ResearchReport};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use uhpm_core::error::{AgentFault, ProviderError};
use uhpm_core::generation::GenerationPort;
use uhpm_core::memory::{MemoryBackend, Tags};

/// One generation call with blank replies folded into `None`.
pub(crate) async fn generate(
    generator: &dyn GenerationPort,
    prompt: &str,
) -> Result<Option<String>, ProviderError> {
    let reply = generator.generate(prompt).await?;
    Ok(reply.filter(|text| !text.trim().is_empty()))
}

/// Append to memory, logging and swallowing any failure.
pub(crate) async fn remember(memory: &dyn MemoryBackend, text: &str, tags: Tags) {
    let kind = tags.get("type").cloned().unwrap_or_default();
    match memory.store(text, tags).await {
        Ok(id) => debug!(kind = %kind, id = %id, "Stored in memory"),
        Err(e) => warn!(kind = %kind, error = %e, "Memory write failed, continuing"),
    }
}

pub(crate) fn encode<T: Serialize>(capability: &'static str, report: &T) -> Result<Value, AgentFault> {
    serde_json::to_value(report).map_err(|source| AgentFault::Encode { capability, source })
}

/// Deserialize any JSON value as text: strings verbatim, null as empty,
/// everything else in its compact JSON form.
pub(crate) fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_text(Value::deserialize(deserializer)?))
}

/// Deserialize a list of texts, accepting a bare string as a one-item list
/// and null as an empty list.
pub(crate) fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => Vec::new(),
        Value::Array(items) => items.into_iter().map(value_text).collect(),
        other => vec![value_text(other)],
    })
}

fn value_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Placeholder used in prompts for optional inputs the caller left empty.
pub(crate) fn or_na(text: &str) -> &str {
    if text.trim().is_empty() { "N/A" } else { text }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Fields {
        #[serde(default, deserialize_with = "lenient_text")]
        text: String,
        #[serde(default, deserialize_with = "lenient_list")]
        list: Vec<String>,
    }

    #[test]
    fn lenient_fields() {
        let fields: Fields = serde_json::from_value(json!({"text": 42, "list": "email"})).unwrap();
        assert_eq!(fields.text, "42");
        assert_eq!(fields.list, vec!["email"]);

        let fields: Fields = serde_json::from_value(json!({"text": null, "list": null})).unwrap();
        assert_eq!(fields.text, "");
        assert!(fields.list.is_empty());

        let fields: Fields = serde_json::from_value(json!({})).unwrap();
        assert!(fields.text.is_empty() && fields.list.is_empty());
    }

    #[test]
    fn na_placeholder() {
        assert_eq!(or_na("  "), "N/A");
        assert_eq!(or_na("EU cyclists"), "EU cyclists");
    }
}
