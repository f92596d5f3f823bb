//! Campaign performance analysis.

use super::{encode, generate, lenient_list, lenient_text, remember};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};
use uhpm_core::capability::{Capability, CapabilityAgent, CapabilityRequest};
use uhpm_core::error::AgentFault;
use uhpm_core::generation::{Generated, GenerationPort};
use uhpm_core::memory::{MemoryBackend, tags};

const NO_RESPONSE: &str = "No response from Agent";
const INVALID_JSON: &str = "Invalid JSON from Agent";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignInsights {
    #[serde(default, deserialize_with = "lenient_text")]
    pub summary: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub persona_changes: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub content_improvements: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub channel_recommendations: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub next_steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CampaignInsights {
    fn fallback(error: &str) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

pub struct AnalyticsAgent {
    generator: Arc<dyn GenerationPort>,
    memory: Arc<dyn MemoryBackend>,
}

impl AnalyticsAgent {
    pub fn new(generator: Arc<dyn GenerationPort>, memory: Arc<dyn MemoryBackend>) -> Self {
        Self { generator, memory }
    }

    /// Turn campaign metrics (and optional customer feedback) into insights.
    pub async fn analyse_campaign(
        &self,
        campaign_results: &str,
        customer_text: &str,
    ) -> Result<CampaignInsights, AgentFault> {
        let feedback = if customer_text.trim().is_empty() {
            String::new()
        } else {
            format!("\nCustomer feedback:\n{customer_text}\n")
        };

        let prompt = format!(
            r#"You are a senior marketing performance analyst.

Analyse the following campaign results:
{campaign_results}
{feedback}
Cover:
- What worked well
- What underperformed and why
- Persona adjustments
- Content improvements
- Channel recommendations
- Clear steps to improve conversion

Return clean JSON only:
{{
    "summary": "...",
    "persona_changes": ["..."],
    "content_improvements": ["..."],
    "channel_recommendations": ["..."],
    "next_steps": ["..."]
}}"#
        );

        let Some(reply) = generate(self.generator.as_ref(), &prompt).await? else {
            warn!("Analytics agent got no reply");
            return Ok(CampaignInsights::fallback(NO_RESPONSE));
        };

        let insights = match Generated::parse(&reply) {
            Generated::Structured(value @ Value::Object(_)) => serde_json::from_value(value)
                .unwrap_or_else(|_| CampaignInsights::fallback(INVALID_JSON)),
            _ => {
                error!("Analytics reply was not valid JSON, using fallback");
                CampaignInsights::fallback(INVALID_JSON)
            }
        };

        // The fallback is stored too, so the failed run stays visible in memory.
        let stored = encode("analytics", &insights)?.to_string();
        remember(
            self.memory.as_ref(),
            &stored,
            tags([("type", "analytics"), ("source", "campaign_feedback")]),
        )
        .await;
        info!("Analytics insights stored");

        Ok(insights)
    }
}

#[async_trait]
impl CapabilityAgent for AnalyticsAgent {
    fn capability(&self) -> Capability {
        Capability::Analytics
    }

    async fn invoke(&self, request: CapabilityRequest) -> Result<Value, AgentFault> {
        match request {
            CapabilityRequest::Analytics {
                campaign_results,
                customer_text,
            } => {
                let insights = self
                    .analyse_campaign(&campaign_results, &customer_text)
                    .await?;
                encode("analytics", &insights)
            }
            other => Err(other.mismatch(Capability::Analytics)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FailingMemory, ScriptedGenerator};
    use uhpm_memory::InMemoryBackend;

    async fn run(reply: Option<&str>, customer: &str) -> (CampaignInsights, Arc<InMemoryBackend>, Arc<ScriptedGenerator>) {
        let memory = Arc::new(InMemoryBackend::new());
        let generator = Arc::new(ScriptedGenerator::new(vec![reply]));
        let insights = AnalyticsAgent::new(generator.clone(), memory.clone())
            .analyse_campaign(r#"{"clicks": 120, "conversions": 3}"#, customer)
            .await
            .unwrap();
        (insights, memory, generator)
    }

    #[tokio::test]
    async fn insights_are_parsed_and_stored() {
        let (insights, memory, generator) = run(
            Some(r#"{"summary": "CTR fine, conversion weak", "next_steps": "Fix checkout"}"#),
            "",
        )
        .await;

        assert_eq!(insights.summary, "CTR fine, conversion weak");
        assert_eq!(insights.next_steps, vec!["Fix checkout"]);
        assert!(insights.persona_changes.is_empty());
        assert!(!generator.prompts()[0].contains("Customer feedback"));

        let stored = memory.entries().await;
        assert_eq!(stored[0].tags["source"], "campaign_feedback");
    }

    #[tokio::test]
    async fn customer_feedback_reaches_the_prompt() {
        let (_, _, generator) = run(Some("{}"), "Lid leaks when upside down").await;
        assert!(generator.prompts()[0].contains("Customer feedback:\nLid leaks"));
    }

    #[tokio::test]
    async fn no_reply_is_not_stored() {
        let (insights, memory, _) = run(None, "").await;
        assert_eq!(insights.error.as_deref(), Some(NO_RESPONSE));
        assert!(memory.entries().await.is_empty());
    }

    #[tokio::test]
    async fn invalid_json_fallback_is_stored() {
        let (insights, memory, _) = run(Some("Conversions were low."), "").await;
        assert_eq!(insights.error.as_deref(), Some(INVALID_JSON));
        let stored = memory.entries().await;
        assert_eq!(stored.len(), 1);
        assert!(stored[0].content.contains(INVALID_JSON));
    }

    #[tokio::test]
    async fn memory_failure_still_returns_insights() {
        let generator = Arc::new(ScriptedGenerator::single(
            r#"{"summary": "Clicks fine, conversions low", "next_steps": ["Simplify checkout"]}"#,
        ));
        let insights = AnalyticsAgent::new(generator, Arc::new(FailingMemory))
            .analyse_campaign(r#"{"clicks": 120}"#, "")
            .await
            .unwrap();
        assert_eq!(insights.summary, "Clicks fine, conversions low");
        assert!(insights.error.is_none());
    }

    #[tokio::test]
    async fn memory_failure_on_invalid_reply_keeps_fallback() {
        let generator = Arc::new(ScriptedGenerator::single("[1, 2, 3]"));
        let insights = AnalyticsAgent::new(generator, Arc::new(FailingMemory))
            .analyse_campaign(r#"{"clicks": 120}"#, "")
            .await
            .unwrap();
        assert_eq!(insights.error.as_deref(), Some("Invalid JSON from Agent"));
    }
}
