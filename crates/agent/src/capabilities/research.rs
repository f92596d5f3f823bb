//! Product and competitor research.

use super::{encode, generate, lenient_list, lenient_text, or_na, remember};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;
use uhpm_core::capability::{Capability, CapabilityAgent, CapabilityRequest};
use uhpm_core::error::AgentFault;
use uhpm_core::generation::{Generated, GenerationPort};
use uhpm_core::memory::{MemoryBackend, tags};

const NO_RESPONSE: &str = "No response is available.";

/// Structured product analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchReport {
    #[serde(default, deserialize_with = "lenient_text")]
    pub product_summary: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub usps: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub target_audience: Vec<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub competitor_comparison: String,
    /// The model's reply when it could not be read as the structure above.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResearchReport {
    fn from_reply(reply: &str) -> Self {
        if let Generated::Structured(value @ Value::Object(_)) = Generated::parse(reply)
            && let Ok(report) = serde_json::from_value::<ResearchReport>(value)
        {
            return report;
        }
        Self {
            raw_text: Some(reply.to_string()),
            ..Self::default()
        }
    }

    fn unavailable() -> Self {
        Self {
            error: Some(NO_RESPONSE.into()),
            ..Self::default()
        }
    }
}

pub struct ResearchAgent {
    generator: Arc<dyn GenerationPort>,
    memory: Arc<dyn MemoryBackend>,
}

impl ResearchAgent {
    pub fn new(generator: Arc<dyn GenerationPort>, memory: Arc<dyn MemoryBackend>) -> Self {
        Self { generator, memory }
    }

    /// Analyse a product, optionally against competitor information.
    pub async fn analyse_product(
        &self,
        product_text: &str,
        competitor_text: &str,
    ) -> Result<ResearchReport, AgentFault> {
        let prompt = format!(
            r#"You are a marketing research agent.
Analyse the following product:
{product_text}

Competitor information: {competitor}

Reply with JSON only, in exactly this shape:
{{
    "product_summary": "two sentences",
    "usps": ["unique selling points"],
    "target_audience": ["audience segments"],
    "competitor_comparison": "two sentences"
}}"#,
            competitor = or_na(competitor_text),
        );

        let Some(reply) = generate(self.generator.as_ref(), &prompt).await? else {
            return Ok(ResearchReport::unavailable());
        };

        remember(
            self.memory.as_ref(),
            &reply,
            tags([
                ("type", "research"),
                ("product_text", product_text),
                ("competitor_text", competitor_text),
            ]),
        )
        .await;
        info!("Research analysis complete");

        Ok(ResearchReport::from_reply(&reply))
    }
}

#[async_trait]
impl CapabilityAgent for ResearchAgent {
    fn capability(&self) -> Capability {
        Capability::Research
    }

    async fn invoke(&self, request: CapabilityRequest) -> Result<Value, AgentFault> {
        match request {
            CapabilityRequest::Research {
                product_text,
                competitor_text,
            } => {
                let report = self.analyse_product(&product_text, &competitor_text).await?;
                encode("research", &report)
            }
            other => Err(other.mismatch(Capability::Research)),
        }
    }
}
