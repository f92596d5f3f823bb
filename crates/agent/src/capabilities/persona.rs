//! Buyer persona modelling.

use super::{encode, generate, lenient_list, lenient_text, or_na, remember};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};
use uhpm_core::capability::{Capability, CapabilityAgent, CapabilityRequest};
use uhpm_core::error::AgentFault;
use uhpm_core::generation::{Generated, GenerationPort};
use uhpm_core::memory::{MemoryBackend, tags};

const EMPTY_REPLY: &str = "Empty LLM response";
const INVALID_JSON: &str = "Invalid JSON response from agent.";

/// A buyer persona. Every field is always present; missing ones default to
/// empty and `recommended_channels` is always a list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonaProfile {
    #[serde(default, deserialize_with = "lenient_text")]
    pub persona_name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub age_range: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub demographics: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub lifestyle: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub deep_motivations: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub pain_points: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub buying_triggers: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub objections: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub language_and_tone: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub recommended_channels: Vec<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PersonaProfile {
    fn fallback(error: &str) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    fn parse(reply: &str) -> Option<Self> {
        match Generated::parse(reply) {
            Generated::Structured(value @ Value::Object(_)) => serde_json::from_value(value).ok(),
            _ => None,
        }
    }
}

pub struct PersonaAgent {
    generator: Arc<dyn GenerationPort>,
    memory: Arc<dyn MemoryBackend>,
}

impl PersonaAgent {
    pub fn new(generator: Arc<dyn GenerationPort>, memory: Arc<dyn MemoryBackend>) -> Self {
        Self { generator, memory }
    }

    /// Model a buyer persona for a product in a market.
    pub async fn generate_persona(
        &self,
        product_text: &str,
        market_text: &str,
    ) -> Result<PersonaProfile, AgentFault> {
        let prompt = format!(
            r#"You are a senior marketing persona modeller.
Based on the product description below, create a complete, highly actionable buyer persona.

Product:
{product_text}

Market / customer information:
{market}

Return the persona ONLY as JSON in exactly this shape:
{{
    "persona_name": "",
    "age_range": "",
    "demographics": "",
    "lifestyle": "",
    "deep_motivations": "",
    "pain_points": "",
    "buying_triggers": "",
    "objections": "",
    "language_and_tone": "",
    "recommended_channels": ["", ""],
    "summary": ""
}}

Requirements:
- No text outside the JSON.
- No markdown.
- The JSON must be valid and parseable."#,
            market = or_na(market_text),
        );

        info!("Sending persona prompt to model");
        let Some(reply) = generate(self.generator.as_ref(), &prompt).await? else {
            error!("Persona agent got an empty reply");
            return Ok(PersonaProfile::fallback(EMPTY_REPLY));
        };

        let Some(persona) = PersonaProfile::parse(&reply) else {
            error!("Persona agent got invalid JSON, using fallback");
            return Ok(PersonaProfile::fallback(INVALID_JSON));
        };

        let stored = encode("persona", &persona)?.to_string();
        remember(
            self.memory.as_ref(),
            &stored,
            tags([("type", "persona"), ("product_text", product_text)]),
        )
        .await;
        info!(persona = %persona.persona_name, "Persona generated");

        Ok(persona)
    }
}

#[async_trait]
impl CapabilityAgent for PersonaAgent {
    fn capability(&self) -> Capability {
        Capability::Persona
    }

    async fn invoke(&self, request: CapabilityRequest) -> Result<Value, AgentFault> {
        match request {
            CapabilityRequest::Persona {
                product_text,
                market_text,
            } => {
                let persona = self.generate_persona(&product_text, &market_text).await?;
                encode("persona", &persona)
            }
            other => Err(other.mismatch(Capability::Persona)),
        }
    }
}
