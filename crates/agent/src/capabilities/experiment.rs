//! A/B variant scoring.

use super::{encode, generate, lenient_text, or_na, remember};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use uhpm_core::capability::{Capability, CapabilityAgent, CapabilityRequest};
use uhpm_core::error::AgentFault;
use uhpm_core::generation::{Generated, GenerationPort};
use uhpm_core::memory::{MemoryBackend, tags};

const NO_EVALUATION: &str = "No evaluation could be generated.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantScore {
    #[serde(default, deserialize_with = "lenient_text")]
    pub variant: String,
    /// 0 to 100.
    #[serde(default, deserialize_with = "clamped_score")]
    pub score: u8,
    #[serde(default, deserialize_with = "lenient_text")]
    pub reason: String,
}

/// Accepts integers, floats and numeric strings; clamps into 0..=100.
fn clamped_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(raw.round().clamp(0.0, 100.0) as u8)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub scores: Vec<VariantScore>,
    /// The highest-scoring variant; the earliest wins a tie.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_variant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExperimentReport {
    fn from_reply(reply: &str) -> Self {
        let scores = match Generated::parse(reply) {
            Generated::Structured(value) => Self::score_list(value),
            Generated::Unstructured(_) => None,
        };

        match scores {
            Some(scores) => {
                let best_variant = best(&scores);
                Self {
                    scores,
                    best_variant,
                    ..Self::default()
                }
            }
            None => Self {
                raw_text: Some(reply.to_string()),
                ..Self::default()
            },
        }
    }

    /// A bare list, a `{"scores": [...]}` wrapper, or a single score object.
    fn score_list(value: Value) -> Option<Vec<VariantScore>> {
        let items = match value {
            Value::Array(items) => items,
            Value::Object(mut map) => match map.remove("scores") {
                Some(Value::Array(items)) => items,
                Some(_) => return None,
                None => vec![Value::Object(map)],
            },
            _ => return None,
        };
        items
            .into_iter()
            .map(serde_json::from_value::<VariantScore>)
            .collect::<Result<Vec<_>, _>>()
            .ok()
    }
}

fn best(scores: &[VariantScore]) -> Option<String> {
    let mut best: Option<&VariantScore> = None;
    for score in scores {
        if best.is_none_or(|b| score.score > b.score) {
            best = Some(score);
        }
    }
    best.map(|b| b.variant.clone())
}

pub struct ExperimentAgent {
    generator: Arc<dyn GenerationPort>,
    memory: Arc<dyn MemoryBackend>,
}

impl ExperimentAgent {
    pub fn new(generator: Arc<dyn GenerationPort>, memory: Arc<dyn MemoryBackend>) -> Self {
        Self { generator, memory }
    }

    /// Score content variants for persona and channel fit.
    pub async fn score_variants(
        &self,
        persona_text: &str,
        channel: &str,
        variants: &[String],
    ) -> Result<ExperimentReport, AgentFault> {
        let listed = if variants.is_empty() {
            "N/A".to_string()
        } else {
            variants
                .iter()
                .enumerate()
                .map(|(i, v)| format!("{}. {v}", i + 1))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let prompt = format!(
            r#"You are a marketing experiment evaluator.
Score each content variant from 0 to 100 on:
- Fit to the persona
- Fit to the channel
- Conversion likelihood
- Clarity and persuasiveness

Persona:
{persona}

Channel:
{channel}

Variants:
{listed}

Reply with a JSON list only:
[
  {{"variant": "...", "score": 0, "reason": "..."}}
]"#,
            persona = or_na(persona_text),
            channel = or_na(channel),
        );

        let Some(reply) = generate(self.generator.as_ref(), &prompt).await? else {
            warn!("Experiment agent got no reply");
            return Ok(ExperimentReport {
                error: Some(NO_EVALUATION.into()),
                ..ExperimentReport::default()
            });
        };

        remember(
            self.memory.as_ref(),
            &reply,
            tags([
                ("type", "experiment"),
                ("channel", channel),
                ("persona", persona_text),
            ]),
        )
        .await;

        let report = ExperimentReport::from_reply(&reply);
        info!(
            variants = variants.len(),
            scored = report.scores.len(),
            "Experiment results stored"
        );
        Ok(report)
    }
}

#[async_trait]
impl CapabilityAgent for ExperimentAgent {
    fn capability(&self) -> Capability {
        Capability::Experiment
    }

    async fn invoke(&self, request: CapabilityRequest) -> Result<Value, AgentFault> {
        match request {
            CapabilityRequest::Experiment {
                persona_text,
                channel,
                variants,
            } => {
                let report = self.score_variants(&persona_text, &channel, &variants).await?;
                encode("experiment", &report)
            }
            other => Err(other.mismatch(Capability::Experiment)),
        }
    }
}
