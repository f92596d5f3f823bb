//! Task classification with a single JSON-repair round.

use std::sync::Arc;
use tracing::{debug, info, warn};
use uhpm_core::decision::{
    Decision, DecisionErrorReason, DecisionShapeError, ErrorDecision, RoutingDecision,
};
use uhpm_core::error::ProviderError;
use uhpm_core::generation::{GenerationPort, extract_json};
use uhpm_core::memory::{MemoryBackend, MemoryHit};
use uhpm_core::task::Task;

/// Related records pulled into the classification prompt by default.
pub const DEFAULT_CONTEXT_K: usize = 3;

const DECISION_SHAPE: &str = r#"{
  "task_type": "research|persona|content|experiment|analysis|unknown",
  "reasoning": "short, high-level explanation",
  "action": "call_research_agent|call_persona_agent|call_content_agent|call_experiment_agent|call_analysis_agent|unknown",
  "inputs_needed": ["product_text", "competitor_text", "market_text", "persona_text", "channel", "variants", "campaign_results", "customer_text"]
}"#;

/// Turns a free-text task into a [`Decision`].
///
/// Makes at most two generation calls: the classification itself and, when
/// its reply does not have the routing shape, one repair call.
pub struct Reasoner {
    generator: Arc<dyn GenerationPort>,
    memory: Arc<dyn MemoryBackend>,
    context_k: usize,
}

impl Reasoner {
    pub fn new(
        generator: Arc<dyn GenerationPort>,
        memory: Arc<dyn MemoryBackend>,
        context_k: usize,
    ) -> Self {
        Self {
            generator,
            memory,
            context_k,
        }
    }

    pub async fn decide(&self, task: &Task) -> Decision {
        info!("Starting reasoning");

        let context = self.recall(task).await;
        let prompt = classification_prompt(task, &context);

        let first = match self.call(&prompt).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                warn!("No reasoning response returned");
                return Decision::Error(ErrorDecision::new(DecisionErrorReason::NoResponse));
            }
            Err(e) => {
                warn!(error = %e, "Reasoning call failed");
                return Decision::Error(
                    ErrorDecision::new(DecisionErrorReason::GenerationFailed)
                        .with_detail(e.to_string()),
                );
            }
        };

        let first_error = match validate(&first) {
            Ok(decision) => {
                info!(action = %decision.action, "Routing decision accepted");
                return Decision::Route(decision);
            }
            Err(e) => e,
        };
        warn!(error = %first_error, "Reasoning reply malformed, attempting repair");

        let fallback = match self.call(&repair_prompt(&first)).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                warn!("Repair call returned nothing");
                return Decision::Error(
                    ErrorDecision::new(DecisionErrorReason::NoResponseOnFallback)
                        .with_raw_first(first),
                );
            }
            Err(e) => {
                warn!(error = %e, "Repair call failed");
                return Decision::Error(
                    ErrorDecision::new(DecisionErrorReason::GenerationFailed)
                        .with_raw_first(first)
                        .with_detail(e.to_string()),
                );
            }
        };

        match validate(&fallback) {
            Ok(decision) => {
                info!(action = %decision.action, "Repaired routing decision accepted");
                Decision::Route(decision)
            }
            Err(e) => {
                warn!(error = %e, "Repaired reply still malformed");
                Decision::Error(
                    ErrorDecision::new(DecisionErrorReason::JsonParsingFailed)
                        .with_raw_first(first)
                        .with_raw_fallback(fallback),
                )
            }
        }
    }

    /// Nearest records for the task. A failing store degrades to no context.
    async fn recall(&self, task: &Task) -> Vec<MemoryHit> {
        match self.memory.query(task.as_str(), self.context_k).await {
            Ok(hits) => {
                debug!(count = hits.len(), "Retrieved context");
                hits
            }
            Err(e) => {
                warn!(error = %e, "Context retrieval failed, continuing without context");
                Vec::new()
            }
        }
    }

    async fn call(&self, prompt: &str) -> Result<Option<String>, ProviderError> {
        let reply = self.generator.generate(prompt).await?;
        Ok(reply.filter(|text| !text.trim().is_empty()))
    }
}

#[derive(Debug, thiserror::Error)]
enum ReplyError {
    #[error("reply contains no JSON")]
    NoJson,
    #[error(transparent)]
    Shape(#[from] DecisionShapeError),
}

fn validate(reply: &str) -> Result<RoutingDecision, ReplyError> {
    let value = extract_json(reply).ok_or(ReplyError::NoJson)?;
    Ok(RoutingDecision::from_json(&value)?)
}

fn classification_prompt(task: &Task, context: &[MemoryHit]) -> String {
    let context = serde_json::to_string_pretty(context).unwrap_or_else(|_| "[]".into());
    format!(
        r#"You are the core reasoning agent of a marketing AI system.

Your job is to:
- Analyse the user's task
- Use the retrieved memory
- Decide which single agent should run next
- ALWAYS return JSON only

Task types and the action each one maps to:
- research -> call_research_agent
- persona -> call_persona_agent
- content -> call_content_agent
- experiment -> call_experiment_agent
- analysis -> call_analysis_agent
- unknown -> unknown (the task fits none of the above; inputs_needed is empty)

User's request:
{task}

Retrieved memory (past research results, notes, insights):
{context}

Respond ONLY in the following JSON format, listing in inputs_needed only the
fields the chosen agent requires:
{DECISION_SHAPE}"#
    )
}

fn repair_prompt(raw: &str) -> String {
    format!(
        r#"Convert the following text into valid JSON with exactly these four keys.
Return the JSON object only, with no markdown and no commentary.

{DECISION_SHAPE}

Text to convert:
{raw}"#
    )
}
