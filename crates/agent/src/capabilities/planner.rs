//! Task planning: which capabilities a request needs.
//!
//! The planner sits beside the routing pipeline rather than inside it. It is
//! reachable from the `/api/plan` endpoint and the `uhpm plan` command.

use super::{generate, lenient_text};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};
use uhpm_core::error::AgentFault;
use uhpm_core::generation::{Generated, GenerationPort};
use uhpm_core::task::Task;

const NO_RESPONSE_CONTEXT: &str = "Fallback: No LLM response";
const INVALID_JSON_CONTEXT: &str = "Invalid LLM JSON, fallback used.";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPlan {
    #[serde(default, deserialize_with = "lenient_text")]
    pub task: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub needs_research: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub needs_persona: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub needs_content: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub needs_experimentation: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub needs_analytics: bool,
    #[serde(default, deserialize_with = "lenient_text")]
    pub additional_context: String,
}

impl TaskPlan {
    /// Research only.
    fn fallback(task: &Task, context: &str) -> Self {
        Self {
            task: task.as_str().to_string(),
            needs_research: true,
            additional_context: context.into(),
            ..Self::default()
        }
    }
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes"),
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    })
}

pub struct PlannerAgent {
    generator: Arc<dyn GenerationPort>,
}

impl PlannerAgent {
    pub fn new(generator: Arc<dyn GenerationPort>) -> Self {
        Self { generator }
    }

    pub async fn plan(&self, task: &Task) -> Result<TaskPlan, AgentFault> {
        let prompt = format!(
            r#"You are the planner of a marketing multi-agent system.
Analyse the user's request and output a JSON plan saying which agents must run.

Agents available:
- research_agent (product analysis, competitor analysis)
- persona_agent (target audience creation)
- content_agent (ads, posts, scripts, long-form content)
- experiment_agent (A/B tests, variations, test ideas)
- analytics_agent (ROI analysis, performance insights)

The output MUST be valid JSON with this structure:
{{
    "task": "...",
    "needs_research": true,
    "needs_persona": false,
    "needs_content": false,
    "needs_experimentation": false,
    "needs_analytics": false,
    "additional_context": "optional description or extracted info"
}}

User request:
{task}"#
        );

        let Some(reply) = generate(self.generator.as_ref(), &prompt).await? else {
            error!("Planner got no reply, using fallback plan");
            return Ok(TaskPlan::fallback(task, NO_RESPONSE_CONTEXT));
        };

        let mut plan = match Generated::parse(&reply) {
            Generated::Structured(value @ Value::Object(_)) => {
                match serde_json::from_value::<TaskPlan>(value) {
                    Ok(plan) => plan,
                    Err(e) => {
                        error!(error = %e, raw = %reply, "Planner reply had the wrong shape");
                        return Ok(TaskPlan::fallback(task, INVALID_JSON_CONTEXT));
                    }
                }
            }
            _ => {
                error!(raw = %reply, "Planner reply was not JSON");
                return Ok(TaskPlan::fallback(task, INVALID_JSON_CONTEXT));
            }
        };

        if plan.task.trim().is_empty() {
            plan.task = task.as_str().to_string();
        }
        info!(
            research = plan.needs_research,
            persona = plan.needs_persona,
            content = plan.needs_content,
            experimentation = plan.needs_experimentation,
            analytics = plan.needs_analytics,
            "Plan generated"
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FailingGenerator, ScriptedGenerator};

    fn task() -> Task {
        Task::new("Launch campaign for a steel bottle").unwrap()
    }

    #[tokio::test]
    async fn plan_is_parsed() {
        let generator = Arc::new(ScriptedGenerator::single(
            r#"{"task": "launch", "needs_research": true, "needs_persona": "true", "needs_content": 1, "additional_context": "EU only"}"#,
        ));
        let plan = PlannerAgent::new(generator.clone()).plan(&task()).await.unwrap();

        assert_eq!(plan.task, "launch");
        assert!(plan.needs_research && plan.needs_persona && plan.needs_content);
        assert!(!plan.needs_experimentation && !plan.needs_analytics);
        assert_eq!(plan.additional_context, "EU only");
        assert!(generator.prompts()[0].ends_with("Launch campaign for a steel bottle"));
    }

    #[tokio::test]
    async fn missing_task_is_filled_from_input() {
        let plan = PlannerAgent::new(Arc::new(ScriptedGenerator::single(r#"{"needs_content": true}"#)))
            .plan(&task())
            .await
            .unwrap();
        assert_eq!(plan.task, "Launch campaign for a steel bottle");
    }

    #[tokio::test]
    async fn no_reply_falls_back_to_research() {
        let plan = PlannerAgent::new(Arc::new(ScriptedGenerator::silent()))
            .plan(&task())
            .await
            .unwrap();
        assert!(plan.needs_research);
        assert!(!plan.needs_persona);
        assert_eq!(plan.additional_context, NO_RESPONSE_CONTEXT);
    }

    #[tokio::test]
    async fn prose_falls_back_to_research() {
        let plan = PlannerAgent::new(Arc::new(ScriptedGenerator::single("Do research first.")))
            .plan(&task())
            .await
            .unwrap();
        assert_eq!(plan.additional_context, INVALID_JSON_CONTEXT);
        assert_eq!(plan.task, "Launch campaign for a steel bottle");
    }

    #[tokio::test]
    async fn generation_fault_propagates() {
        let err = PlannerAgent::new(Arc::new(FailingGenerator))
            .plan(&task())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentFault::Generation(_)));
    }
}
