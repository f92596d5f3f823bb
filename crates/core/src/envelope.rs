//! The uniform dispatch envelope.

use crate::capability::Capability;
use crate::decision::RoutingDecision;
use serde::{Deserialize, Serialize};

/// Outcome of a dispatch. Serialized with a `status` discriminator so every
/// branch, including failures, has the same outer shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchResult {
    WaitingForInputs {
        missing_inputs: Vec<String>,
        required: Vec<String>,
    },
    ResearchDone {
        result: serde_json::Value,
    },
    PersonaDone {
        result: serde_json::Value,
    },
    ContentDone {
        result: serde_json::Value,
    },
    ExperimentDone {
        result: serde_json::Value,
    },
    AnalyticsDone {
        result: serde_json::Value,
    },
    UnknownAction {
        action: String,
        decision: RoutingDecision,
    },
    AgentError {
        error: String,
        trace: String,
    },
}

impl DispatchResult {
    /// The success envelope for a capability.
    pub fn done(capability: Capability, result: serde_json::Value) -> Self {
        match capability {
            Capability::Research => DispatchResult::ResearchDone { result },
            Capability::Persona => DispatchResult::PersonaDone { result },
            Capability::Content => DispatchResult::ContentDone { result },
            Capability::Experiment => DispatchResult::ExperimentDone { result },
            Capability::Analytics => DispatchResult::AnalyticsDone { result },
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            DispatchResult::WaitingForInputs { .. } => "waiting_for_inputs",
            DispatchResult::ResearchDone { .. } => "research_done",
            DispatchResult::PersonaDone { .. } => "persona_done",
            DispatchResult::ContentDone { .. } => "content_done",
            DispatchResult::ExperimentDone { .. } => "experiment_done",
            DispatchResult::AnalyticsDone { .. } => "analytics_done",
            DispatchResult::UnknownAction { .. } => "unknown_action",
            DispatchResult::AgentError { .. } => "agent_error",
        }
    }

    pub fn result(&self) -> Option<&serde_json::Value> {
        match self {
            DispatchResult::ResearchDone { result }
            | DispatchResult::PersonaDone { result }
            | DispatchResult::ContentDone { result }
            | DispatchResult::ExperimentDone { result }
            | DispatchResult::AnalyticsDone { result } => Some(result),
            _ => None,
        }
    }
}
