//! Capability agents: the five leaf units the dispatcher routes to.

use crate::error::AgentFault;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One of the five routable capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Research,
    Persona,
    Content,
    Experiment,
    Analytics,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::Research,
        Capability::Persona,
        Capability::Content,
        Capability::Experiment,
        Capability::Analytics,
    ];

    /// Look up the capability for an action name.
    ///
    /// Analytics answers to both `call_analytics_agent` and the
    /// `call_analysis_agent` name the classification prompt teaches the model.
    pub fn from_action(action: &str) -> Option<Self> {
        match action {
            "call_research_agent" => Some(Capability::Research),
            "call_persona_agent" => Some(Capability::Persona),
            "call_content_agent" => Some(Capability::Content),
            "call_experiment_agent" => Some(Capability::Experiment),
            "call_analytics_agent" | "call_analysis_agent" => Some(Capability::Analytics),
            _ => None,
        }
    }

    /// Canonical action name.
    pub fn action_name(self) -> &'static str {
        match self {
            Capability::Research => "call_research_agent",
            Capability::Persona => "call_persona_agent",
            Capability::Content => "call_content_agent",
            Capability::Experiment => "call_experiment_agent",
            Capability::Analytics => "call_analytics_agent",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Research => "research",
            Capability::Persona => "persona",
            Capability::Content => "content",
            Capability::Experiment => "experiment",
            Capability::Analytics => "analytics",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed arguments for one capability invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum CapabilityRequest {
    Research {
        product_text: String,
        competitor_text: String,
    },
    Persona {
        product_text: String,
        market_text: String,
    },
    Content {
        product_text: String,
        persona_text: String,
        channel: String,
    },
    Experiment {
        persona_text: String,
        channel: String,
        variants: Vec<String>,
    },
    Analytics {
        campaign_results: String,
        customer_text: String,
    },
}

impl CapabilityRequest {
    pub fn capability(&self) -> Capability {
        match self {
            CapabilityRequest::Research { .. } => Capability::Research,
            CapabilityRequest::Persona { .. } => Capability::Persona,
            CapabilityRequest::Content { .. } => Capability::Content,
            CapabilityRequest::Experiment { .. } => Capability::Experiment,
            CapabilityRequest::Analytics { .. } => Capability::Analytics,
        }
    }

    /// The fault for a request that reached the wrong agent.
    pub fn mismatch(&self, agent: Capability) -> AgentFault {
        AgentFault::WrongRequest {
            capability: agent.as_str(),
            received: self.capability().as_str(),
        }
    }
}

/// A leaf agent: one role prompt, one generation call, a structured parse
/// with a documented fallback and a best-effort memory write.
///
/// Malformed model output is never an error; the agent returns its fallback
/// shape instead. Generation faults may propagate as [`AgentFault`].
#[async_trait]
pub trait CapabilityAgent: Send + Sync {
    fn capability(&self) -> Capability;

    async fn invoke(&self, request: CapabilityRequest) -> Result<serde_json::Value, AgentFault>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_table_covers_every_capability() {
        for capability in Capability::ALL {
            assert_eq!(Capability::from_action(capability.action_name()), Some(capability));
        }
    }

    #[test]
    fn analysis_alias_routes_to_analytics() {
        assert_eq!(
            Capability::from_action("call_analysis_agent"),
            Some(Capability::Analytics)
        );
        assert_eq!(Capability::from_action("unknown"), None);
        assert_eq!(Capability::from_action("call_branding_agent"), None);
    }

    #[test]
    fn mismatched_request_is_a_fault() {
        let request = CapabilityRequest::Content {
            product_text: "p".into(),
            persona_text: String::new(),
            channel: String::new(),
        };
        let err = request.mismatch(Capability::Persona);
        assert_eq!(err.to_string(), "persona agent cannot handle a content request");
    }
}
