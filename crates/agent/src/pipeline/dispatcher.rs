//! Routes a decision to exactly one capability agent.

use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, warn};
use uhpm_core::capability::{Capability, CapabilityAgent, CapabilityRequest};
use uhpm_core::decision::{Decision, ErrorDecision, RoutingDecision};
use uhpm_core::envelope::DispatchResult;
use uhpm_core::error::AgentFault;
use uhpm_core::task::{Payload, PayloadField};

/// Capability registry plus the dispatch rules.
///
/// Every routed decision ends in a [`DispatchResult`]; agent faults and
/// panics are caught here and never escape [`Dispatcher::run`].
#[derive(Default)]
pub struct Dispatcher {
    agents: HashMap<Capability, Arc<dyn CapabilityAgent>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent under the capability it reports. Replaces any
    /// agent already registered for that capability.
    pub fn register(&mut self, agent: Arc<dyn CapabilityAgent>) {
        let capability = agent.capability();
        if self.agents.insert(capability, agent).is_some() {
            warn!(%capability, "Replaced registered agent");
        }
    }

    pub fn with_agent(mut self, agent: Arc<dyn CapabilityAgent>) -> Self {
        self.register(agent);
        self
    }

    pub fn capabilities(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|c| self.agents.contains_key(c))
            .collect()
    }

    /// Dispatch a decision. An [`ErrorDecision`] comes back unchanged as
    /// `Err` and nothing is invoked.
    pub async fn run(
        &self,
        decision: &Decision,
        payload: &Payload,
    ) -> Result<DispatchResult, ErrorDecision> {
        match decision {
            Decision::Error(error) => Err(error.clone()),
            Decision::Route(route) => Ok(self.route(route, payload).await),
        }
    }

    async fn route(&self, decision: &RoutingDecision, payload: &Payload) -> DispatchResult {
        info!(
            task_type = ?decision.task_type,
            action = %decision.action,
            "Dispatching"
        );

        let missing = payload.missing(&decision.inputs_needed);
        if !missing.is_empty() {
            info!(?missing, "Waiting for inputs");
            return DispatchResult::WaitingForInputs {
                missing_inputs: missing.into_iter().map(String::from).collect(),
                required: decision.inputs_needed.clone(),
            };
        }

        let Some(capability) = Capability::from_action(&decision.action) else {
            warn!(action = %decision.action, "Unknown action");
            return DispatchResult::UnknownAction {
                action: decision.action.clone(),
                decision: decision.clone(),
            };
        };

        let Some(agent) = self.agents.get(&capability) else {
            error!(%capability, "No agent registered");
            return DispatchResult::AgentError {
                error: format!("no {capability} agent is registered"),
                trace: format!("action `{}` maps to an unregistered capability", decision.action),
            };
        };

        let request = build_request(capability, payload);
        match invoke_guarded(agent.as_ref(), capability, request).await {
            Ok(result) => {
                info!(%capability, "Capability finished");
                DispatchResult::done(capability, result)
            }
            Err(fault) => {
                error!(%capability, error = %fault, "Capability failed");
                DispatchResult::AgentError {
                    error: fault.to_string(),
                    trace: fault.trace(),
                }
            }
        }
    }
}

/// Extract one capability's arguments. Absent fields become empty.
fn build_request(capability: Capability, payload: &Payload) -> CapabilityRequest {
    let text = |field| payload.text(field);
    match capability {
        Capability::Research => CapabilityRequest::Research {
            product_text: text(PayloadField::ProductText),
            competitor_text: text(PayloadField::CompetitorText),
        },
        Capability::Persona => CapabilityRequest::Persona {
            product_text: text(PayloadField::ProductText),
            market_text: text(PayloadField::MarketText),
        },
        Capability::Content => CapabilityRequest::Content {
            product_text: text(PayloadField::ProductText),
            persona_text: text(PayloadField::PersonaText),
            channel: text(PayloadField::Channel),
        },
        Capability::Experiment => CapabilityRequest::Experiment {
            persona_text: text(PayloadField::PersonaText),
            channel: text(PayloadField::Channel),
            variants: payload.variants(),
        },
        Capability::Analytics => CapabilityRequest::Analytics {
            campaign_results: payload.campaign_results_text(),
            customer_text: text(PayloadField::CustomerText),
        },
    }
}

async fn invoke_guarded(
    agent: &dyn CapabilityAgent,
    capability: Capability,
    request: CapabilityRequest,
) -> Result<serde_json::Value, AgentFault> {
    match AssertUnwindSafe(agent.invoke(request)).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic) => Err(AgentFault::Panicked {
            capability: capability.as_str(),
            message: panic_message(panic.as_ref()),
        }),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{StubAgent, StubBehaviour};
    use serde_json::json;
    use uhpm_core::decision::{DecisionErrorReason, TaskType};

    fn route(action: &str, inputs: &[&str]) -> Decision {
        Decision::Route(RoutingDecision {
            task_type: TaskType::Persona,
            reasoning: "test".into(),
            action: action.into(),
            inputs_needed: inputs.iter().map(|s| s.to_string()).collect(),
        })
    }

    fn full_payload() -> Payload {
        Payload {
            product_text: Some("Steel bottle".into()),
            competitor_text: Some("Brand X".into()),
            market_text: Some("EU cyclists".into()),
            persona_text: Some("Commuter Claire".into()),
            channel: Some("email".into()),
            variants: Some(vec!["A".into(), "B".into()]),
            campaign_results: Some(json!({"ctr": 0.02})),
            customer_text: Some("Lid leaks".into()),
        }
    }

    fn stubs() -> (Dispatcher, Vec<Arc<StubAgent>>) {
        let agents: Vec<Arc<StubAgent>> = Capability::ALL
            .into_iter()
            .map(|c| Arc::new(StubAgent::replying(c, json!({"from": c.as_str()}))))
            .collect();
        let mut dispatcher = Dispatcher::new();
        for agent in &agents {
            dispatcher.register(agent.clone());
        }
        (dispatcher, agents)
    }

    #[tokio::test]
    async fn missing_inputs_wait_without_invoking() {
        let (dispatcher, agents) = stubs();
        let payload = Payload {
            product_text: Some("Steel bottle".into()),
            ..Payload::default()
        };
        let result = dispatcher
            .run(&route("call_persona_agent", &["product_text", "market_text"]), &payload)
            .await
            .unwrap();

        assert_eq!(
            result,
            DispatchResult::WaitingForInputs {
                missing_inputs: vec!["market_text".into()],
                required: vec!["product_text".into(), "market_text".into()],
            }
        );
        assert!(agents.iter().all(|a| a.calls() == 0));
    }

    #[tokio::test]
    async fn empty_string_counts_as_present() {
        let (dispatcher, _) = stubs();
        let payload = Payload {
            product_text: Some(String::new()),
            ..Payload::default()
        };
        let result = dispatcher
            .run(&route("call_research_agent", &["product_text"]), &payload)
            .await
            .unwrap();
        assert_eq!(result.status(), "research_done");
    }

    #[tokio::test]
    async fn every_action_invokes_its_capability_once() {
        for capability in Capability::ALL {
            let (dispatcher, agents) = stubs();
            let result = dispatcher
                .run(&route(capability.action_name(), &[]), &full_payload())
                .await
                .unwrap();

            assert_eq!(result.status(), format!("{capability}_done"));
            assert_eq!(result.result(), Some(&json!({"from": capability.as_str()})));
            for agent in &agents {
                let expected = usize::from(agent.capability() == capability);
                assert_eq!(agent.calls(), expected, "{capability}");
            }
        }
    }

    #[tokio::test]
    async fn analysis_alias_reaches_analytics() {
        let (dispatcher, agents) = stubs();
        let result = dispatcher
            .run(&route("call_analysis_agent", &["campaign_results"]), &full_payload())
            .await
            .unwrap();
        assert_eq!(result.status(), "analytics_done");

        let analytics = agents.iter().find(|a| a.capability() == Capability::Analytics).unwrap();
        match analytics.last_request().unwrap() {
            CapabilityRequest::Analytics {
                campaign_results,
                customer_text,
            } => {
                assert!(campaign_results.contains("\"ctr\""));
                assert_eq!(customer_text, "Lid leaks");
            }
            other => panic!("unexpected request {other:?}"),
        }
    }

    #[tokio::test]
    async fn absent_optional_fields_default_to_empty() {
        let (dispatcher, agents) = stubs();
        let payload = Payload {
            persona_text: Some("Claire".into()),
            ..Payload::default()
        };
        dispatcher
            .run(&route("call_experiment_agent", &["persona_text"]), &payload)
            .await
            .unwrap();

        let experiment = agents.iter().find(|a| a.capability() == Capability::Experiment).unwrap();
        assert_eq!(
            experiment.last_request(),
            Some(CapabilityRequest::Experiment {
                persona_text: "Claire".into(),
                channel: String::new(),
                variants: Vec::new(),
            })
        );
    }

    #[tokio::test]
    async fn unknown_action_carries_decision() {
        let (dispatcher, agents) = stubs();
        let decision = route("call_branding_agent", &[]);
        let result = dispatcher.run(&decision, &full_payload()).await.unwrap();

        match result {
            DispatchResult::UnknownAction { action, decision: carried } => {
                assert_eq!(action, "call_branding_agent");
                assert_eq!(Some(&carried), decision.as_route());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(agents.iter().all(|a| a.calls() == 0));
    }

    #[tokio::test]
    async fn missing_inputs_checked_before_action() {
        let (dispatcher, _) = stubs();
        let result = dispatcher
            .run(&route("unknown", &["variants"]), &Payload::default())
            .await
            .unwrap();
        assert_eq!(result.status(), "waiting_for_inputs");
    }

    #[tokio::test]
    async fn agent_fault_becomes_agent_error() {
        let dispatcher = Dispatcher::new()
            .with_agent(Arc::new(StubAgent::new(Capability::Content, StubBehaviour::Fault)));
        let result = dispatcher
            .run(&route("call_content_agent", &[]), &full_payload())
            .await
            .unwrap();

        match result {
            DispatchResult::AgentError { error, trace } => {
                assert!(error.contains("upstream took too long"));
                assert!(!trace.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn agent_panic_is_contained() {
        let dispatcher = Dispatcher::new()
            .with_agent(Arc::new(StubAgent::new(Capability::Research, StubBehaviour::Panic)));
        let result = dispatcher
            .run(&route("call_research_agent", &[]), &full_payload())
            .await
            .unwrap();

        match result {
            DispatchResult::AgentError { error, trace } => {
                assert!(error.contains("stub agent exploded"));
                assert!(trace.contains("Panicked"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn unregistered_capability_is_agent_error() {
        let result = Dispatcher::new()
            .run(&route("call_persona_agent", &[]), &Payload::default())
            .await
            .unwrap();
        assert_eq!(result.status(), "agent_error");
    }

    #[tokio::test]
    async fn error_decision_is_propagated() {
        let (dispatcher, agents) = stubs();
        let error = ErrorDecision::new(DecisionErrorReason::NoResponse);
        let outcome = dispatcher
            .run(&Decision::Error(error.clone()), &full_payload())
            .await;
        assert_eq!(outcome, Err(error));
        assert!(agents.iter().all(|a| a.calls() == 0));
    }
}
