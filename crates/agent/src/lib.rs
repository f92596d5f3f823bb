//! The UHPM marketing agents and the pipeline that routes to them.
//!
//! A request flows through three stages:
//!
//! 1. **Reason**: the [`Reasoner`] classifies the task into a routing
//!    decision, using related records from memory and one repair round for
//!    malformed replies
//! 2. **Dispatch**: the [`Dispatcher`] checks the decision's required inputs
//!    against the payload and invokes exactly one capability agent
//! 3. **Record**: the [`PipelineRunner`] writes the run to memory
//!
//! The whole chain runs under one timeout.

pub mod capabilities;
pub mod pipeline;
pub mod services;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use capabilities::{
    AnalyticsAgent, CampaignInsights, ContentAgent, ContentDraft, ExperimentAgent,
    ExperimentReport, PersonaAgent, PersonaProfile, PlannerAgent, ResearchAgent, ResearchReport,
    TaskPlan, VariantScore,
};
pub use pipeline::{Dispatcher, PipelineRun, PipelineRunner, Reasoner};
pub use services::Services;
