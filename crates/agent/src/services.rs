//! Startup wiring: the ports and agents are built once here and shared by
//! every request.

use crate::capabilities::{
    AnalyticsAgent, ContentAgent, ExperimentAgent, PersonaAgent, PlannerAgent, ResearchAgent,
};
use crate::pipeline::{Dispatcher, PipelineRunner, Reasoner};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uhpm_config::AppConfig;
use uhpm_core::generation::GenerationPort;
use uhpm_core::memory::MemoryBackend;
use uhpm_providers::ProviderGenerator;

/// Everything a front end needs to serve requests.
pub struct Services {
    pub generator: Arc<dyn GenerationPort>,
    pub memory: Arc<dyn MemoryBackend>,
    pub research: Arc<ResearchAgent>,
    pub planner: PlannerAgent,
    pub runner: PipelineRunner,
}

impl Services {
    /// Wire the five capability agents, the planner and the pipeline around
    /// one generation port and one memory store.
    pub fn new(
        generator: Arc<dyn GenerationPort>,
        memory: Arc<dyn MemoryBackend>,
        context_k: usize,
        timeout: Duration,
    ) -> Self {
        let research = Arc::new(ResearchAgent::new(generator.clone(), memory.clone()));

        let dispatcher = Dispatcher::new()
            .with_agent(research.clone())
            .with_agent(Arc::new(PersonaAgent::new(generator.clone(), memory.clone())))
            .with_agent(Arc::new(ContentAgent::new(generator.clone(), memory.clone())))
            .with_agent(Arc::new(ExperimentAgent::new(generator.clone(), memory.clone())))
            .with_agent(Arc::new(AnalyticsAgent::new(generator.clone(), memory.clone())));

        let reasoner = Reasoner::new(generator.clone(), memory.clone(), context_k);
        let runner = PipelineRunner::new(reasoner, dispatcher, memory.clone()).with_timeout(timeout);

        Self {
            planner: PlannerAgent::new(generator.clone()),
            generator,
            memory,
            research,
            runner,
        }
    }

    /// Build the provider-backed generator and the configured memory store.
    pub fn from_config(config: &AppConfig) -> Result<Self, uhpm_core::Error> {
        let generator = ProviderGenerator::from_config(config)?;
        let provider = generator.provider().clone();
        let memory = uhpm_memory::build_from_config(config, Some(provider))?;

        info!(
            provider = %config.default_provider,
            model = %config.default_model,
            memory = memory.name(),
            "Services ready"
        );

        Ok(Self::new(
            Arc::new(generator),
            memory,
            config.pipeline.context_k,
            config.pipeline.timeout(),
        ))
    }
}
