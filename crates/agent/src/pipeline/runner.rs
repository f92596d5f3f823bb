//! One pipeline run: reason, dispatch, record.

use super::{Dispatcher, Reasoner};
use serde::Serialize;
use serde_json::json;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uhpm_core::decision::Decision;
use uhpm_core::envelope::DispatchResult;
use uhpm_core::error::PipelineError;
use uhpm_core::memory::{MemoryBackend, tags};
use uhpm_core::task::{Payload, Task};

/// Default wall-clock limit for a whole run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// The record of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineRun {
    pub task: Task,
    pub reasoning: Decision,
    /// `None` when reasoning ended in an error decision.
    pub dispatch: Option<DispatchResult>,
}

impl PipelineRun {
    /// The dispatch status, or `reasoning_failed` when nothing was dispatched.
    pub fn status(&self) -> &'static str {
        self.dispatch
            .as_ref()
            .map_or("reasoning_failed", DispatchResult::status)
    }
}

pub struct PipelineRunner {
    reasoner: Reasoner,
    dispatcher: Dispatcher,
    memory: Arc<dyn MemoryBackend>,
    timeout: Duration,
    /// Run records still being written.
    pending: Mutex<JoinSet<()>>,
}

impl PipelineRunner {
    pub fn new(reasoner: Reasoner, dispatcher: Dispatcher, memory: Arc<dyn MemoryBackend>) -> Self {
        Self {
            reasoner,
            dispatcher,
            memory,
            timeout: DEFAULT_TIMEOUT,
            pending: Mutex::new(JoinSet::new()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Run with the configured timeout.
    pub async fn run(&self, task: Task, payload: Payload) -> Result<PipelineRun, PipelineError> {
        self.run_with_timeout(task, payload, self.timeout).await
    }

    /// Run under an explicit timeout. On expiry the in-flight work is
    /// dropped and nothing is recorded.
    pub async fn run_with_timeout(
        &self,
        task: Task,
        payload: Payload,
        timeout: Duration,
    ) -> Result<PipelineRun, PipelineError> {
        match tokio::time::timeout(timeout, self.execute(task, &payload)).await {
            Ok(run) => {
                self.record(&run);
                info!(status = run.status(), "Pipeline run finished");
                Ok(run)
            }
            Err(_) => {
                let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(timeout_ms, "Pipeline run timed out");
                Err(PipelineError::Timeout { timeout_ms })
            }
        }
    }

    async fn execute(&self, task: Task, payload: &Payload) -> PipelineRun {
        let reasoning = self.reasoner.decide(&task).await;
        let dispatch = self.dispatcher.run(&reasoning, payload).await.ok();
        PipelineRun {
            task,
            reasoning,
            dispatch,
        }
    }

    /// Wait for every run record still in flight.
    ///
    /// Long-lived servers never need this. One-shot callers must await it
    /// before the runtime shuts down, or the pending writes are cancelled.
    pub async fn flush(&self) {
        let mut pending = std::mem::take(&mut *self.lock_pending());
        while let Some(joined) = pending.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Run record task failed");
            }
        }
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, JoinSet<()>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write the run record in the background. Failures are only logged.
    fn record(&self, run: &PipelineRun) {
        let text = json!({
            "task": run.task,
            "decision": run.reasoning,
            "result": run.dispatch,
        })
        .to_string();
        let status = run.status();
        let memory = Arc::clone(&self.memory);

        let mut pending = self.lock_pending();
        while pending.try_join_next().is_some() {}
        pending.spawn(async move {
            match memory
                .store(&text, tags([("type", "pipeline_run"), ("status", status)]))
                .await
            {
                Ok(id) => debug!(id = %id, "Pipeline run recorded"),
                Err(e) => warn!(error = %e, "Failed to record pipeline run"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::PersonaAgent;
    use crate::pipeline::reasoner::DEFAULT_CONTEXT_K;
    use crate::test_helpers::{FailingMemory, HangingGenerator, ScriptedGenerator};
    use serde_json::Value;
    use uhpm_core::generation::GenerationPort;
    use uhpm_memory::InMemoryBackend;

    const PERSONA_DECISION: &str = r#"{"task_type": "persona", "reasoning": "audience", "action": "call_persona_agent", "inputs_needed": ["product_text", "market_text"]}"#;
    const PERSONA_REPLY: &str = r#"{"persona_name": "Commuter Claire", "recommended_channels": ["instagram"]}"#;

    fn runner(generator: Arc<dyn GenerationPort>, memory: Arc<dyn MemoryBackend>) -> PipelineRunner {
        let reasoner = Reasoner::new(generator.clone(), memory.clone(), DEFAULT_CONTEXT_K);
        let dispatcher =
            Dispatcher::new().with_agent(Arc::new(PersonaAgent::new(generator, memory.clone())));
        PipelineRunner::new(reasoner, dispatcher, memory)
    }

    fn task() -> Task {
        Task::new("Build a persona for the steel bottle").unwrap()
    }

    #[tokio::test]
    async fn missing_market_text_waits() {
        let generator = Arc::new(ScriptedGenerator::single(PERSONA_DECISION));
        let payload = Payload {
            product_text: Some("Steel bottle".into()),
            ..Payload::default()
        };
        let run = runner(generator.clone(), Arc::new(InMemoryBackend::new()))
            .run(task(), payload)
            .await
            .unwrap();

        let dispatch = serde_json::to_value(run.dispatch.as_ref().unwrap()).unwrap();
        assert_eq!(dispatch["status"], "waiting_for_inputs");
        assert_eq!(dispatch["missing_inputs"], json!(["market_text"]));
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn complete_payload_reaches_persona_agent() {
        let generator = Arc::new(ScriptedGenerator::new(vec![
            Some(PERSONA_DECISION),
            Some(PERSONA_REPLY),
        ]));
        let memory = Arc::new(InMemoryBackend::new());
        let payload = Payload {
            product_text: Some("Steel bottle".into()),
            market_text: Some("EU cyclists".into()),
            ..Payload::default()
        };
        let pipeline = runner(generator.clone(), memory.clone());
        let run = pipeline.run(task(), payload).await.unwrap();

        assert_eq!(run.status(), "persona_done");
        let result = run.dispatch.as_ref().and_then(DispatchResult::result).unwrap();
        assert_eq!(result["persona_name"], "Commuter Claire");

        pipeline.flush().await;
        let kinds: Vec<String> = memory
            .entries()
            .await
            .into_iter()
            .map(|e| e.tags["type"].clone())
            .collect();
        assert!(kinds.contains(&"persona".to_string()));
        assert!(kinds.contains(&"pipeline_run".to_string()));
    }

    #[tokio::test]
    async fn reasoning_failure_skips_dispatch() {
        let generator = Arc::new(ScriptedGenerator::silent());
        let run = runner(generator, Arc::new(InMemoryBackend::new()))
            .run(task(), Payload::default())
            .await
            .unwrap();

        assert!(run.dispatch.is_none());
        assert_eq!(run.status(), "reasoning_failed");
        let value = serde_json::to_value(&run).unwrap();
        assert_eq!(value["reasoning"]["error"], "no_response");
        assert_eq!(value["dispatch"], Value::Null);
    }

    #[tokio::test]
    async fn run_record_tags_status() {
        let memory = Arc::new(InMemoryBackend::new());
        let generator = Arc::new(ScriptedGenerator::silent());
        let pipeline = runner(generator, memory.clone());
        pipeline.run(task(), Payload::default()).await.unwrap();

        pipeline.flush().await;
        let stored = memory.entries().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].tags["status"], "reasoning_failed");
        assert!(stored[0].content.contains("Build a persona"));
    }

    #[tokio::test]
    async fn record_failure_does_not_fail_the_run() {
        let generator = Arc::new(ScriptedGenerator::single(PERSONA_DECISION));
        let pipeline = runner(generator, Arc::new(FailingMemory));
        let run = pipeline.run(task(), Payload::default()).await.unwrap();
        pipeline.flush().await;
        assert_eq!(run.status(), "waiting_for_inputs");
    }

    #[test]
    fn flushed_record_survives_runtime_shutdown() {
        let memory = Arc::new(InMemoryBackend::new());
        let generator = Arc::new(ScriptedGenerator::single(PERSONA_DECISION));
        let pipeline = runner(generator, memory.clone());

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let status = runtime.block_on(async {
            let run = pipeline.run(task(), Payload::default()).await.unwrap();
            pipeline.flush().await;
            run.status()
        });
        drop(runtime);

        assert_eq!(status, "waiting_for_inputs");
        let reader = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let stored = reader.block_on(memory.entries());
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].tags["type"], "pipeline_run");
    }

    #[tokio::test]
    async fn flush_without_runs_returns() {
        let pipeline = runner(
            Arc::new(ScriptedGenerator::silent()),
            Arc::new(InMemoryBackend::new()),
        );
        pipeline.flush().await;
        pipeline.flush().await;
    }

    #[tokio::test]
    async fn hanging_generation_times_out() {
        let err = runner(Arc::new(HangingGenerator), Arc::new(InMemoryBackend::new()))
            .run_with_timeout(task(), Payload::default(), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Timeout { timeout_ms: 20 }));
    }
}
