//! Shared test doubles for the agent crate.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use uhpm_core::capability::{Capability, CapabilityAgent, CapabilityRequest};
use uhpm_core::error::{AgentFault, MemoryError, ProviderError};
use uhpm_core::generation::GenerationPort;
use uhpm_core::memory::{MemoryBackend, MemoryEntry, MemoryHit, Tags};

/// A generator that replays a script of replies and records every prompt.
///
/// Panics if more calls are made than replies provided.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Option<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<Option<&str>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| r.map(String::from)).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// One reply.
    pub fn single(reply: &str) -> Self {
        Self::new(vec![Some(reply)])
    }

    /// One empty reply.
    pub fn silent() -> Self {
        Self::new(vec![None])
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationPort for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<Option<String>, ProviderError> {
        let reply = self.replies.lock().unwrap().pop_front();
        let call = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            prompts.len()
        };
        match reply {
            Some(reply) => Ok(reply),
            None => panic!("ScriptedGenerator: no more replies (call #{call})"),
        }
    }
}

/// A generator whose backend is always unreachable.
pub struct FailingGenerator;

#[async_trait]
impl GenerationPort for FailingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<Option<String>, ProviderError> {
        Err(ProviderError::Network("connection refused".into()))
    }
}

/// A generator that never answers.
pub struct HangingGenerator;

#[async_trait]
impl GenerationPort for HangingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<Option<String>, ProviderError> {
        std::future::pending().await
    }
}

/// A memory store where every operation fails.
pub struct FailingMemory;

#[async_trait]
impl MemoryBackend for FailingMemory {
    fn name(&self) -> &str {
        "failing"
    }

    async fn store(&self, _text: &str, _tags: Tags) -> Result<String, MemoryError> {
        Err(MemoryError::Storage("disk full".into()))
    }

    async fn query(&self, _text: &str, _k: usize) -> Result<Vec<MemoryHit>, MemoryError> {
        Err(MemoryError::QueryFailed("index unavailable".into()))
    }

    async fn get(&self, _id: &str) -> Result<Option<MemoryEntry>, MemoryError> {
        Err(MemoryError::QueryFailed("index unavailable".into()))
    }

    async fn count(&self) -> Result<usize, MemoryError> {
        Err(MemoryError::QueryFailed("index unavailable".into()))
    }
}

/// How a [`StubAgent`] behaves when invoked.
pub enum StubBehaviour {
    Reply(Value),
    Fault,
    Panic,
}

/// A capability agent that records its requests.
pub struct StubAgent {
    capability: Capability,
    behaviour: StubBehaviour,
    calls: AtomicUsize,
    last: Mutex<Option<CapabilityRequest>>,
}

impl StubAgent {
    pub fn new(capability: Capability, behaviour: StubBehaviour) -> Self {
        Self {
            capability,
            behaviour,
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        }
    }

    pub fn replying(capability: Capability, value: Value) -> Self {
        Self::new(capability, StubBehaviour::Reply(value))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CapabilityRequest> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl CapabilityAgent for StubAgent {
    fn capability(&self) -> Capability {
        self.capability
    }

    async fn invoke(&self, request: CapabilityRequest) -> Result<Value, AgentFault> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(request);
        match &self.behaviour {
            StubBehaviour::Reply(value) => Ok(value.clone()),
            StubBehaviour::Fault => Err(AgentFault::Generation(ProviderError::Timeout(
                "upstream took too long".into(),
            ))),
            StubBehaviour::Panic => panic!("stub agent exploded"),
        }
    }
}
