//! # UHPM Core
//!
//! Domain types, port traits, and error definitions for the UHPM marketing
//! agent pipeline. This crate has **zero framework dependencies**: it defines
//! the model that the provider, memory, agent and gateway crates implement
//! against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with scripted stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod capability;
pub mod decision;
pub mod envelope;
pub mod error;
pub mod generation;
pub mod memory;
pub mod message;
pub mod provider;
pub mod task;

// Re-export key types at crate root for ergonomics
pub use capability::{Capability, CapabilityAgent, CapabilityRequest};
pub use decision::{Decision, DecisionErrorReason, ErrorDecision, RoutingDecision, TaskType};
pub use envelope::DispatchResult;
pub use error::{AgentFault, Error, MemoryError, PipelineError, ProviderError, Result};
pub use generation::{Generated, GenerationPort};
pub use memory::{MemoryBackend, MemoryEntry, MemoryHit, Tags};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
pub use task::{Payload, PayloadField, Task};
