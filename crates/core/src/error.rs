//! Error types for the UHPM domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all UHPM operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Memory errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Capability agent faults ---
    #[error("Agent fault: {0}")]
    Agent(#[from] AgentFault),

    // --- Pipeline errors ---
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),
}

/// A fault raised while a capability agent was running.
///
/// Malformed model output is never a fault (agents fall back to a documented
/// shape); these are the failures the dispatcher has to absorb.
#[derive(Debug, Error)]
pub enum AgentFault {
    #[error("generation call failed: {0}")]
    Generation(#[from] ProviderError),

    #[error("{capability} agent cannot handle a {received} request")]
    WrongRequest {
        capability: &'static str,
        received: &'static str,
    },

    #[error("failed to encode {capability} result: {source}")]
    Encode {
        capability: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{capability} agent panicked: {message}")]
    Panicked {
        capability: &'static str,
        message: String,
    },
}

impl AgentFault {
    /// Render the fault together with its `source()` chain.
    pub fn trace(&self) -> String {
        let mut trace = format!("{self:?}");
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            trace.push_str("\ncaused by: ");
            trace.push_str(&cause.to_string());
            source = cause.source();
        }
        trace
    }
}

/// Failures of a whole pipeline run. These are the only outcomes that are
/// not expressed as an envelope.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("task must not be empty")]
    EmptyTask,

    #[error("pipeline run timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn agent_fault_trace_includes_cause() {
        let fault = AgentFault::Encode {
            capability: "persona",
            source: serde_json::from_str::<serde_json::Value>("{").unwrap_err(),
        };
        let trace = fault.trace();
        assert!(trace.contains("Encode"));
        assert!(trace.contains("caused by: EOF"));
    }

    #[test]
    fn timeout_reports_budget() {
        let err = PipelineError::Timeout { timeout_ms: 1500 };
        assert_eq!(err.to_string(), "pipeline run timed out after 1500ms");
    }
}
