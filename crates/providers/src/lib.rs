//! LLM Provider implementations for UHPM.
//!
//! All providers implement the `uhpm_core::Provider` trait.
//! The router selects the correct provider based on configuration, and
//! [`ProviderGenerator`] narrows a provider to the Generation Port.

pub mod generator;
pub mod openai_compat;
pub mod router;

pub use generator::ProviderGenerator;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};
