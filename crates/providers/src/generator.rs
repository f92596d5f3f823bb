//! [`GenerationPort`] adapter over any [`Provider`].

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use uhpm_core::error::ProviderError;
use uhpm_core::generation::GenerationPort;
use uhpm_core::message::Message;
use uhpm_core::provider::{Provider, ProviderRequest};

/// Sends each prompt as a single user message with fixed sampling settings.
pub struct ProviderGenerator {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl ProviderGenerator {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Build a generator for the configured default provider and model.
    pub fn from_config(config: &uhpm_config::AppConfig) -> Result<Self, ProviderError> {
        let router = crate::router::build_from_config(config);
        let provider = router.default().ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "default provider '{}' is not registered",
                config.default_provider
            ))
        })?;

        Ok(Self::new(provider, &config.default_model)
            .with_temperature(config.default_temperature)
            .with_max_tokens(config.default_max_tokens))
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }
}

#[async_trait]
impl GenerationPort for ProviderGenerator {
    async fn generate(&self, prompt: &str) -> Result<Option<String>, ProviderError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: vec![Message::user(prompt)],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self.provider.complete(request).await?;
        let content = response.message.content;
        debug!(
            provider = %self.provider.name(),
            model = %response.model,
            chars = content.len(),
            "Generation complete"
        );

        if content.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(content))
        }
    }
}
