//! Marketing copy generation.

use super::{encode, generate, or_na, remember};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use uhpm_core::capability::{Capability, CapabilityAgent, CapabilityRequest};
use uhpm_core::error::AgentFault;
use uhpm_core::generation::GenerationPort;
use uhpm_core::memory::{MemoryBackend, tags};

const DEFAULT_CHANNEL: &str = "social_media";
const NO_CONTENT: &str = "No content could be generated";

/// Generated copy for one channel. The copy itself is free text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentDraft {
    pub channel: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct ContentAgent {
    generator: Arc<dyn GenerationPort>,
    memory: Arc<dyn MemoryBackend>,
}

impl ContentAgent {
    pub fn new(generator: Arc<dyn GenerationPort>, memory: Arc<dyn MemoryBackend>) -> Self {
        Self { generator, memory }
    }

    /// Write channel-specific copy for a product and persona.
    ///
    /// An empty `channel` means `social_media`.
    pub async fn generate_content(
        &self,
        product_text: &str,
        persona_text: &str,
        channel: &str,
    ) -> Result<ContentDraft, AgentFault> {
        let channel = match channel.trim() {
            "" => DEFAULT_CHANNEL,
            c => c,
        };

        let prompt = format!(
            r#"You are a senior marketing content writer.
Create high-converting content for the following.

Product:
{product_text}

Target persona:
{persona}

Channel:
{channel}

The output should include:
- The copy itself
- Structure and headings where the channel allows
- An optional call to action
- A tone suited to the persona"#,
            persona = or_na(persona_text),
        );

        let Some(reply) = generate(self.generator.as_ref(), &prompt).await? else {
            warn!(channel, "Content agent got no reply");
            return Ok(ContentDraft {
                channel: channel.to_string(),
                content: String::new(),
                error: Some(NO_CONTENT.into()),
            });
        };

        remember(
            self.memory.as_ref(),
            &reply,
            tags([
                ("type", "content"),
                ("product_text", product_text),
                ("persona_text", persona_text),
                ("channel", channel),
            ]),
        )
        .await;
        info!(channel, "Content generated");

        Ok(ContentDraft {
            channel: channel.to_string(),
            content: reply,
            error: None,
        })
    }
}

#[async_trait]
impl CapabilityAgent for ContentAgent {
    fn capability(&self) -> Capability {
        Capability::Content
    }

    async fn invoke(&self, request: CapabilityRequest) -> Result<Value, AgentFault> {
        match request {
            CapabilityRequest::Content {
                product_text,
                persona_text,
                channel,
            } => {
                let draft = self
                    .generate_content(&product_text, &persona_text, &channel)
                    .await?;
                encode("content", &draft)
            }
            other => Err(other.mismatch(Capability::Content)),
        }
    }
}
