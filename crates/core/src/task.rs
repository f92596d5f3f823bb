//! Per-request inputs: the free-text [`Task`] and the caller's [`Payload`].

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

/// The raw user request. Never blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Task(String);

impl Task {
    pub fn new(text: impl Into<String>) -> Result<Self, PipelineError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(PipelineError::EmptyTask);
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Task {
    type Error = PipelineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Task> for String {
    fn from(task: Task) -> Self {
        task.0
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The fixed superset of fields a caller may supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadField {
    ProductText,
    CompetitorText,
    MarketText,
    PersonaText,
    Channel,
    Variants,
    CampaignResults,
    CustomerText,
}

impl PayloadField {
    pub const ALL: [PayloadField; 8] = [
        PayloadField::ProductText,
        PayloadField::CompetitorText,
        PayloadField::MarketText,
        PayloadField::PersonaText,
        PayloadField::Channel,
        PayloadField::Variants,
        PayloadField::CampaignResults,
        PayloadField::CustomerText,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PayloadField::ProductText => "product_text",
            PayloadField::CompetitorText => "competitor_text",
            PayloadField::MarketText => "market_text",
            PayloadField::PersonaText => "persona_text",
            PayloadField::Channel => "channel",
            PayloadField::Variants => "variants",
            PayloadField::CampaignResults => "campaign_results",
            PayloadField::CustomerText => "customer_text",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }
}

/// Caller-supplied inputs for the chosen capability.
///
/// A field counts as present when it was supplied at all, even if empty;
/// values are not type-checked against what a capability expects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competitor_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variants: Option<Vec<String>>,
    /// Free text or a JSON document of campaign metrics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_results: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_text: Option<String>,
}

impl Payload {
    pub fn has(&self, field: PayloadField) -> bool {
        match field {
            PayloadField::ProductText => self.product_text.is_some(),
            PayloadField::CompetitorText => self.competitor_text.is_some(),
            PayloadField::MarketText => self.market_text.is_some(),
            PayloadField::PersonaText => self.persona_text.is_some(),
            PayloadField::Channel => self.channel.is_some(),
            PayloadField::Variants => self.variants.is_some(),
            PayloadField::CampaignResults => self
                .campaign_results
                .as_ref()
                .is_some_and(|v| !v.is_null()),
            PayloadField::CustomerText => self.customer_text.is_some(),
        }
    }

    /// Whether a field named by a routing decision is present. Names outside
    /// the fixed superset are never present.
    pub fn has_named(&self, name: &str) -> bool {
        PayloadField::from_name(name).is_some_and(|f| self.has(f))
    }

    /// Names of the supplied fields, in declaration order.
    pub fn present_fields(&self) -> Vec<&'static str> {
        PayloadField::ALL
            .into_iter()
            .filter(|f| self.has(*f))
            .map(PayloadField::as_str)
            .collect()
    }

    /// Fields from `required` that are not present, in `required` order.
    pub fn missing<'a>(&self, required: &'a [String]) -> Vec<&'a str> {
        required
            .iter()
            .map(String::as_str)
            .filter(|name| !self.has_named(name))
            .collect()
    }

    pub fn text(&self, field: PayloadField) -> String {
        let value = match field {
            PayloadField::ProductText => &self.product_text,
            PayloadField::CompetitorText => &self.competitor_text,
            PayloadField::MarketText => &self.market_text,
            PayloadField::PersonaText => &self.persona_text,
            PayloadField::Channel => &self.channel,
            PayloadField::CustomerText => &self.customer_text,
            PayloadField::Variants => return self.variants().join("\n"),
            PayloadField::CampaignResults => return self.campaign_results_text(),
        };
        value.clone().unwrap_or_default()
    }

    pub fn variants(&self) -> Vec<String> {
        self.variants.clone().unwrap_or_default()
    }

    /// Campaign results as prompt text: strings verbatim, anything else as
    /// pretty JSON, absent as empty.
    pub fn campaign_results_text(&self) -> String {
        match &self.campaign_results {
            None | Some(serde_json::Value::Null) => String::new(),
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => serde_json::to_string_pretty(other).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_task_rejected() {
        assert!(Task::new("   ").is_err());
        assert!(serde_json::from_str::<Task>(r#""""#).is_err());
        assert_eq!(Task::new("plan a launch").unwrap().as_str(), "plan a launch");
    }

    #[test]
    fn missing_preserves_required_order() {
        let payload = Payload {
            product_text: Some("bottle".into()),
            ..Payload::default()
        };
        let required = vec![
            "market_text".to_string(),
            "product_text".to_string(),
            "budget".to_string(),
        ];
        assert_eq!(payload.missing(&required), vec!["market_text", "budget"]);
    }

    #[test]
    fn empty_string_counts_as_present() {
        let payload = Payload {
            channel: Some(String::new()),
            ..Payload::default()
        };
        assert!(payload.has_named("channel"));
        assert!(!payload.has_named("persona_text"));
    }

    #[test]
    fn null_campaign_results_is_absent() {
        let payload: Payload = serde_json::from_value(json!({"campaign_results": null})).unwrap();
        assert!(!payload.has(PayloadField::CampaignResults));
        assert!(payload.present_fields().is_empty());
    }

    #[test]
    fn campaign_results_json_rendered_as_text() {
        let payload = Payload {
            campaign_results: Some(json!({"clicks": 120})),
            ..Payload::default()
        };
        assert!(payload.campaign_results_text().contains("\"clicks\": 120"));
        assert_eq!(payload.text(PayloadField::CampaignResults), payload.campaign_results_text());
    }

    #[test]
    fn field_names_roundtrip() {
        for field in PayloadField::ALL {
            assert_eq!(PayloadField::from_name(field.as_str()), Some(field));
        }
        assert_eq!(PayloadField::from_name("budget"), None);
    }
}
