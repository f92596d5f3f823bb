//! Routing decisions produced by the reasoner.
//!
//! A [`Decision`] is either a validated [`RoutingDecision`] or a terminal
//! [`ErrorDecision`]. Only the former can be dispatched.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Task category named by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum TaskType {
    Research,
    Persona,
    Content,
    Experiment,
    Analysis,
    Unknown,
}

impl From<String> for TaskType {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "research" => TaskType::Research,
            "persona" => TaskType::Persona,
            "content" => TaskType::Content,
            "experiment" => TaskType::Experiment,
            "analysis" => TaskType::Analysis,
            _ => TaskType::Unknown,
        }
    }
}

/// A validated classification of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub task_type: TaskType,
    /// Advisory only; never interpreted.
    pub reasoning: String,
    /// Action name as emitted by the model, looked up by the dispatcher.
    pub action: String,
    /// Ordered, duplicate-free field names the action requires.
    pub inputs_needed: Vec<String>,
}

/// Why a model response could not be accepted as a [`RoutingDecision`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecisionShapeError {
    #[error("response is not a JSON object")]
    NotAnObject,
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("field `{0}` must be a string")]
    NotAString(&'static str),
    #[error("`inputs_needed` must be a list of strings")]
    InputsNotAList,
}

impl RoutingDecision {
    /// Validate a parsed model response.
    ///
    /// All four fields must be present; `task_type`, `reasoning` and `action`
    /// must be strings and `inputs_needed` a list of strings. Unknown
    /// `task_type` values map to [`TaskType::Unknown`].
    pub fn from_json(value: &Value) -> Result<Self, DecisionShapeError> {
        let object = value.as_object().ok_or(DecisionShapeError::NotAnObject)?;

        let string_field = |name: &'static str| -> Result<String, DecisionShapeError> {
            match object.get(name) {
                None => Err(DecisionShapeError::MissingField(name)),
                Some(Value::String(s)) => Ok(s.clone()),
                Some(_) => Err(DecisionShapeError::NotAString(name)),
            }
        };

        let task_type = TaskType::from(string_field("task_type")?);
        let reasoning = string_field("reasoning")?;
        let action = string_field("action")?.trim().to_string();

        let raw_inputs = object
            .get("inputs_needed")
            .ok_or(DecisionShapeError::MissingField("inputs_needed"))?
            .as_array()
            .ok_or(DecisionShapeError::InputsNotAList)?;

        let mut inputs_needed: Vec<String> = Vec::with_capacity(raw_inputs.len());
        for item in raw_inputs {
            let name = item.as_str().ok_or(DecisionShapeError::InputsNotAList)?.trim();
            if !name.is_empty() && !inputs_needed.iter().any(|n| n == name) {
                inputs_needed.push(name.to_string());
            }
        }

        Ok(Self {
            task_type,
            reasoning,
            action,
            inputs_needed,
        })
    }
}

/// Reason codes for a terminal reasoning failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionErrorReason {
    /// The first generation call returned nothing.
    NoResponse,
    /// Neither the first response nor the repaired one had the required shape.
    JsonParsingFailed,
    /// The first response was malformed and the repair call returned nothing.
    NoResponseOnFallback,
    /// The generation port itself faulted.
    GenerationFailed,
}

impl DecisionErrorReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionErrorReason::NoResponse => "no_response",
            DecisionErrorReason::JsonParsingFailed => "json_parsing_failed",
            DecisionErrorReason::NoResponseOnFallback => "no_response_on_fallback",
            DecisionErrorReason::GenerationFailed => "generation_failed",
        }
    }
}

/// A terminal reasoning failure, carrying the raw texts for diagnosis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDecision {
    #[serde(rename = "error")]
    pub reason: DecisionErrorReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_first: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_fallback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorDecision {
    pub fn new(reason: DecisionErrorReason) -> Self {
        Self {
            reason,
            raw_first: None,
            raw_fallback: None,
            detail: None,
        }
    }

    pub fn with_raw_first(mut self, raw: impl Into<String>) -> Self {
        self.raw_first = Some(raw.into());
        self
    }

    pub fn with_raw_fallback(mut self, raw: impl Into<String>) -> Self {
        self.raw_fallback = Some(raw.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// The reasoner's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Decision {
    Route(RoutingDecision),
    Error(ErrorDecision),
}

impl Decision {
    pub fn as_route(&self) -> Option<&RoutingDecision> {
        match self {
            Decision::Route(route) => Some(route),
            Decision::Error(_) => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorDecision> {
        match self {
            Decision::Route(_) => None,
            Decision::Error(error) => Some(error),
        }
    }
}
