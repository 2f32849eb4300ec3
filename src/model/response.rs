//! `Response` — the persisted result object (spec §3, §6).

use serde::{Deserialize, Serialize};

use super::item::Item;
use super::request::{TextOptions, Truncation};
use super::tool::{ToolChoice, ToolDefinition};
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    InProgress,
    Completed,
    Incomplete,
    Failed,
    Cancelled,
    RequiresAction,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl Usage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
        }
    }

    pub fn add(&mut self, other: Usage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.total_tokens += other.total_tokens;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncompleteDetails {
    pub reason: String,
}

impl IncompleteDetails {
    pub fn max_output_tokens() -> Self {
        Self {
            reason: "max_output_tokens".to_string(),
        }
    }
}

/// A wire-shaped API error, embedded in a `failed` Response (spec §7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseError {
    pub code: String,
    pub message: String,
}

impl From<&ApiError> for ResponseError {
    fn from(err: &ApiError) -> Self {
        Self {
            code: err.kind.wire_code().to_string(),
            message: err.message.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: String,
    pub object: String,
    pub status: ResponseStatus,
    #[serde(default)]
    pub output: Vec<Item>,
    #[serde(default)]
    pub input: Vec<Item>,
    pub model: String,
    pub usage: Usage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_response_id: Option<String>,
    pub created_at: i64,
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
    pub tool_choice: ToolChoice,
    pub truncation: Truncation,
    pub store: bool,
    pub text: TextOptions,
    pub service_tier: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incomplete_details: Option<IncompleteDetails>,
}

impl Response {
    /// A fresh, never-shared copy with its own `output` vec. This is the
    /// snapshot rule (spec §4.5, §9): every `StreamEvent` that embeds a
    /// `Response` must embed one of these, so that later mutations to the
    /// live response can never alter bytes already written to the wire.
    pub fn snapshot(&self) -> Response {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_error_lowercases_kind_as_code() {
        let api_err = ApiError::invalid_request("model", "bad model");
        let resp_err = ResponseError::from(&api_err);
        assert_eq!(resp_err.code, "invalid_request");
    }

    #[test]
    fn usage_add_sums_fields() {
        let mut total = Usage::new(10, 5);
        total.add(Usage::new(3, 7));
        assert_eq!(total.input_tokens, 13);
        assert_eq!(total.output_tokens, 12);
        assert_eq!(total.total_tokens, 25);
    }

    #[test]
    fn output_serializes_as_empty_array_not_null() {
        let response = Response {
            id: "resp_1".into(),
            object: "response".into(),
            status: ResponseStatus::Completed,
            output: vec![],
            input: vec![],
            model: "m".into(),
            usage: Usage::default(),
            error: None,
            previous_response_id: None,
            created_at: 0,
            tools: vec![],
            tool_choice: ToolChoice::default_auto(),
            truncation: Truncation::Disabled,
            store: true,
            text: TextOptions::default(),
            service_tier: "default".into(),
            metadata: Default::default(),
            temperature: None,
            top_p: None,
            max_output_tokens: None,
            incomplete_details: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["output"], serde_json::json!([]));
        assert!(!json["output"].is_null());
    }
}
