//! `CreateResponseRequest` — the inbound OpenResponses request (spec §3).

use serde::{Deserialize, Serialize};

use super::item::Item;
use super::tool::{ToolChoice, ToolDefinition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Truncation {
    Auto,
    Disabled,
}

impl Default for Truncation {
    fn default() -> Self {
        Truncation::Disabled
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextFormat {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten, default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for TextFormat {
    fn default() -> Self {
        Self {
            kind: "text".to_string(),
            extra: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextOptions {
    #[serde(default)]
    pub format: Option<TextFormat>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamOptions {
    #[serde(default)]
    pub include_usage: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReasoningOptions {
    #[serde(default)]
    pub effort: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateResponseRequest {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub input: Vec<Item>,
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
    #[serde(default = "ToolChoice::default_auto")]
    pub tool_choice: ToolChoice,
    #[serde(default)]
    pub allowed_tools: Option<Vec<String>>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub top_p: Option<f32>,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
    #[serde(default)]
    pub max_tool_calls: Option<u32>,
    #[serde(default)]
    pub stop: Option<Vec<String>>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub stream_options: Option<StreamOptions>,
    #[serde(default)]
    pub previous_response_id: Option<String>,
    #[serde(default)]
    pub store: Option<bool>,
    #[serde(default)]
    pub truncation: Truncation,
    #[serde(default)]
    pub service_tier: Option<String>,
    #[serde(default = "default_true")]
    pub parallel_tool_calls: bool,
    #[serde(default)]
    pub reasoning: Option<ReasoningOptions>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub frequency_penalty: Option<f32>,
    #[serde(default)]
    pub presence_penalty: Option<f32>,
    #[serde(default)]
    pub top_logprobs: Option<u32>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub text_format: Option<TextOptions>,
}

fn default_true() -> bool {
    true
}

impl CreateResponseRequest {
    /// Whether this request, as a whole, forbids the agentic loop from
    /// calling any tool (spec §4.6 step 6b).
    pub fn forbids_tool_calls(&self) -> bool {
        matches!(
            self.tool_choice,
            ToolChoice::Mode(super::tool::ToolChoiceMode::None)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let json = serde_json::json!({});
        let req: CreateResponseRequest = serde_json::from_value(json).unwrap();
        assert!(req.input.is_empty());
        assert!(req.tools.is_empty());
        assert!(req.parallel_tool_calls);
        assert_eq!(req.truncation, Truncation::Disabled);
        assert!(!req.forbids_tool_calls());
    }

    #[test]
    fn tool_choice_none_forbids_calls() {
        let json = serde_json::json!({ "tool_choice": "none" });
        let req: CreateResponseRequest = serde_json::from_value(json).unwrap();
        assert!(req.forbids_tool_calls());
    }
}
