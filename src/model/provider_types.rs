//! Protocol-neutral provider-facing types (spec §3): `ProviderRequest`,
//! `ProviderResponse`, `ProviderEvent`.
//!
//! Grounded on the teacher's `StreamChunk` enum (`llm/provider.rs`),
//! generalized from 4 to the 8 variants `spec.md` names, and on
//! `ChatCompletionRequest`/`ChatMessage` (`llm/openai.rs`) for the request
//! shape.

use serde::{Deserialize, Serialize};

use super::item::Item;
use super::response::Usage;
use super::tool::ProviderTool;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentBlock>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub function: ProviderFunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderFunctionCall {
    pub name: String,
    /// JSON-encoded arguments string.
    pub arguments: String,
}

/// A single message in the protocol-neutral request, mirroring the shape
/// the Chat Completions adapter sends on the wire (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ProviderToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ProviderMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: Some(MessageContent::Text(content.into())),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }

    pub fn user(content: MessageContent) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(content),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }

    pub fn assistant_text(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: Some(MessageContent::Text(content.into())),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }

    pub fn assistant_tool_calls(tool_calls: Vec<ProviderToolCall>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: None,
            tool_calls: Some(tool_calls),
            tool_call_id: None,
            name: None,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(MessageContent::Text(content.into())),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
            name: None,
        }
    }
}

/// Stand-in for a `response_format` passed through to the backend when
/// `text.format.type != "text"` (spec §4.1 rule 2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten, default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderRequest {
    pub model: String,
    pub messages: Vec<ProviderMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ProviderTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<super::tool::ProviderToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_logprobs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_options_include_usage: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderResponseStatus {
    Completed,
    Incomplete,
    Failed,
}

#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub model: String,
    pub status: ProviderResponseStatus,
    pub items: Vec<Item>,
    pub usage: Usage,
}

/// Internal tagged-union event emitted by a provider adapter's streaming
/// path (spec §3, §4.3).
#[derive(Debug, Clone)]
pub enum ProviderEvent {
    TextDelta {
        delta: String,
    },
    TextDone {
        r#final: String,
    },
    ToolCallDelta {
        index: usize,
        call_id: Option<String>,
        function_name: Option<String>,
        delta: String,
    },
    ToolCallDone {
        index: usize,
        item: Item,
    },
    ReasoningDelta {
        delta: String,
    },
    ReasoningDone,
    Done {
        item_status: Option<super::item::ItemStatus>,
        usage: Option<Usage>,
    },
    Error {
        err: crate::error::ApiError,
    },
}
