//! The polymorphic `Item` — the atomic conversational unit (spec §3).
//!
//! Modeled as a tagged enum rather than an inheritance hierarchy, per spec
//! §9 ("Item's four shapes ... are tagged unions / sum types in a
//! statically typed target"). Grounded on the teacher's flat `Message`
//! struct (`llm/provider.rs`), generalized to the four shapes `spec.md`
//! names.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    InProgress,
    Completed,
    Incomplete,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// An inbound content part attached to a user/system message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    InputText {
        text: String,
    },
    InputImage {
        #[serde(skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        base64_data: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        media_type: Option<String>,
    },
    InputAudio {
        #[serde(skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        base64_data: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        media_type: Option<String>,
    },
    InputVideo {
        #[serde(skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        base64_data: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        media_type: Option<String>,
    },
}

/// A single extracted tool call, passed to a `ToolExecutor`. Distinct from
/// `Item::FunctionCall` in that `arguments` here is kept as a parsed value
/// for executor convenience; `item_id` lets the agentic loop correlate the
/// eventual result back to its originating item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub item_id: String,
    pub call_id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// An outbound content part on an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputContentPart {
    OutputText { text: String },
}

/// The atomic conversational unit. Exactly one shape is active at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemKind {
    Message {
        role: MessageRole,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        inbound_parts: Vec<ContentPart>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        outbound_parts: Vec<OutputContentPart>,
    },
    FunctionCall {
        name: String,
        call_id: String,
        /// JSON-encoded arguments string, not a parsed value.
        arguments: String,
    },
    FunctionCallOutput {
        call_id: String,
        output: String,
    },
    Reasoning {
        content: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub status: ItemStatus,
    #[serde(flatten)]
    pub kind: ItemKind,
}

impl Item {
    pub fn new(id: impl Into<String>, status: ItemStatus, kind: ItemKind) -> Self {
        Self {
            id: id.into(),
            status,
            kind,
        }
    }

    pub fn user_text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(
            id,
            ItemStatus::Completed,
            ItemKind::Message {
                role: MessageRole::User,
                inbound_parts: vec![ContentPart::InputText { text: text.into() }],
                outbound_parts: vec![],
            },
        )
    }

    pub fn assistant_text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(
            id,
            ItemStatus::Completed,
            ItemKind::Message {
                role: MessageRole::Assistant,
                inbound_parts: vec![],
                outbound_parts: vec![OutputContentPart::OutputText { text: text.into() }],
            },
        )
    }

    pub fn function_call(
        id: impl Into<String>,
        name: impl Into<String>,
        call_id: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            ItemStatus::Completed,
            ItemKind::FunctionCall {
                name: name.into(),
                call_id: call_id.into(),
                arguments: arguments.into(),
            },
        )
    }

    pub fn function_call_output(
        id: impl Into<String>,
        call_id: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            ItemStatus::Completed,
            ItemKind::FunctionCallOutput {
                call_id: call_id.into(),
                output: output.into(),
            },
        )
    }

    pub fn reasoning(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(
            id,
            ItemStatus::Completed,
            ItemKind::Reasoning {
                content: content.into(),
            },
        )
    }
}
