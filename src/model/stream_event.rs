//! `StreamEvent` — the outbound SSE vocabulary (spec §3, §4.4).
//!
//! Grounded on `ResponsesAPIStreamEvent` in the reference responses-API
//! streaming buffer (`other_examples/28170f28_...`), adapted to this
//! crate's `Item`/`Response` types and carrying a `sequence_number` on every
//! variant as spec §3 requires.

use serde::{Deserialize, Serialize};

use super::item::Item;
use super::response::{Response, ResponseError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    #[serde(rename = "response.created")]
    ResponseCreated {
        sequence_number: u64,
        response: Response,
    },
    #[serde(rename = "response.in_progress")]
    ResponseInProgress {
        sequence_number: u64,
        response: Response,
    },
    #[serde(rename = "response.output_item.added")]
    OutputItemAdded {
        sequence_number: u64,
        output_index: usize,
        item: Item,
    },
    #[serde(rename = "response.content_part.added")]
    ContentPartAdded {
        sequence_number: u64,
        item_id: String,
        output_index: usize,
        content_index: usize,
        part: super::item::OutputContentPart,
    },
    #[serde(rename = "response.output_text.delta")]
    OutputTextDelta {
        sequence_number: u64,
        item_id: String,
        output_index: usize,
        content_index: usize,
        delta: String,
    },
    #[serde(rename = "response.output_text.done")]
    OutputTextDone {
        sequence_number: u64,
        item_id: String,
        output_index: usize,
        content_index: usize,
        delta: String,
    },
    #[serde(rename = "response.content_part.done")]
    ContentPartDone {
        sequence_number: u64,
        item_id: String,
        output_index: usize,
        content_index: usize,
        part: super::item::OutputContentPart,
    },
    #[serde(rename = "response.output_item.done")]
    OutputItemDone {
        sequence_number: u64,
        output_index: usize,
        item: Item,
    },
    #[serde(rename = "response.function_call_arguments.delta")]
    FunctionCallArgumentsDelta {
        sequence_number: u64,
        item_id: String,
        output_index: usize,
        delta: String,
    },
    #[serde(rename = "response.function_call_arguments.done")]
    FunctionCallArgumentsDone {
        sequence_number: u64,
        item_id: String,
        output_index: usize,
        delta: String,
    },
    #[serde(rename = "response.reasoning.delta")]
    ReasoningDelta {
        sequence_number: u64,
        item_id: String,
        output_index: usize,
        content_index: usize,
        delta: String,
    },
    #[serde(rename = "response.reasoning.done")]
    ReasoningDone {
        sequence_number: u64,
        item_id: String,
        output_index: usize,
        content_index: usize,
        delta: String,
    },
    #[serde(rename = "response.completed")]
    ResponseCompleted {
        sequence_number: u64,
        response: Response,
    },
    #[serde(rename = "response.incomplete")]
    ResponseIncomplete {
        sequence_number: u64,
        response: Response,
    },
    #[serde(rename = "response.failed")]
    ResponseFailed {
        sequence_number: u64,
        response: Response,
    },
    #[serde(rename = "response.cancelled")]
    ResponseCancelled {
        sequence_number: u64,
        response: Response,
    },
    #[serde(rename = "response.requires_action")]
    ResponseRequiresAction {
        sequence_number: u64,
        response: Response,
    },
    /// Tool-lifecycle variants (spec §3): `mcp_call.*`,
    /// `file_search_call.*`, `web_search_call.*`. Modeled as one variant
    /// carrying a `kind`/`phase` pair rather than one Rust variant per
    /// (tool-kind, phase) combination, since the set of phases depends on
    /// tool kind (spec §4.6's "streaming addendum") and serde's `rename`
    /// can still produce exactly the right wire tag via `phase_type()`.
    ToolCallLifecycle {
        sequence_number: u64,
        kind: ToolLifecycleKind,
        phase: ToolLifecyclePhase,
        item_id: String,
        output_index: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolLifecycleKind {
    Mcp,
    FileSearch,
    WebSearch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolLifecyclePhase {
    InProgress,
    Searching,
    Completed,
    Failed,
}

impl ToolLifecycleKind {
    fn wire_prefix(self) -> &'static str {
        match self {
            ToolLifecycleKind::Mcp => "mcp_call",
            ToolLifecycleKind::FileSearch => "file_search_call",
            ToolLifecycleKind::WebSearch => "web_search_call",
        }
    }
}

impl ToolLifecyclePhase {
    fn wire_suffix(self) -> &'static str {
        match self {
            ToolLifecyclePhase::InProgress => "in_progress",
            ToolLifecyclePhase::Searching => "searching",
            ToolLifecyclePhase::Completed => "completed",
            ToolLifecyclePhase::Failed => "failed",
        }
    }
}

impl StreamEvent {
    pub fn sequence_number(&self) -> u64 {
        match self {
            StreamEvent::ResponseCreated { sequence_number, .. }
            | StreamEvent::ResponseInProgress { sequence_number, .. }
            | StreamEvent::OutputItemAdded { sequence_number, .. }
            | StreamEvent::ContentPartAdded { sequence_number, .. }
            | StreamEvent::OutputTextDelta { sequence_number, .. }
            | StreamEvent::OutputTextDone { sequence_number, .. }
            | StreamEvent::ContentPartDone { sequence_number, .. }
            | StreamEvent::OutputItemDone { sequence_number, .. }
            | StreamEvent::FunctionCallArgumentsDelta { sequence_number, .. }
            | StreamEvent::FunctionCallArgumentsDone { sequence_number, .. }
            | StreamEvent::ReasoningDelta { sequence_number, .. }
            | StreamEvent::ReasoningDone { sequence_number, .. }
            | StreamEvent::ResponseCompleted { sequence_number, .. }
            | StreamEvent::ResponseIncomplete { sequence_number, .. }
            | StreamEvent::ResponseFailed { sequence_number, .. }
            | StreamEvent::ResponseCancelled { sequence_number, .. }
            | StreamEvent::ResponseRequiresAction { sequence_number, .. }
            | StreamEvent::ToolCallLifecycle { sequence_number, .. } => *sequence_number,
        }
    }

    /// Whether this event is one of the terminal events for the stream
    /// (spec §3: exactly one terminal event per response stream).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamEvent::ResponseCompleted { .. }
                | StreamEvent::ResponseIncomplete { .. }
                | StreamEvent::ResponseFailed { .. }
                | StreamEvent::ResponseCancelled { .. }
                | StreamEvent::ResponseRequiresAction { .. }
        )
    }

    /// The dotted wire event name, e.g. `"response.output_text.delta"` or
    /// `"mcp_call.in_progress"`.
    pub fn wire_type(&self) -> String {
        match self {
            StreamEvent::ToolCallLifecycle { kind, phase, .. } => {
                format!("{}.{}", kind.wire_prefix(), phase.wire_suffix())
            }
            other => match serde_json::to_value(other) {
                Ok(serde_json::Value::Object(map)) => map
                    .get("type")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                _ => String::new(),
            },
        }
    }
}
