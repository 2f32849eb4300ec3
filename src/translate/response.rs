//! Response Translator: provider non-streaming completion → `ProviderResponse`
//! (spec §4.2).
//!
//! Grounded on the teacher's `parse_chat_response`/`ChatResponse` handling
//! in `llm/openai.rs`, generalized to the four Item shapes and the explicit
//! `finish_reason` → status mapping `spec.md` names.

use serde::{Deserialize, Serialize};

use crate::ids;
use crate::model::{
    Item, ProviderResponse, ProviderResponseStatus, ProviderToolCall, Usage,
};

/// The raw non-streaming completion body returned by the backend (spec §6).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendCompletion {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<BackendChoice>,
    #[serde(default)]
    pub usage: Option<BackendUsage>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendChoice {
    #[serde(default)]
    pub index: u32,
    pub message: BackendMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BackendMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ProviderToolCall>>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct BackendUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// Rule 1: `finish_reason` → response status.
fn map_finish_reason(reason: Option<&str>) -> ProviderResponseStatus {
    match reason {
        Some("stop") | Some("tool_calls") => ProviderResponseStatus::Completed,
        Some("length") => ProviderResponseStatus::Incomplete,
        Some("content_filter") => ProviderResponseStatus::Failed,
        Some(other) => {
            tracing::warn!(finish_reason = other, "unrecognized finish_reason; treating as completed");
            ProviderResponseStatus::Completed
        }
        None => {
            tracing::warn!("missing finish_reason; treating as completed");
            ProviderResponseStatus::Completed
        }
    }
}

/// Translate a backend completion (using only `choices[0]`, per spec: always
/// request `n=1` outbound) into a `ProviderResponse`.
pub fn translate(completion: &BackendCompletion) -> ProviderResponse {
    let Some(choice) = completion.choices.first() else {
        // Rule 5: empty choices → failed with no items.
        return ProviderResponse {
            model: completion.model.clone(),
            status: ProviderResponseStatus::Failed,
            items: Vec::new(),
            usage: Usage::default(),
        };
    };

    let status = map_finish_reason(choice.finish_reason.as_deref());
    let mut items = Vec::new();

    // Rule 3: reasoning item precedes the text message item.
    if let Some(reasoning) = choice.message.reasoning_content.as_deref() {
        if !reasoning.is_empty() {
            items.push(Item::reasoning(ids::generate_item_id(), reasoning));
        }
    }

    // Rule 2
    if let Some(content) = choice.message.content.as_deref() {
        if !content.is_empty() {
            items.push(Item::assistant_text(ids::generate_item_id(), content));
        }
    }

    // Rule 4
    for tool_call in choice.message.tool_calls.iter().flatten() {
        items.push(Item::function_call(
            ids::generate_item_id(),
            tool_call.function.name.clone(),
            tool_call.id.clone(),
            tool_call.function.arguments.clone(),
        ));
    }

    let usage = completion
        .usage
        .map(|u| Usage::new(u.prompt_tokens, u.completion_tokens))
        .unwrap_or_default();

    ProviderResponse {
        model: completion.model.clone(),
        status,
        items,
        usage,
    }
}
