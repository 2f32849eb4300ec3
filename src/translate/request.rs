//! Request Translator: OpenResponses → provider (spec §4.1).
//!
//! Grounded on the teacher's `OpenAIProvider::convert_message`/
//! `convert_tools` free functions (`llm/openai.rs`), generalized from the
//! teacher's `Message`/`ChatMessage` pair to `Item`/`ProviderMessage`.

use std::collections::HashMap;

use crate::model::{
    ContentBlock, ContentPart, CreateResponseRequest, FunctionDefinition, ImageUrl, Item,
    ItemKind, MessageContent, MessageRole, ProviderFunctionCall, ProviderMessage, ProviderRequest,
    ProviderTool, ProviderToolCall, ResponseFormat, ToolDefinition,
};

/// Tool definitions registered for built-in tool-type stubs
/// (`code_interpreter`, `file_search`, `web_search_preview`), keyed by the
/// stub's wire type name (spec §4.1 rule 8).
pub type BuiltinToolRegistrations = HashMap<&'static str, FunctionDefinition>;

/// Rule 1: copy scalar params, translating `max_output_tokens` →
/// `max_tokens`.
fn translate_scalars(request: &CreateResponseRequest, out: &mut ProviderRequest) {
    out.temperature = request.temperature;
    out.top_p = request.top_p;
    out.max_tokens = request.max_output_tokens;
    out.stop = request.stop.clone();
    out.stream = request.stream;
    out.frequency_penalty = request.frequency_penalty;
    out.presence_penalty = request.presence_penalty;
    out.top_logprobs = request.top_logprobs;
    out.user = request.user.clone();
    out.stream_options_include_usage = request
        .stream_options
        .as_ref()
        .map(|opts| opts.include_usage);
}

/// Rule 2: forward a non-`"text"` `text.format` as `response_format`.
fn translate_response_format(request: &CreateResponseRequest) -> Option<ResponseFormat> {
    let format = request.text_format.as_ref()?.format.as_ref()?;
    if format.kind == "text" {
        return None;
    }
    Some(ResponseFormat {
        kind: format.kind.clone(),
        extra: format.extra.clone(),
    })
}

/// Rule 6: combine all-text inbound parts into one string, else emit a
/// multimodal content array.
fn extract_user_content(parts: &[ContentPart]) -> MessageContent {
    let all_text = parts
        .iter()
        .all(|p| matches!(p, ContentPart::InputText { .. }));

    if all_text {
        let text = parts
            .iter()
            .map(|p| match p {
                ContentPart::InputText { text } => text.as_str(),
                _ => unreachable!(),
            })
            .collect::<Vec<_>>()
            .join("");
        return MessageContent::Text(text);
    }

    let blocks = parts
        .iter()
        .filter_map(|part| match part {
            ContentPart::InputText { text } => Some(ContentBlock::Text { text: text.clone() }),
            ContentPart::InputImage {
                url,
                base64_data,
                media_type,
            } => {
                let resolved_url = if let Some(url) = url {
                    url.clone()
                } else if let Some(data) = base64_data {
                    let media = media_type.clone().unwrap_or_else(|| "image/png".to_string());
                    format!("data:{media};base64,{data}")
                } else {
                    return None;
                };
                Some(ContentBlock::ImageUrl {
                    image_url: ImageUrl { url: resolved_url },
                })
            }
            // Audio/video parts must have already been rejected by
            // capability validation (spec §4.1 rule 6); any that slip
            // through here are dropped rather than mistranslated.
            ContentPart::InputAudio { .. } | ContentPart::InputVideo { .. } => None,
        })
        .collect();

    MessageContent::Parts(blocks)
}

fn extract_assistant_text(parts: &[crate::model::OutputContentPart]) -> String {
    parts
        .iter()
        .map(|crate::model::OutputContentPart::OutputText { text }| text.as_str())
        .collect::<Vec<_>>()
        .concat()
}

/// Rule 5: dispatch one input `Item` to zero-or-one provider messages.
/// `pub(crate)` so history reconstruction (spec §4.7) can reuse the same
/// per-item projection.
pub(crate) fn translate_item(item: &Item) -> Option<ProviderMessage> {
    match &item.kind {
        ItemKind::Message {
            role: MessageRole::User,
            inbound_parts,
            ..
        } => Some(ProviderMessage::user(extract_user_content(inbound_parts))),
        ItemKind::Message {
            role: MessageRole::System,
            inbound_parts,
            ..
        } => {
            let mut msg = ProviderMessage::user(extract_user_content(inbound_parts));
            msg.role = "system".to_string();
            Some(msg)
        }
        ItemKind::Message {
            role: MessageRole::Assistant,
            outbound_parts,
            ..
        } => Some(ProviderMessage::assistant_text(extract_assistant_text(
            outbound_parts,
        ))),
        ItemKind::FunctionCall {
            name,
            call_id,
            arguments,
        } => Some(ProviderMessage::assistant_tool_calls(vec![ProviderToolCall {
            id: call_id.clone(),
            kind: "function".to_string(),
            function: ProviderFunctionCall {
                name: name.clone(),
                arguments: arguments.clone(),
            },
        }])),
        ItemKind::FunctionCallOutput { call_id, output } => {
            Some(ProviderMessage::tool_result(call_id.clone(), output.clone()))
        }
        // Reasoning is model-generated and never replayed (spec §4.1 rule 5).
        ItemKind::Reasoning { .. } => None,
    }
}

/// Rule 7 + 8: translate tool definitions, expanding built-in stubs via the
/// registration table and dropping unregistered stubs with a warning.
fn translate_tools(
    tools: &[ToolDefinition],
    builtins: &BuiltinToolRegistrations,
) -> Vec<ProviderTool> {
    tools
        .iter()
        .filter_map(|tool| match tool {
            ToolDefinition::Function { function } => {
                Some(ProviderTool::function(function.clone()))
            }
            ToolDefinition::CodeInterpreter => builtins
                .get("code_interpreter")
                .cloned()
                .map(ProviderTool::function)
                .or_else(|| {
                    tracing::warn!("no registration for built-in tool code_interpreter; dropping");
                    None
                }),
            ToolDefinition::FileSearch => builtins
                .get("file_search")
                .cloned()
                .map(ProviderTool::function)
                .or_else(|| {
                    tracing::warn!("no registration for built-in tool file_search; dropping");
                    None
                }),
            ToolDefinition::WebSearchPreview => builtins
                .get("web_search_preview")
                .cloned()
                .map(ProviderTool::function)
                .or_else(|| {
                    tracing::warn!("no registration for built-in tool web_search_preview; dropping");
                    None
                }),
        })
        .collect()
}

/// Translate a `CreateResponseRequest` into a `ProviderRequest` (spec §4.1).
pub fn translate(
    request: &CreateResponseRequest,
    model: &str,
    builtins: &BuiltinToolRegistrations,
) -> ProviderRequest {
    let mut out = ProviderRequest {
        model: model.to_string(),
        ..Default::default()
    };

    translate_scalars(request, &mut out);
    out.response_format = translate_response_format(request);

    // Rule 3: forward tool_choice verbatim, converted to the provider wire
    // shape. Omitted only when there is nothing for it to govern.
    let is_default_auto = matches!(
        request.tool_choice,
        crate::model::ToolChoice::Mode(crate::model::ToolChoiceMode::Auto)
    );
    if !request.tools.is_empty() || !is_default_auto {
        out.tool_choice = Some(request.tool_choice.clone().into());
    }

    let mut messages = Vec::new();

    // Rule 4: prepend instructions as a leading system message.
    if let Some(instructions) = &request.instructions {
        if !instructions.is_empty() {
            messages.push(ProviderMessage::system(instructions.clone()));
        }
    }

    // Rule 5 + 9: translate each item in order, never merging consecutive
    // same-role messages.
    for item in &request.input {
        if let Some(message) = translate_item(item) {
            messages.push(message);
        }
    }

    out.messages = messages;

    let provider_tools = translate_tools(&request.tools, builtins);
    out.tools = if provider_tools.is_empty() {
        None
    } else {
        Some(provider_tools)
    };

    out
}
