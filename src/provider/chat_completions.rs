//! The Chat Completions backend adapter: HTTP transport, SSE chunk parsing
//! (spec §4.3), and the concrete wire contract (spec §6).
//!
//! Grounded directly on the teacher's `OpenAIProvider` (`llm/openai.rs`):
//! same `reqwest::Client` + `eventsource_stream::Eventsource` pipeline, same
//! `async_stream::stream!` producer shape. Generalized from the teacher's
//! unbounded `mpsc` + ad-hoc `StreamChunk` enum to a bounded channel of the
//! protocol-neutral `ProviderEvent`.

use std::collections::HashMap;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::capability::ProviderCapabilities;
use crate::config::ChatCompletionsConfig;
use crate::error::ApiError;
use crate::model::{ItemStatus, ProviderEvent, ProviderRequest, ProviderResponse, Usage};
use crate::translate::response::{translate as translate_response, BackendCompletion, BackendUsage};

/// Capacity of the bounded `ProviderEvent` channel backing one stream.
/// Deliberately small: the engine orchestrator consumes events about as
/// fast as they're written to the client, so a deep buffer would only mask
/// backpressure rather than relieve it.
const STREAM_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Default, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: &'a [crate::model::ProviderMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: &'a Option<Vec<crate::model::ProviderTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: &'a Option<crate::model::ProviderToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    /// Always 1: the response translator only ever reads `choices[0]`
    /// (spec §4.2, §6 wire schema's `n=1`).
    n: u8,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<WireStreamOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: &'a Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: &'a Option<crate::model::ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_logprobs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: &'a Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize)]
struct WireStreamOptions {
    include_usage: bool,
}

impl<'a> WireRequest<'a> {
    fn from_provider_request(request: &'a ProviderRequest, stream: bool) -> Self {
        Self {
            model: &request.model,
            messages: &request.messages,
            tools: &request.tools,
            tool_choice: &request.tool_choice,
            temperature: request.temperature,
            top_p: request.top_p,
            max_tokens: request.max_tokens,
            n: 1,
            stream,
            stream_options: request
                .stream_options_include_usage
                .map(|include_usage| WireStreamOptions { include_usage }),
            stop: &request.stop,
            response_format: &request.response_format,
            frequency_penalty: request.frequency_penalty,
            presence_penalty: request.presence_penalty,
            top_logprobs: request.top_logprobs,
            user: &request.user,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    usage: Option<BackendUsage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    delta: ChunkDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ChunkToolCallDelta>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ChunkToolCallDelta {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<ChunkFunctionDelta>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ChunkFunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

/// Accumulates one tool call's fragments across chunks until `finish_reason`
/// closes the turn and a `ToolCallDone` can be synthesized (spec §2
/// component 3, §4.3 rule 5).
#[derive(Debug, Clone, Default)]
struct ToolCallBuffer {
    call_id: Option<String>,
    function_name: Option<String>,
    arguments: String,
}

/// Mutable state threaded across chunks of a single stream (spec §4.3).
#[derive(Debug, Default)]
struct ChunkState {
    tool_call_ids: HashMap<usize, String>,
    tool_call_buffers: HashMap<usize, ToolCallBuffer>,
    tool_call_order: Vec<usize>,
}

/// Translate one decoded SSE chunk into zero or more `ProviderEvent`s,
/// updating `state` in place. Pulled out of the `stream()` producer so the
/// chunk-to-event mapping can be tested without a live HTTP connection.
fn process_chunk(chunk: ChatCompletionChunk, state: &mut ChunkState) -> Vec<ProviderEvent> {
    if chunk.choices.is_empty() {
        return match chunk.usage {
            Some(usage) => vec![ProviderEvent::Done {
                item_status: None,
                usage: Some(Usage::new(usage.prompt_tokens, usage.completion_tokens)),
            }],
            None => Vec::new(),
        };
    }

    let choice = &chunk.choices[0];

    if let Some(reason) = &choice.finish_reason {
        let mut events = Vec::new();
        for index in &state.tool_call_order {
            let Some(buffer) = state.tool_call_buffers.remove(index) else { continue; };
            let item = crate::model::Item::function_call(
                String::new(),
                buffer.function_name.unwrap_or_default(),
                buffer.call_id.unwrap_or_default(),
                buffer.arguments,
            );
            events.push(ProviderEvent::ToolCallDone { index: *index, item });
        }

        let final_text = choice.delta.content.clone().unwrap_or_default();
        events.push(ProviderEvent::TextDone { r#final: final_text });
        events.push(ProviderEvent::Done {
            item_status: Some(map_finish_reason_to_item_status(reason)),
            usage: None,
        });
        return events;
    }

    if let Some(tool_calls) = &choice.delta.tool_calls {
        let mut events = Vec::with_capacity(tool_calls.len());
        for delta in tool_calls {
            if !state.tool_call_buffers.contains_key(&delta.index) {
                state.tool_call_order.push(delta.index);
            }
            let buffer = state.tool_call_buffers.entry(delta.index).or_default();

            if let Some(id) = &delta.id {
                state.tool_call_ids.insert(delta.index, id.clone());
                buffer.call_id = Some(id.clone());
            }
            if let Some(name) = delta.function.as_ref().and_then(|f| f.name.clone()) {
                buffer.function_name = Some(name);
            }
            let arguments = delta
                .function
                .as_ref()
                .and_then(|f| f.arguments.clone())
                .unwrap_or_default();
            if !arguments.is_empty() {
                buffer.arguments.push_str(&arguments);
            }

            let call_id = state.tool_call_ids.get(&delta.index).cloned();
            let function_name = delta.function.as_ref().and_then(|f| f.name.clone());
            events.push(ProviderEvent::ToolCallDelta {
                index: delta.index,
                call_id,
                function_name,
                delta: arguments,
            });
        }
        return events;
    }

    let text_event = if let Some(reasoning) = &choice.delta.reasoning_content {
        (!reasoning.is_empty()).then(|| ProviderEvent::ReasoningDelta {
            delta: reasoning.clone(),
        })
    } else if let Some(content) = &choice.delta.content {
        (!content.is_empty() || choice.delta.role.is_some()).then(|| ProviderEvent::TextDelta {
            delta: content.clone(),
        })
    } else if choice.delta.role.is_some() {
        Some(ProviderEvent::TextDelta { delta: String::new() })
    } else {
        None
    };

    text_event.into_iter().collect()
}

fn map_finish_reason_to_item_status(reason: &str) -> ItemStatus {
    match reason {
        "length" | "content_filter" => ItemStatus::Incomplete,
        "stop" | "tool_calls" => ItemStatus::Completed,
        other => {
            tracing::warn!(finish_reason = other, "unrecognized finish_reason; treating as completed");
            ItemStatus::Completed
        }
    }
}

/// Extract `body.error.message` from a JSON error body, falling back to the
/// raw body text (spec §6: "message from body.error.message when present,
/// else default").
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error")?.get("message")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

/// Map an HTTP failure status to the engine's closed error taxonomy.
/// Backend auth failures (401/403) map to `server_error`, not
/// `unauthenticated`, since backend auth is a server-side concern, not the
/// end client's (spec §6).
fn map_http_error(status: reqwest::StatusCode, body: String) -> ApiError {
    let message = extract_error_message(&body);
    match status.as_u16() {
        400 => ApiError::invalid_request("request", message),
        404 => ApiError::not_found(message),
        429 => ApiError::too_many_requests(message),
        _ => ApiError::server_error(message),
    }
}

/// The Chat Completions backend adapter.
pub struct ChatCompletionsProvider {
    client: reqwest::Client,
    config: ChatCompletionsConfig,
    capabilities: ProviderCapabilities,
}

impl ChatCompletionsProvider {
    pub fn new(config: ChatCompletionsConfig, capabilities: ProviderCapabilities) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            config,
            capabilities,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn request_builder(&self, stream: bool, request: &ProviderRequest) -> reqwest::RequestBuilder {
        let wire = WireRequest::from_provider_request(request, stream);
        let mut builder = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .json(&wire);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.header("Authorization", format!("Bearer {api_key}"));
        }
        builder
    }
}

#[async_trait]
impl Provider for ChatCompletionsProvider {
    fn name(&self) -> &str {
        "chat_completions"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        self.capabilities.clone()
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ApiError> {
        let response = self.request_builder(false, &request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_error(status, body));
        }

        let completion: BackendCompletion = response.json().await?;
        Ok(translate_response(&completion))
    }

    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> Result<mpsc::Receiver<ProviderEvent>, ApiError> {
        let response = self.request_builder(true, &request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_error(status, body));
        }

        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        let byte_stream = response.bytes_stream();
        let mut event_stream = byte_stream.eventsource();

        tokio::spawn(async move {
            // Tool-call fragments are keyed by their wire `index`, per
            // spec §4.3 rule 5: "Entries without an arguments fragment
            // still carry index/id/name metadata for the mapper." The
            // component itself "buffers per-index tool-call argument
            // fragments" (spec §2, component 3): accumulated in `ChunkState`
            // so that a `ToolCallDone` carrying the full `arguments` string
            // can be synthesized once `finish_reason` closes the turn.
            let mut state = ChunkState::default();

            while let Some(event_result) = event_stream.next().await {
                let event = match event_result {
                    Ok(event) => event,
                    Err(e) => {
                        let _ = tx.send(ProviderEvent::Error {
                            err: ApiError::server_error(format!("stream read error: {e}")),
                        }).await;
                        break;
                    }
                };

                if event.data == "[DONE]" {
                    break;
                }

                let chunk: ChatCompletionChunk = match serde_json::from_str(&event.data) {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        tracing::warn!(error = %e, "skipping malformed SSE chunk");
                        continue;
                    }
                };

                let mut closed = false;
                for event in process_chunk(chunk, &mut state) {
                    if tx.send(event).await.is_err() {
                        closed = true;
                        break;
                    }
                }
                if closed {
                    break;
                }
            }
            // Producer closes the channel by dropping `tx` on exit, per
            // spec §4.3 rule 7.
        });

        Ok(rx)
    }

    async fn list_models(&self) -> Result<Vec<super::ModelInfo>, ApiError> {
        let url = format!("{}/models", self.config.base_url.trim_end_matches('/'));
        let mut builder = self.client.get(url);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.header("Authorization", format!("Bearer {api_key}"));
        }
        let response = builder.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_error(status, body));
        }
        let body: ModelListResponse = response.json().await?;
        Ok(body.data.into_iter().map(|m| super::ModelInfo { id: m.id }).collect())
    }
}

#[derive(Debug, Deserialize)]
struct ModelListResponse {
    #[serde(default)]
    data: Vec<ModelListEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelListEntry {
    id: String,
}

use super::Provider;
