//! The Agentic Loop (spec §4.6): iterate provider calls and tool execution
//! until the model stops calling tools, a limit is hit, or the caller
//! cancels.
//!
//! Grounded on the teacher's `chat_loop_with_tools` (`llm/helpers.rs`) for
//! the turn/react shape, generalized from the teacher's single always-on
//! loop to the richer termination/filtering/ordering rules this crate's
//! request surface exposes (`tool_choice`, `allowed_tools`,
//! `parallel_tool_calls`, `max_tool_calls`).

pub mod loop_detector;

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::engine::{response_status_from_provider, Engine};
use crate::error::ApiError;
use crate::executor::{ExecutorKind, ToolExecutor, ToolResult};
use crate::ids;
use crate::model::{
    CreateResponseRequest, Item, ItemKind, ItemStatus, ProviderEvent, ProviderFunctionCall,
    ProviderMessage, ProviderRequest, ProviderResponseStatus, ProviderToolCall, ResponseStatus,
    StreamEvent, ToolCall, ToolLifecycleKind, ToolLifecyclePhase, Usage,
};
use crate::provider::Provider;
use crate::stream::StreamMapper;
use crate::writer::ResponseWriter;
use loop_detector::{LoopAction, LoopDetector};

/// One agentic turn's outcome, produced by either the streaming or
/// non-streaming per-turn runner. `status` is the backend's own verdict for
/// this turn (`length` → `Incomplete`, `content_filter` → `Failed`, else
/// `Completed`), consulted only when the turn ends the loop (no further
/// tool calls to make).
enum TurnOutcome {
    Ok {
        items: Vec<Item>,
        usage: Usage,
        status: ResponseStatus,
    },
    Cancelled,
    Failed(ApiError),
}

impl Engine {
    /// Drive up to `effective_max_turns` provider↔tool round trips for one
    /// request (spec §4.6). `response_id` and `provider_request` are the
    /// same values `create_response` would otherwise have handed to a
    /// single-shot runner.
    pub(crate) async fn run_agentic(
        &self,
        ctx: CancellationToken,
        response_id: String,
        request: &CreateResponseRequest,
        model: &str,
        mut provider_request: ProviderRequest,
        writer: &dyn ResponseWriter,
    ) -> Result<(), ApiError> {
        let max_turns = self.config.effective_max_turns(request.max_tool_calls);
        let mut total_usage = Usage::default();
        let mut all_items: Vec<Item> = Vec::new();
        let mut mapper = StreamMapper::new();
        let mut loop_detector = self.loop_detector_config.clone().map(LoopDetector::with_config);

        if request.stream {
            let skeleton = self.assemble_response(
                &response_id,
                request,
                model,
                ResponseStatus::InProgress,
                Vec::new(),
                Usage::default(),
                None,
                None,
            );
            writer
                .write_event(StreamEvent::ResponseCreated {
                    sequence_number: mapper.next_seq(),
                    response: skeleton.snapshot(),
                })
                .await?;
            writer
                .write_event(StreamEvent::ResponseInProgress {
                    sequence_number: mapper.next_seq(),
                    response: skeleton.snapshot(),
                })
                .await?;
        }

        for turn in 0..max_turns {
            if ctx.is_cancelled() {
                return self
                    .terminate_agentic(
                        &mut mapper,
                        writer,
                        request,
                        &response_id,
                        model,
                        ResponseStatus::Cancelled,
                        std::mem::take(&mut all_items),
                        total_usage,
                        None,
                    )
                    .await;
            }

            let outcome = if request.stream {
                self.run_agentic_turn_streaming(&ctx, &mut mapper, provider_request.clone(), writer)
                    .await
            } else {
                self.run_agentic_turn_non_streaming(&ctx, provider_request.clone()).await
            };

            let (turn_items, turn_usage, turn_status) = match outcome {
                TurnOutcome::Ok { items, usage, status } => (items, usage, status),
                TurnOutcome::Cancelled => {
                    return self
                        .terminate_agentic(
                            &mut mapper,
                            writer,
                            request,
                            &response_id,
                            model,
                            ResponseStatus::Cancelled,
                            std::mem::take(&mut all_items),
                            total_usage,
                            None,
                        )
                        .await;
                }
                TurnOutcome::Failed(err) => {
                    let response_error = crate::model::ResponseError::from(&err);
                    return self
                        .terminate_agentic(
                            &mut mapper,
                            writer,
                            request,
                            &response_id,
                            model,
                            ResponseStatus::Failed,
                            std::mem::take(&mut all_items),
                            total_usage,
                            Some(response_error),
                        )
                        .await;
                }
            };

            total_usage.add(turn_usage);
            all_items.extend(turn_items.clone());

            let tool_calls = extract_tool_calls(&turn_items);

            if tool_calls.is_empty() || request.forbids_tool_calls() {
                return self
                    .terminate_agentic(
                        &mut mapper,
                        writer,
                        request,
                        &response_id,
                        model,
                        turn_status,
                        all_items,
                        total_usage,
                        None,
                    )
                    .await;
            }

            let filtered = filter_allowed_tools(&tool_calls, request.allowed_tools.as_deref());
            if filtered.allowed.iter().any(|call| self.find_executor(&call.name).is_none()) {
                return self
                    .terminate_agentic(
                        &mut mapper,
                        writer,
                        request,
                        &response_id,
                        model,
                        ResponseStatus::RequiresAction,
                        all_items,
                        total_usage,
                        None,
                    )
                    .await;
            }

            let mut loop_warning: Option<String> = None;
            if let Some(detector) = loop_detector.as_mut() {
                for call in &filtered.allowed {
                    if let Some(detection) = detector.check(call) {
                        match detection.action {
                            LoopAction::Terminate => {
                                return self
                                    .terminate_agentic(
                                        &mut mapper,
                                        writer,
                                        request,
                                        &response_id,
                                        model,
                                        ResponseStatus::Incomplete,
                                        all_items,
                                        total_usage,
                                        None,
                                    )
                                    .await;
                            }
                            LoopAction::Warn => {
                                loop_warning = detection.warning_message.clone();
                            }
                            LoopAction::Continue => {}
                        }
                    }
                }
            }

            let results = if request.parallel_tool_calls {
                self.execute_parallel(&filtered.allowed, &mut mapper, writer).await?
            } else {
                self.execute_sequential(&ctx, &filtered.allowed, &mut mapper, writer).await?
            };
            for (call, (result, _)) in filtered.allowed.iter().zip(results.iter()) {
                self.metrics
                    .record_tool_execution(&call.name, if result.is_error { "error" } else { "ok" });
            }

            let mut combined = results;
            for call in &filtered.rejected {
                let result = ToolResult::error(
                    call.call_id.clone(),
                    format!("tool '{}' is not in the allowed_tools list for this request", call.name),
                );
                let item = build_function_call_output_item(&result);
                self.emit_function_call_output_item(&item, &mut mapper, writer).await?;
                combined.push((result, item));
            }

            let assistant_message = build_assistant_tool_calls_message(&turn_items);
            provider_request.messages.push(assistant_message);
            for (result, item) in &combined {
                provider_request
                    .messages
                    .push(ProviderMessage::tool_result(result.call_id.clone(), result.output.clone()));
                all_items.push(item.clone());
            }
            if let Some(warning) = loop_warning {
                provider_request.messages.push(ProviderMessage::system(warning));
            }

            let _ = turn;
        }

        self.terminate_agentic(
            &mut mapper,
            writer,
            request,
            &response_id,
            model,
            ResponseStatus::Incomplete,
            all_items,
            total_usage,
            None,
        )
        .await
    }

    async fn run_agentic_turn_non_streaming(&self, ctx: &CancellationToken, provider_request: ProviderRequest) -> TurnOutcome {
        if ctx.is_cancelled() {
            return TurnOutcome::Cancelled;
        }
        tokio::select! {
            _ = ctx.cancelled() => TurnOutcome::Cancelled,
            result = self.provider.complete(provider_request) => match result {
                Ok(response) => TurnOutcome::Ok {
                    status: response_status_from_provider(response.status),
                    items: response.items,
                    usage: response.usage,
                },
                Err(err) => TurnOutcome::Failed(err),
            },
        }
    }

    async fn run_agentic_turn_streaming(
        &self,
        ctx: &CancellationToken,
        mapper: &mut StreamMapper,
        provider_request: ProviderRequest,
        writer: &dyn ResponseWriter,
    ) -> TurnOutcome {
        if ctx.is_cancelled() {
            return TurnOutcome::Cancelled;
        }

        let mut event_rx = match self.provider.stream(provider_request).await {
            Ok(rx) => rx,
            Err(err) => return TurnOutcome::Failed(err),
        };

        let mut accumulated_text = String::new();
        let mut terminal_item_status: Option<ItemStatus> = None;
        let mut usage = Usage::default();
        let mut first_token_recorded = false;
        let started_at = Instant::now();

        loop {
            tokio::select! {
                _ = ctx.cancelled() => return TurnOutcome::Cancelled,
                maybe_event = event_rx.recv() => {
                    let Some(event) = maybe_event else { break; };
                    match event {
                        ProviderEvent::Error { err } => return TurnOutcome::Failed(err),
                        ProviderEvent::Done { item_status, usage: turn_usage } => {
                            if let Some(status) = item_status {
                                terminal_item_status = Some(status);
                            }
                            if let Some(u) = turn_usage {
                                usage.add(u);
                            }
                        }
                        other => {
                            if let Err(err) = self
                                .process_provider_event(mapper, other, writer, &mut accumulated_text, &mut first_token_recorded, started_at)
                                .await
                            {
                                return TurnOutcome::Failed(err);
                            }
                        }
                    }
                }
            }
        }

        let status = match terminal_item_status {
            Some(ItemStatus::Incomplete) => ResponseStatus::Incomplete,
            Some(ItemStatus::Failed) => ResponseStatus::Failed,
            _ => ResponseStatus::Completed,
        };

        match self
            .finalize_stream_items(mapper, writer, accumulated_text, terminal_item_status)
            .await
        {
            Ok(items) => TurnOutcome::Ok { items, usage, status },
            Err(err) => TurnOutcome::Failed(err),
        }
    }

    fn find_executor(&self, tool_name: &str) -> Option<&Arc<dyn ToolExecutor>> {
        self.executors.iter().find(|e| e.name() == tool_name)
    }

    /// Dispatch every allowed call concurrently (spec §4.6 step 7a,
    /// `request.parallel_tool_calls = true`). Lifecycle start events are
    /// emitted for every call up front, in original order, before any
    /// dispatch begins; completion/failure events are emitted afterward, in
    /// the same original order, once every execution has resolved.
    async fn execute_parallel(
        &self,
        calls: &[ToolCall],
        mapper: &mut StreamMapper,
        writer: &dyn ResponseWriter,
    ) -> Result<Vec<(ToolResult, Item)>, ApiError> {
        for call in calls {
            self.emit_tool_lifecycle_start(call, mapper, writer).await?;
        }

        let futures = calls.iter().map(|call| async move {
            match self.find_executor(&call.name) {
                Some(executor) => match executor.execute(call).await {
                    Ok(output) => ToolResult::ok(call.call_id.clone(), output),
                    Err(err) => ToolResult::error(call.call_id.clone(), err),
                },
                None => ToolResult::error(call.call_id.clone(), "no executor registered for this tool"),
            }
        });
        let results = join_all(futures).await;

        let mut paired = Vec::with_capacity(calls.len());
        for (call, result) in calls.iter().zip(results.into_iter()) {
            self.emit_tool_lifecycle_end(call, result.is_error, mapper, writer).await?;
            let item = build_function_call_output_item(&result);
            self.emit_function_call_output_item(&item, mapper, writer).await?;
            paired.push((result, item));
        }

        Ok(paired)
    }

    /// Dispatch every allowed call one at a time, checking `ctx` between
    /// calls (spec §4.6 step 7b, `request.parallel_tool_calls = false`).
    async fn execute_sequential(
        &self,
        ctx: &CancellationToken,
        calls: &[ToolCall],
        mapper: &mut StreamMapper,
        writer: &dyn ResponseWriter,
    ) -> Result<Vec<(ToolResult, Item)>, ApiError> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            if ctx.is_cancelled() {
                let result = ToolResult::error(call.call_id.clone(), "request cancelled before this tool call executed");
                let item = build_function_call_output_item(&result);
                self.emit_function_call_output_item(&item, mapper, writer).await?;
                results.push((result, item));
                continue;
            }
            self.emit_tool_lifecycle_start(call, mapper, writer).await?;
            let result = match self.find_executor(&call.name) {
                Some(executor) => match executor.execute(call).await {
                    Ok(output) => ToolResult::ok(call.call_id.clone(), output),
                    Err(err) => ToolResult::error(call.call_id.clone(), err),
                },
                None => ToolResult::error(call.call_id.clone(), "no executor registered for this tool"),
            };
            self.emit_tool_lifecycle_end(call, result.is_error, mapper, writer).await?;
            let item = build_function_call_output_item(&result);
            self.emit_function_call_output_item(&item, mapper, writer).await?;
            results.push((result, item));
        }
        Ok(results)
    }

    async fn emit_tool_lifecycle_start(
        &self,
        call: &ToolCall,
        mapper: &mut StreamMapper,
        writer: &dyn ResponseWriter,
    ) -> Result<(), ApiError> {
        let Some(kind) = self.lifecycle_kind_for(call) else {
            return Ok(());
        };
        let output_index = mapper.alloc_output_index();
        let phase = if kind == ToolLifecycleKind::WebSearch {
            ToolLifecyclePhase::Searching
        } else {
            ToolLifecyclePhase::InProgress
        };
        writer
            .write_event(StreamEvent::ToolCallLifecycle {
                sequence_number: mapper.next_seq(),
                kind,
                phase,
                item_id: call.item_id.clone(),
                output_index,
            })
            .await
    }

    async fn emit_tool_lifecycle_end(
        &self,
        call: &ToolCall,
        is_error: bool,
        mapper: &mut StreamMapper,
        writer: &dyn ResponseWriter,
    ) -> Result<(), ApiError> {
        let Some(kind) = self.lifecycle_kind_for(call) else {
            return Ok(());
        };
        let phase = if is_error {
            ToolLifecyclePhase::Failed
        } else {
            ToolLifecyclePhase::Completed
        };
        writer
            .write_event(StreamEvent::ToolCallLifecycle {
                sequence_number: mapper.next_seq(),
                kind,
                phase,
                item_id: call.item_id.clone(),
                output_index: 0,
            })
            .await
    }

    /// Publish one `FunctionCallOutput` item as an `output_item.added` +
    /// `output_item.done` pair, incrementing `output_index` (spec §4.6 step
    /// 12). The item is already complete by the time this is called, so the
    /// pair is emitted back-to-back rather than straddling execution.
    async fn emit_function_call_output_item(
        &self,
        item: &Item,
        mapper: &mut StreamMapper,
        writer: &dyn ResponseWriter,
    ) -> Result<(), ApiError> {
        let output_index = mapper.alloc_output_index();
        writer
            .write_event(StreamEvent::OutputItemAdded {
                sequence_number: mapper.next_seq(),
                output_index,
                item: item.clone(),
            })
            .await?;
        writer
            .write_event(StreamEvent::OutputItemDone {
                sequence_number: mapper.next_seq(),
                output_index,
                item: item.clone(),
            })
            .await
    }

    /// Classify a call's tool-lifecycle kind by its executor's kind and the
    /// tool name (spec §4.6's streaming addendum). Plain function-call
    /// executors carry no lifecycle events.
    fn lifecycle_kind_for(&self, call: &ToolCall) -> Option<ToolLifecycleKind> {
        let executor = self.find_executor(&call.name)?;
        match executor.kind() {
            ExecutorKind::Mcp => Some(ToolLifecycleKind::Mcp),
            ExecutorKind::Builtin if call.name == "file_search" => Some(ToolLifecycleKind::FileSearch),
            ExecutorKind::Builtin if call.name == "web_search_preview" || call.name == "web_search" => {
                Some(ToolLifecycleKind::WebSearch)
            }
            _ => None,
        }
    }

    /// Write the sole terminal event (or response, for non-streaming) for
    /// an agentic request and persist the assembled response (spec §4.6
    /// step 9/10).
    #[allow(clippy::too_many_arguments)]
    async fn terminate_agentic(
        &self,
        mapper: &mut StreamMapper,
        writer: &dyn ResponseWriter,
        request: &CreateResponseRequest,
        response_id: &str,
        model: &str,
        status: ResponseStatus,
        items: Vec<Item>,
        usage: Usage,
        error: Option<crate::model::ResponseError>,
    ) -> Result<(), ApiError> {
        let incomplete_details =
            matches!(status, ResponseStatus::Incomplete).then(crate::model::IncompleteDetails::max_output_tokens);
        let response = self.assemble_response(response_id, request, model, status, items, usage, error, incomplete_details);

        if !request.stream {
            writer.write_response(response.clone()).await?;
            self.persist(&response).await;
            return Ok(());
        }

        let event = match status {
            ResponseStatus::Completed => StreamEvent::ResponseCompleted {
                sequence_number: mapper.next_seq(),
                response: response.clone(),
            },
            ResponseStatus::Incomplete => StreamEvent::ResponseIncomplete {
                sequence_number: mapper.next_seq(),
                response: response.clone(),
            },
            ResponseStatus::Failed => StreamEvent::ResponseFailed {
                sequence_number: mapper.next_seq(),
                response: response.clone(),
            },
            ResponseStatus::Cancelled => StreamEvent::ResponseCancelled {
                sequence_number: mapper.next_seq(),
                response: response.clone(),
            },
            ResponseStatus::RequiresAction => StreamEvent::ResponseRequiresAction {
                sequence_number: mapper.next_seq(),
                response: response.clone(),
            },
            ResponseStatus::InProgress => StreamEvent::ResponseInProgress {
                sequence_number: mapper.next_seq(),
                response: response.clone(),
            },
        };
        writer.write_event(event).await?;
        self.persist(&response).await;
        Ok(())
    }
}

/// Pull every `FunctionCall` item out of one turn's items, as parsed
/// `ToolCall`s for executor/filter/loop-detector use. The raw
/// `ItemKind::FunctionCall` items themselves (with their original
/// JSON-string arguments) remain available via `turn_items` for replay.
fn extract_tool_calls(turn_items: &[Item]) -> Vec<ToolCall> {
    turn_items
        .iter()
        .filter_map(|item| match &item.kind {
            ItemKind::FunctionCall { name, call_id, arguments } => {
                let parsed = serde_json::from_str(arguments).unwrap_or(serde_json::Value::Null);
                Some(ToolCall {
                    item_id: item.id.clone(),
                    call_id: call_id.clone(),
                    name: name.clone(),
                    arguments: parsed,
                })
            }
            _ => None,
        })
        .collect()
}

struct FilteredCalls {
    allowed: Vec<ToolCall>,
    rejected: Vec<ToolCall>,
}

/// Split tool calls into those permitted by `request.allowed_tools` and
/// those rejected by it (spec §4.6 step 6c). `None` allow-list permits
/// everything.
fn filter_allowed_tools(calls: &[ToolCall], allowed_tools: Option<&[String]>) -> FilteredCalls {
    let Some(allow_list) = allowed_tools else {
        return FilteredCalls { allowed: calls.to_vec(), rejected: Vec::new() };
    };
    let mut allowed = Vec::new();
    let mut rejected = Vec::new();
    for call in calls {
        if allow_list.iter().any(|name| name == &call.name) {
            allowed.push(call.clone());
        } else {
            rejected.push(call.clone());
        }
    }
    FilteredCalls { allowed, rejected }
}

/// Build the assistant message carrying every tool call from one turn, in
/// the model's original order and with its original raw-JSON argument
/// strings (spec §4.6 step 6a: the wire `tool_calls` field always lists
/// every call the model made, regardless of later allow-list filtering).
fn build_assistant_tool_calls_message(turn_items: &[Item]) -> ProviderMessage {
    let calls = turn_items
        .iter()
        .filter_map(|item| match &item.kind {
            ItemKind::FunctionCall { name, call_id, arguments } => Some(ProviderToolCall {
                id: call_id.clone(),
                kind: "function".to_string(),
                function: ProviderFunctionCall {
                    name: name.clone(),
                    arguments: arguments.clone(),
                },
            }),
            _ => None,
        })
        .collect();
    ProviderMessage::assistant_tool_calls(calls)
}

/// Synthesize the `FunctionCallOutput` Item for one tool result (spec §4.6
/// step 10): `{id, status: completed, call_id, output}`.
fn build_function_call_output_item(result: &ToolResult) -> Item {
    Item::function_call_output(ids::generate_item_id(), result.call_id.clone(), result.output.clone())
}
