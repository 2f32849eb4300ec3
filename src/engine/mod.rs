//! The Engine Orchestrator (spec §4.5): the single-request entry point that
//! validates, translates, invokes a `Provider`, and writes lifecycle events
//! through a `ResponseWriter`.
//!
//! Grounded on the teacher's `chat_loop_with_tools` (`llm/helpers.rs`) for
//! the overall call/react/respond shape, generalized from the teacher's
//! single in-memory conversation to the full OpenResponses request/response
//! cycle (pre-flight validation, translation, history reconstruction,
//! streaming lifecycle events, persistence). The multi-turn tool-calling
//! half of `chat_loop_with_tools` is `agentic::run_agentic`, a sibling
//! module; this file owns only the single-shot primitives both paths share.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::agentic::loop_detector::LoopDetectorConfig;
use crate::capability::validate_request;
use crate::config::EngineConfig;
use crate::error::ApiError;
use crate::executor::{ExecutorKind, ToolExecutor};
use crate::history;
use crate::ids;
use crate::metrics::{MetricsSink, NoopMetrics};
use crate::model::{
    CreateResponseRequest, Item, ItemKind, ItemStatus, MessageRole, OutputContentPart,
    ProviderEvent, ProviderRequest, ProviderResponseStatus, Response, ResponseError,
    ResponseStatus, StreamEvent, TextFormat, TextOptions, ToolDefinition, Usage,
};
use crate::provider::Provider;
use crate::store::ResponseStore;
use crate::stream::StreamMapper;
use crate::translate;
use crate::writer::ResponseWriter;

/// The gateway core: one `Engine` serves many `create_response` calls
/// against a single backend `Provider`, an optional `ResponseStore`, and
/// zero or more `ToolExecutor`s.
pub struct Engine {
    pub(crate) config: EngineConfig,
    pub(crate) provider: Arc<dyn Provider>,
    pub(crate) store: Option<Arc<dyn ResponseStore>>,
    pub(crate) executors: Vec<Arc<dyn ToolExecutor>>,
    pub(crate) metrics: Arc<dyn MetricsSink>,
    pub(crate) builtins: translate::BuiltinToolRegistrations,
    pub(crate) loop_detector_config: Option<LoopDetectorConfig>,
}

impl Engine {
    pub fn new(provider: Arc<dyn Provider>, config: EngineConfig) -> Self {
        Self {
            config,
            provider,
            store: None,
            executors: Vec::new(),
            metrics: Arc::new(NoopMetrics),
            builtins: translate::BuiltinToolRegistrations::new(),
            loop_detector_config: Some(LoopDetectorConfig::default()),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn ResponseStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn ToolExecutor>) -> Self {
        self.executors.push(executor);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Register the function definition a built-in tool stub (spec §4.1
    /// rule 8) expands to, e.g. `("file_search", FunctionDefinition{..})`.
    pub fn with_builtin_tool(mut self, stub_type: &'static str, definition: crate::model::FunctionDefinition) -> Self {
        self.builtins.insert(stub_type, definition);
        self
    }

    /// `None` disables loop detection entirely.
    pub fn with_loop_detector(mut self, config: Option<LoopDetectorConfig>) -> Self {
        self.loop_detector_config = config;
        self
    }

    /// Serve one `CreateResponseRequest` (spec §4.5). Dispatches to the
    /// agentic loop when tool execution applies, else to the single-shot
    /// streaming or non-streaming path.
    pub async fn create_response(
        &self,
        ctx: CancellationToken,
        mut request: CreateResponseRequest,
        writer: &dyn ResponseWriter,
    ) -> Result<(), ApiError> {
        let model = request
            .model
            .clone()
            .or_else(|| self.config.default_model.clone())
            .ok_or_else(|| {
                ApiError::invalid_request("model", "model is required and no default_model is configured")
            })?;

        validate_request(&request, &self.provider.capabilities())?;

        request.tools = self.merge_tools(&request).await?;

        let mut provider_request = translate::translate_request(&request, &model, &self.builtins);

        if let Some(previous_id) = request.previous_response_id.clone() {
            let store = self.store.as_ref().ok_or_else(|| {
                ApiError::invalid_request(
                    "previous_response_id",
                    "no response store is configured to resolve previous_response_id",
                )
            })?;
            let history_messages = history::reconstruct_history(store.as_ref(), &previous_id).await?;
            let has_instructions = request
                .instructions
                .as_deref()
                .is_some_and(|s| !s.is_empty());
            let insert_at = if has_instructions { 1 } else { 0 }.min(provider_request.messages.len());
            let tail = provider_request.messages.split_off(insert_at);
            provider_request.messages.extend(history_messages);
            provider_request.messages.extend(tail);
        }

        let tools_present = provider_request.tools.as_ref().is_some_and(|t| !t.is_empty());
        let run_agentic = !self.executors.is_empty() && tools_present && !request.forbids_tool_calls();

        let response_id = ids::generate_response_id();

        if run_agentic {
            return self
                .run_agentic(ctx, response_id, &request, &model, provider_request, writer)
                .await;
        }

        if request.stream {
            self.run_single_shot_streaming(&ctx, &response_id, &model, &request, provider_request, writer)
                .await
        } else {
            self.run_single_shot_non_streaming(&ctx, &response_id, &model, &request, provider_request, writer)
                .await
        }
    }

    /// Merge MCP-discovered tool definitions into the request's explicit
    /// tools, explicit tools winning by name (spec §4.5 step 3).
    async fn merge_tools(&self, request: &CreateResponseRequest) -> Result<Vec<ToolDefinition>, ApiError> {
        let has_mcp = self.executors.iter().any(|e| e.kind() == ExecutorKind::Mcp);
        if !has_mcp {
            return Ok(request.tools.clone());
        }

        let mut discovered = Vec::new();
        for executor in self.executors.iter().filter(|e| e.kind() == ExecutorKind::Mcp) {
            discovered.extend(executor.discover_tools().await?);
        }

        let explicit_names: std::collections::HashSet<&str> =
            request.tools.iter().filter_map(|t| t.function_name()).collect();
        let mut merged: Vec<ToolDefinition> = discovered
            .into_iter()
            .filter(|t| match t.function_name() {
                Some(name) => !explicit_names.contains(name),
                None => true,
            })
            .collect();
        merged.extend(request.tools.clone());
        Ok(merged)
    }

    pub(crate) fn assemble_response(
        &self,
        response_id: &str,
        request: &CreateResponseRequest,
        model: &str,
        status: ResponseStatus,
        output: Vec<Item>,
        usage: Usage,
        error: Option<ResponseError>,
        incomplete_details: Option<crate::model::IncompleteDetails>,
    ) -> Response {
        Response {
            id: response_id.to_string(),
            object: "response".to_string(),
            status,
            output,
            input: request.input.clone(),
            model: model.to_string(),
            usage,
            error,
            previous_response_id: request.previous_response_id.clone(),
            created_at: now_unix(),
            tools: request.tools.clone(),
            tool_choice: request.tool_choice.clone(),
            truncation: request.truncation,
            store: request.store.unwrap_or(true),
            text: request.text_format.clone().unwrap_or_else(|| TextOptions {
                format: Some(TextFormat::default()),
            }),
            service_tier: request
                .service_tier
                .clone()
                .unwrap_or_else(|| "default".to_string()),
            metadata: request.metadata.clone(),
            temperature: request.temperature,
            top_p: request.top_p,
            max_output_tokens: request.max_output_tokens,
            incomplete_details,
        }
    }

    pub(crate) async fn persist(&self, response: &Response) {
        if !response.store {
            return;
        }
        if let Some(store) = &self.store {
            if let Err(err) = store.save_response(response).await {
                tracing::warn!(response_id = %response.id, error = %err.message, "failed to persist response");
            }
        }
    }

    async fn run_single_shot_non_streaming(
        &self,
        ctx: &CancellationToken,
        response_id: &str,
        model: &str,
        request: &CreateResponseRequest,
        provider_request: ProviderRequest,
        writer: &dyn ResponseWriter,
    ) -> Result<(), ApiError> {
        if ctx.is_cancelled() {
            let response = self.assemble_response(response_id, request, model, ResponseStatus::Cancelled, Vec::new(), Usage::default(), None, None);
            writer.write_response(response.clone()).await?;
            self.persist(&response).await;
            return Ok(());
        }

        let provider_response = tokio::select! {
            _ = ctx.cancelled() => {
                let response = self.assemble_response(response_id, request, model, ResponseStatus::Cancelled, Vec::new(), Usage::default(), None, None);
                writer.write_response(response.clone()).await?;
                self.persist(&response).await;
                return Ok(());
            }
            result = self.provider.complete(provider_request) => result?,
        };

        if provider_response.status == ProviderResponseStatus::Failed && provider_response.items.is_empty() {
            return Err(ApiError::server_error("backend produced no output"));
        }

        let status = response_status_from_provider(provider_response.status);
        let incomplete_details =
            matches!(status, ResponseStatus::Incomplete).then(crate::model::IncompleteDetails::max_output_tokens);

        let response = self.assemble_response(
            response_id,
            request,
            model,
            status,
            provider_response.items,
            provider_response.usage,
            None,
            incomplete_details,
        );

        writer.write_response(response.clone()).await?;
        self.persist(&response).await;
        Ok(())
    }

    async fn run_single_shot_streaming(
        &self,
        ctx: &CancellationToken,
        response_id: &str,
        model: &str,
        request: &CreateResponseRequest,
        provider_request: ProviderRequest,
        writer: &dyn ResponseWriter,
    ) -> Result<(), ApiError> {
        let mut mapper = StreamMapper::new();

        if ctx.is_cancelled() {
            let response = self.assemble_response(response_id, request, model, ResponseStatus::Cancelled, Vec::new(), Usage::default(), None, None);
            writer
                .write_event(StreamEvent::ResponseCancelled {
                    sequence_number: mapper.next_seq(),
                    response: response.clone(),
                })
                .await?;
            self.persist(&response).await;
            return Ok(());
        }

        let skeleton = self.assemble_response(
            response_id,
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

        let mut event_rx = match self.provider.stream(provider_request).await {
            Ok(rx) => rx,
            Err(err) => {
                let response = self.assemble_response(
                    response_id,
                    request,
                    model,
                    ResponseStatus::Failed,
                    Vec::new(),
                    Usage::default(),
                    Some(ResponseError::from(&err)),
                    None,
                );
                writer
                    .write_event(StreamEvent::ResponseFailed {
                        sequence_number: mapper.next_seq(),
                        response: response.clone(),
                    })
                    .await?;
                self.persist(&response).await;
                return Ok(());
            }
        };

        let mut accumulated_text = String::new();
        let mut terminal_item_status: Option<ItemStatus> = None;
        let mut usage = Usage::default();
        let mut first_token_recorded = false;
        let started_at = Instant::now();

        loop {
            tokio::select! {
                _ = ctx.cancelled() => {
                    let response = self.assemble_response(response_id, request, model, ResponseStatus::Cancelled, Vec::new(), usage, None, None);
                    writer.write_event(StreamEvent::ResponseCancelled {
                        sequence_number: mapper.next_seq(),
                        response: response.clone(),
                    }).await?;
                    self.persist(&response).await;
                    return Ok(());
                }
                maybe_event = event_rx.recv() => {
                    let Some(event) = maybe_event else { break; };
                    match event {
                        ProviderEvent::Error { err } => {
                            let response = self.assemble_response(response_id, request, model, ResponseStatus::Failed, Vec::new(), usage, Some(ResponseError::from(&err)), None);
                            writer.write_event(StreamEvent::ResponseFailed {
                                sequence_number: mapper.next_seq(),
                                response: response.clone(),
                            }).await?;
                            self.persist(&response).await;
                            return Ok(());
                        }
                        ProviderEvent::Done { item_status, usage: turn_usage } => {
                            if let Some(status) = item_status {
                                terminal_item_status = Some(status);
                            }
                            if let Some(u) = turn_usage {
                                usage.add(u);
                            }
                        }
                        other => {
                            self.process_provider_event(&mut mapper, other, writer, &mut accumulated_text, &mut first_token_recorded, started_at).await?;
                        }
                    }
                }
            }
        }

        let items = self
            .finalize_stream_items(&mut mapper, writer, accumulated_text, terminal_item_status)
            .await?;
        let item_status = terminal_item_status.unwrap_or(ItemStatus::Completed);
        let status = match item_status {
            ItemStatus::Incomplete => ResponseStatus::Incomplete,
            ItemStatus::Failed => ResponseStatus::Failed,
            _ => ResponseStatus::Completed,
        };
        let incomplete_details =
            matches!(status, ResponseStatus::Incomplete).then(crate::model::IncompleteDetails::max_output_tokens);

        let response = self.assemble_response(response_id, request, model, status, items, usage, None, incomplete_details);
        // A single-shot stream reports only completed/failed at the wire
        // level (spec §4.5's documented asymmetry: an incomplete single-shot
        // turn still emits `response.completed`, carrying
        // `incomplete_details`, since there is no further turn to retry).
        let event = match status {
            ResponseStatus::Failed => StreamEvent::ResponseFailed {
                sequence_number: mapper.next_seq(),
                response: response.clone(),
            },
            _ => StreamEvent::ResponseCompleted {
                sequence_number: mapper.next_seq(),
                response: response.clone(),
            },
        };
        writer.write_event(event).await?;
        self.persist(&response).await;
        Ok(())
    }

    /// Process one non-terminal `ProviderEvent`: emits the text message's
    /// own `output_item.added`/`content_part.added` on first real text
    /// (spec §4.4: "content-part lifecycle for text ... is emitted by the
    /// orchestrator, not the mapper"), then maps the event and writes
    /// whatever the mapper produces, tracking accumulated text and the
    /// first-token metric as it goes. Shared by the single-shot and
    /// agentic-loop streaming paths.
    pub(crate) async fn process_provider_event(
        &self,
        mapper: &mut StreamMapper,
        event: ProviderEvent,
        writer: &dyn ResponseWriter,
        accumulated_text: &mut String,
        first_token_recorded: &mut bool,
        started_at: Instant,
    ) -> Result<(), ApiError> {
        let is_real_text_start =
            matches!(&event, ProviderEvent::TextDelta { delta } if !delta.is_empty()) && mapper.text_item_id().is_none();

        if is_real_text_start {
            let (flush, item_id, output_index) = mapper.begin_text_item();
            for ev in flush {
                writer.write_event(ev).await?;
            }
            writer
                .write_event(StreamEvent::OutputItemAdded {
                    sequence_number: mapper.next_seq(),
                    output_index,
                    item: Item::new(
                        item_id.clone(),
                        ItemStatus::InProgress,
                        ItemKind::Message {
                            role: MessageRole::Assistant,
                            inbound_parts: Vec::new(),
                            outbound_parts: Vec::new(),
                        },
                    ),
                })
                .await?;
            writer
                .write_event(StreamEvent::ContentPartAdded {
                    sequence_number: mapper.next_seq(),
                    item_id,
                    output_index,
                    content_index: 0,
                    part: OutputContentPart::OutputText { text: String::new() },
                })
                .await?;
        }

        for mapped in mapper.map(event) {
            if let StreamEvent::OutputTextDelta { delta, .. } = &mapped {
                accumulated_text.push_str(delta);
                if !*first_token_recorded {
                    *first_token_recorded = true;
                    self.metrics
                        .record_time_to_first_token(started_at.elapsed().as_millis() as u64);
                }
            }
            writer.write_event(mapped).await?;
        }

        Ok(())
    }

    /// Finalize one turn's streamed items: force-flush any pending reasoning,
    /// close out the text message (if one started), and drain the mapper's
    /// completed tool-call items — in that order, matching the invariant
    /// that reasoning precedes the text message item in `output`. Resets
    /// the mapper's per-turn state before returning. Shared by the
    /// single-shot streaming path and each agentic-loop turn.
    pub(crate) async fn finalize_stream_items(
        &self,
        mapper: &mut StreamMapper,
        writer: &dyn ResponseWriter,
        accumulated_text: String,
        terminal_item_status: Option<ItemStatus>,
    ) -> Result<Vec<Item>, ApiError> {
        let item_status = terminal_item_status.unwrap_or(ItemStatus::Completed);
        let mut items = Vec::new();

        for ev in mapper.flush_reasoning() {
            writer.write_event(ev).await?;
        }
        items.extend(std::mem::take(&mut mapper.reasoning_items));

        if mapper.text_started() {
            if let (Some(item_id), Some(output_index)) =
                (mapper.text_item_id().map(str::to_string), mapper.text_output_index())
            {
                writer
                    .write_event(StreamEvent::OutputTextDone {
                        sequence_number: mapper.next_seq(),
                        item_id: item_id.clone(),
                        output_index,
                        content_index: 0,
                        delta: accumulated_text.clone(),
                    })
                    .await?;
                writer
                    .write_event(StreamEvent::ContentPartDone {
                        sequence_number: mapper.next_seq(),
                        item_id: item_id.clone(),
                        output_index,
                        content_index: 0,
                        part: OutputContentPart::OutputText {
                            text: accumulated_text.clone(),
                        },
                    })
                    .await?;
                let message_item = Item::new(
                    item_id,
                    item_status,
                    ItemKind::Message {
                        role: MessageRole::Assistant,
                        inbound_parts: Vec::new(),
                        outbound_parts: vec![OutputContentPart::OutputText { text: accumulated_text }],
                    },
                );
                writer
                    .write_event(StreamEvent::OutputItemDone {
                        sequence_number: mapper.next_seq(),
                        output_index,
                        item: message_item.clone(),
                    })
                    .await?;
                items.push(message_item);
            }
        }

        items.extend(std::mem::take(&mut mapper.completed_tool_calls));
        mapper.reset_for_next_turn();

        Ok(items)
    }
}

pub(crate) fn response_status_from_provider(status: ProviderResponseStatus) -> ResponseStatus {
    match status {
        ProviderResponseStatus::Completed => ResponseStatus::Completed,
        ProviderResponseStatus::Incomplete => ResponseStatus::Incomplete,
        ProviderResponseStatus::Failed => ResponseStatus::Failed,
    }
}

pub(crate) fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::ProviderCapabilities;
    use crate::model::ProviderResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    struct StaticProvider {
        response: ProviderResponse,
    }

    #[async_trait]
    impl Provider for StaticProvider {
        fn name(&self) -> &str {
            "static"
        }

        fn capabilities(&self) -> ProviderCapabilities {
            ProviderCapabilities {
                streaming: true,
                tool_calling: true,
                vision: true,
                audio: true,
                reasoning: true,
                max_context_window: None,
                supported_models: None,
            }
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ApiError> {
            Ok(self.response.clone())
        }

        async fn stream(&self, _request: ProviderRequest) -> Result<mpsc::Receiver<ProviderEvent>, ApiError> {
            let (tx, rx) = mpsc::channel(8);
            let text = self
                .response
                .items
                .iter()
                .find_map(|item| match &item.kind {
                    ItemKind::Message { outbound_parts, .. } => outbound_parts.first().map(|p| match p {
                        OutputContentPart::OutputText { text } => text.clone(),
                    }),
                    _ => None,
                })
                .unwrap_or_default();
            tokio::spawn(async move {
                let _ = tx.send(ProviderEvent::TextDelta { delta: text.clone() }).await;
                let _ = tx.send(ProviderEvent::TextDone { r#final: text }).await;
                let _ = tx
                    .send(ProviderEvent::Done {
                        item_status: Some(ItemStatus::Completed),
                        usage: Some(Usage::new(5, 3)),
                    })
                    .await;
            });
            Ok(rx)
        }
    }

    #[derive(Default)]
    struct VecWriter {
        responses: Mutex<Vec<Response>>,
        events: Mutex<Vec<StreamEvent>>,
    }

    #[async_trait]
    impl ResponseWriter for VecWriter {
        async fn write_response(&self, response: Response) -> Result<(), ApiError> {
            self.responses.lock().unwrap().push(response);
            Ok(())
        }

        async fn write_event(&self, event: StreamEvent) -> Result<(), ApiError> {
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }

    fn base_request() -> CreateResponseRequest {
        let mut req: CreateResponseRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        req.model = Some("gpt-test".to_string());
        req.input.push(Item::user_text("item_in", "hello"));
        req
    }

    #[tokio::test]
    async fn non_streaming_create_response_writes_exactly_one_response() {
        let response = ProviderResponse {
            model: "gpt-test".into(),
            status: ProviderResponseStatus::Completed,
            items: vec![Item::assistant_text("item_out", "hi there")],
            usage: Usage::new(5, 3),
        };
        let engine = Engine::new(Arc::new(StaticProvider { response }), EngineConfig::default());
        let writer = VecWriter::default();

        engine
            .create_response(CancellationToken::new(), base_request(), &writer)
            .await
            .unwrap();

        let responses = writer.responses.lock().unwrap();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].status, ResponseStatus::Completed);
        assert_eq!(responses[0].output.len(), 1);
        assert!(writer.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn streaming_create_response_emits_monotonic_sequence_with_one_terminal_event() {
        let response = ProviderResponse {
            model: "gpt-test".into(),
            status: ProviderResponseStatus::Completed,
            items: vec![Item::assistant_text("item_out", "streamed text")],
            usage: Usage::new(5, 3),
        };
        let engine = Engine::new(Arc::new(StaticProvider { response }), EngineConfig::default());
        let writer = VecWriter::default();
        let mut request = base_request();
        request.stream = true;

        engine
            .create_response(CancellationToken::new(), request, &writer)
            .await
            .unwrap();

        let events = writer.events.lock().unwrap();
        assert!(writer.responses.lock().unwrap().is_empty());

        let seqs: Vec<u64> = events.iter().map(|e| e.sequence_number()).collect();
        let mut sorted = seqs.clone();
        sorted.sort_unstable();
        assert_eq!(seqs, sorted);
        for w in seqs.windows(2) {
            assert!(w[1] > w[0]);
        }

        let terminal_count = events.iter().filter(|e| e.is_terminal()).count();
        assert_eq!(terminal_count, 1);
        assert!(matches!(events.last().unwrap(), StreamEvent::ResponseCompleted { .. }));
    }

    #[tokio::test]
    async fn model_required_when_no_default_configured() {
        let response = ProviderResponse {
            model: "gpt-test".into(),
            status: ProviderResponseStatus::Completed,
            items: vec![],
            usage: Usage::default(),
        };
        let engine = Engine::new(Arc::new(StaticProvider { response }), EngineConfig::default());
        let writer = VecWriter::default();
        let mut request = base_request();
        request.model = None;

        let err = engine
            .create_response(CancellationToken::new(), request, &writer)
            .await
            .unwrap_err();
        assert_eq!(err.param.as_deref(), Some("model"));
    }

    #[tokio::test]
    async fn cancelled_before_dispatch_writes_cancelled_response() {
        let response = ProviderResponse {
            model: "gpt-test".into(),
            status: ProviderResponseStatus::Completed,
            items: vec![],
            usage: Usage::default(),
        };
        let engine = Engine::new(Arc::new(StaticProvider { response }), EngineConfig::default());
        let writer = VecWriter::default();
        let ctx = CancellationToken::new();
        ctx.cancel();

        engine.create_response(ctx, base_request(), &writer).await.unwrap();

        let responses = writer.responses.lock().unwrap();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].status, ResponseStatus::Cancelled);
    }

    #[test]
    fn assemble_response_defaults_text_format_to_text() {
        let response = ProviderResponse {
            model: "gpt-test".into(),
            status: ProviderResponseStatus::Completed,
            items: vec![],
            usage: Usage::default(),
        };
        let engine = Engine::new(Arc::new(StaticProvider { response }), EngineConfig::default());
        let request = base_request();
        let assembled = engine.assemble_response(
            "resp_1",
            &request,
            "gpt-test",
            ResponseStatus::Completed,
            vec![],
            Usage::default(),
            None,
            None,
        );
        assert_eq!(assembled.text.format.unwrap().kind, "text");
        assert!(assembled.store);
    }
}
