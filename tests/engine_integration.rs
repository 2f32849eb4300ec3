//! End-to-end integration tests driving `Engine::create_response` through
//! the full translate → provider → mapper → writer → persist pipeline,
//! using only the scriptable test doubles in `support` (spec §8).

mod support;

use std::sync::Arc;

use antwort::model::{
    FunctionDefinition, Item, ItemKind, ItemStatus, ProviderEvent, ProviderResponse, ProviderResponseStatus,
    ResponseStatus, StreamEvent, ToolChoice, ToolChoiceMode, ToolDefinition, Usage,
};
use antwort::{EngineConfig, Engine};
use support::{request_with_input, InMemoryStore, ScriptedExecutor, ScriptedProvider, ScriptedTurn, VecWriter};
use tokio_util::sync::CancellationToken;

fn weather_tool() -> ToolDefinition {
    ToolDefinition::Function {
        function: FunctionDefinition {
            name: "get_weather".to_string(),
            description: None,
            parameters: None,
        },
    }
}

#[tokio::test]
async fn non_streaming_text_round_trip() {
    let provider = ScriptedProvider::new(vec![ScriptedTurn::Complete(ProviderResponse {
        model: "gpt-test".into(),
        status: ProviderResponseStatus::Completed,
        items: vec![Item::assistant_text("item_out", "hello there")],
        usage: Usage::new(10, 4),
    })]);
    let engine = Engine::new(Arc::new(provider), EngineConfig::default());
    let writer = VecWriter::default();

    engine
        .create_response(CancellationToken::new(), request_with_input("gpt-test", "hi"), &writer)
        .await
        .unwrap();

    let responses = writer.responses.lock().unwrap();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].status, ResponseStatus::Completed);
    assert_eq!(responses[0].usage.total_tokens, 14);
    assert!(writer.events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn streaming_deltas_concatenate_to_the_final_text() {
    let events = vec![
        ProviderEvent::TextDelta { delta: "hel".to_string() },
        ProviderEvent::TextDelta { delta: "lo wo".to_string() },
        ProviderEvent::TextDelta { delta: "rld".to_string() },
        ProviderEvent::TextDone { r#final: "hello world".to_string() },
        ProviderEvent::Done {
            item_status: Some(ItemStatus::Completed),
            usage: Some(Usage::new(7, 3)),
        },
    ];
    let provider = ScriptedProvider::new(vec![ScriptedTurn::Stream(events)]);
    let engine = Engine::new(Arc::new(provider), EngineConfig::default());
    let writer = VecWriter::default();
    let mut request = request_with_input("gpt-test", "hi");
    request.stream = true;

    engine.create_response(CancellationToken::new(), request, &writer).await.unwrap();

    let events = writer.events.lock().unwrap();
    let seqs: Vec<u64> = events.iter().map(|e| e.sequence_number()).collect();
    let mut sorted = seqs.clone();
    sorted.sort_unstable();
    assert_eq!(seqs, sorted, "sequence numbers must be strictly increasing");

    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);

    let deltas: String = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::OutputTextDelta { delta, .. } => Some(delta.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(deltas, "hello world");

    match events.last().unwrap() {
        StreamEvent::ResponseCompleted { response, .. } => {
            assert_eq!(response.output.len(), 1);
            assert_eq!(response.usage.total_tokens, 10);
        }
        other => panic!("expected response.completed, got {other:?}"),
    }
}

#[tokio::test]
async fn two_turn_agentic_loop_calls_tool_then_finishes() {
    let provider = ScriptedProvider::new(vec![
        ScriptedTurn::Complete(ProviderResponse {
            model: "gpt-test".into(),
            status: ProviderResponseStatus::Completed,
            items: vec![Item::function_call("item_call", "get_weather", "call_1", "{\"city\":\"NYC\"}")],
            usage: Usage::new(6, 2),
        }),
        ScriptedTurn::Complete(ProviderResponse {
            model: "gpt-test".into(),
            status: ProviderResponseStatus::Completed,
            items: vec![Item::assistant_text("item_final", "it's sunny in NYC")],
            usage: Usage::new(9, 5),
        }),
    ]);
    let executor = Arc::new(ScriptedExecutor::ok("get_weather", "sunny, 72F"));
    let engine = Engine::new(Arc::new(provider), EngineConfig::default()).with_executor(executor.clone());
    let writer = VecWriter::default();
    let mut request = request_with_input("gpt-test", "what's the weather in NYC?");
    request.tools.push(weather_tool());

    engine.create_response(CancellationToken::new(), request, &writer).await.unwrap();

    let responses = writer.responses.lock().unwrap();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].status, ResponseStatus::Completed);
    assert_eq!(responses[0].output.len(), 3);
    match &responses[0].output[1].kind {
        ItemKind::FunctionCallOutput { call_id, output } => {
            assert_eq!(call_id, "call_1");
            assert_eq!(output, "sunny, 72F");
        }
        other => panic!("expected function_call_output item, got {other:?}"),
    }
    assert_eq!(responses[0].output[1].status, ItemStatus::Completed);
    assert_eq!(responses[0].usage.total_tokens, 22);
    assert_eq!(executor.calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn tool_call_with_no_registered_executor_requires_action() {
    let provider = ScriptedProvider::new(vec![ScriptedTurn::Complete(ProviderResponse {
        model: "gpt-test".into(),
        status: ProviderResponseStatus::Completed,
        items: vec![Item::function_call("item_call", "get_weather", "call_1", "{}")],
        usage: Usage::default(),
    })]);
    let unrelated_executor = Arc::new(ScriptedExecutor::ok("send_email", "sent"));
    let engine = Engine::new(Arc::new(provider), EngineConfig::default()).with_executor(unrelated_executor);
    let writer = VecWriter::default();
    let mut request = request_with_input("gpt-test", "what's the weather?");
    request.tools.push(weather_tool());

    engine.create_response(CancellationToken::new(), request, &writer).await.unwrap();

    let responses = writer.responses.lock().unwrap();
    assert_eq!(responses[0].status, ResponseStatus::RequiresAction);
}

#[tokio::test]
async fn exhausting_max_tool_calls_yields_incomplete() {
    let turns: Vec<ScriptedTurn> = (0..5)
        .map(|i| {
            ScriptedTurn::Complete(ProviderResponse {
                model: "gpt-test".into(),
                status: ProviderResponseStatus::Completed,
                items: vec![Item::function_call(format!("item_{i}"), "get_weather", format!("call_{i}"), "{}")],
                usage: Usage::default(),
            })
        })
        .collect();
    let provider = ScriptedProvider::new(turns);
    let executor = Arc::new(ScriptedExecutor::ok("get_weather", "sunny"));
    let engine = Engine::new(Arc::new(provider), EngineConfig::default())
        .with_executor(executor.clone())
        .with_loop_detector(None);
    let writer = VecWriter::default();
    let mut request = request_with_input("gpt-test", "weather, repeatedly");
    request.tools.push(weather_tool());
    request.max_tool_calls = Some(3);

    engine.create_response(CancellationToken::new(), request, &writer).await.unwrap();

    let responses = writer.responses.lock().unwrap();
    assert_eq!(responses[0].status, ResponseStatus::Incomplete);
    assert_eq!(executor.calls.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn finish_reason_length_surfaces_as_incomplete_even_with_tools_configured() {
    let provider = ScriptedProvider::new(vec![ScriptedTurn::Complete(ProviderResponse {
        model: "gpt-test".into(),
        status: ProviderResponseStatus::Incomplete,
        items: vec![Item::assistant_text("item_out", "the weather in NYC is cut off mid-sent")],
        usage: Usage::new(20, 256),
    })]);
    let executor = Arc::new(ScriptedExecutor::ok("get_weather", "sunny"));
    let engine = Engine::new(Arc::new(provider), EngineConfig::default()).with_executor(executor.clone());
    let writer = VecWriter::default();
    let mut request = request_with_input("gpt-test", "describe the weather at length");
    request.tools.push(weather_tool());
    request.max_output_tokens = Some(256);

    engine.create_response(CancellationToken::new(), request, &writer).await.unwrap();

    let responses = writer.responses.lock().unwrap();
    assert_eq!(responses[0].status, ResponseStatus::Incomplete);
    assert_eq!(responses[0].incomplete_details.as_ref().unwrap().reason, "max_output_tokens");
    assert_eq!(executor.calls.lock().unwrap().len(), 0);
}

#[tokio::test]
async fn tool_choice_none_short_circuits_the_agentic_loop() {
    let provider = ScriptedProvider::new(vec![ScriptedTurn::Complete(ProviderResponse {
        model: "gpt-test".into(),
        status: ProviderResponseStatus::Completed,
        items: vec![Item::function_call("item_call", "get_weather", "call_1", "{}")],
        usage: Usage::default(),
    })]);
    let executor = Arc::new(ScriptedExecutor::ok("get_weather", "sunny"));
    let engine = Engine::new(Arc::new(provider), EngineConfig::default()).with_executor(executor.clone());
    let writer = VecWriter::default();
    let mut request = request_with_input("gpt-test", "weather?");
    request.tools.push(weather_tool());
    request.tool_choice = ToolChoice::Mode(ToolChoiceMode::None);

    engine.create_response(CancellationToken::new(), request, &writer).await.unwrap();

    assert_eq!(executor.calls.lock().unwrap().len(), 0);
    let responses = writer.responses.lock().unwrap();
    assert_eq!(responses[0].status, ResponseStatus::Completed);
}

#[tokio::test]
async fn previous_response_id_splices_prior_turns_into_history() {
    let store = Arc::new(InMemoryStore::default());
    let provider = Arc::new(ScriptedProvider::new(vec![ScriptedTurn::Complete(ProviderResponse {
        model: "gpt-test".into(),
        status: ProviderResponseStatus::Completed,
        items: vec![Item::assistant_text("item_first", "first answer")],
        usage: Usage::new(3, 2),
    })]));
    let engine = Engine::new(provider.clone(), EngineConfig::default()).with_store(store.clone());
    let writer = VecWriter::default();

    engine
        .create_response(CancellationToken::new(), request_with_input("gpt-test", "first question"), &writer)
        .await
        .unwrap();
    let first_id = writer.responses.lock().unwrap()[0].id.clone();

    let provider2 = ScriptedProvider::new(vec![ScriptedTurn::Complete(ProviderResponse {
        model: "gpt-test".into(),
        status: ProviderResponseStatus::Completed,
        items: vec![Item::assistant_text("item_second", "second answer")],
        usage: Usage::new(3, 2),
    })]);
    let engine2 = Engine::new(Arc::new(provider2), EngineConfig::default()).with_store(store);
    let mut follow_up = request_with_input("gpt-test", "follow-up question");
    follow_up.previous_response_id = Some(first_id.clone());

    engine2.create_response(CancellationToken::new(), follow_up, &writer).await.unwrap();

    let responses = writer.responses.lock().unwrap();
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[1].previous_response_id.as_deref(), Some(first_id.as_str()));
}

#[tokio::test]
async fn cancellation_before_dispatch_yields_cancelled_status() {
    let provider = ScriptedProvider::new(vec![ScriptedTurn::Complete(ProviderResponse {
        model: "gpt-test".into(),
        status: ProviderResponseStatus::Completed,
        items: vec![],
        usage: Usage::default(),
    })]);
    let engine = Engine::new(Arc::new(provider), EngineConfig::default());
    let writer = VecWriter::default();
    let ctx = CancellationToken::new();
    ctx.cancel();

    engine.create_response(ctx, request_with_input("gpt-test", "hi"), &writer).await.unwrap();

    let responses = writer.responses.lock().unwrap();
    assert_eq!(responses[0].status, ResponseStatus::Cancelled);
}
