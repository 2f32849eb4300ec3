//! Shared test doubles for integration tests (spec §8): an in-memory
//! `ResponseStore`, a `VecResponseWriter`, a scriptable `Provider`, and a
//! scriptable `ToolExecutor`.
//!
//! Grounded on the teacher's own test doubles in `llm/tests.rs`
//! (canned-response providers keyed by call count) and `llm/registry.rs`'s
//! `BashTool`-backed tool tests, generalized from "one real tool" to "a
//! fully scriptable fake" since the core is tested without a live backend.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use antwort::executor::{ExecutorKind, ToolExecutor};
use antwort::model::{
    CreateResponseRequest, Item, ProviderEvent, ProviderRequest, ProviderResponse, Response,
    StreamEvent, ToolCall,
};
use antwort::{ApiError, ApiErrorKind, ProviderCapabilities, ResponseStore, ResponseWriter};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// In-memory `ResponseStore` (spec §6) keyed by response id.
#[derive(Default)]
pub struct InMemoryStore(Mutex<HashMap<String, Response>>);

#[async_trait]
impl ResponseStore for InMemoryStore {
    async fn get_response(&self, id: &str) -> Result<Option<Response>, ApiError> {
        Ok(self.0.lock().unwrap().get(id).cloned())
    }

    async fn save_response(&self, response: &Response) -> Result<(), ApiError> {
        self.0
            .lock()
            .unwrap()
            .insert(response.id.clone(), response.clone());
        Ok(())
    }
}

/// Collects everything written through it, in call order.
#[derive(Default)]
pub struct VecWriter {
    pub responses: Mutex<Vec<Response>>,
    pub events: Mutex<Vec<StreamEvent>>,
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

/// One scripted provider turn: either a canned non-streaming response or a
/// canned sequence of streaming events (terminated by the caller with its
/// own `Done`).
pub enum ScriptedTurn {
    Complete(ProviderResponse),
    Stream(Vec<ProviderEvent>),
}

/// A `Provider` that plays back a fixed script of turns in order, erroring
/// once the script is exhausted. Supports both `complete` and `stream` so
/// the same script can drive either call shape depending on which method
/// the engine actually calls for a given request.
pub struct ScriptedProvider {
    turns: Mutex<Vec<ScriptedTurn>>,
    capabilities: ProviderCapabilities,
}

impl ScriptedProvider {
    pub fn new(turns: Vec<ScriptedTurn>) -> Self {
        Self {
            turns: Mutex::new(turns),
            capabilities: ProviderCapabilities {
                streaming: true,
                tool_calling: true,
                vision: false,
                audio: false,
                reasoning: false,
                max_context_window: None,
                supported_models: None,
            },
        }
    }

    fn next(&self) -> Result<ScriptedTurn, ApiError> {
        let mut turns = self.turns.lock().unwrap();
        if turns.is_empty() {
            return Err(ApiError {
                kind: ApiErrorKind::ServerError,
                message: "scripted provider has no more turns".to_string(),
                param: None,
            });
        }
        Ok(turns.remove(0))
    }
}

#[async_trait]
impl antwort::Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        self.capabilities.clone()
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ApiError> {
        match self.next()? {
            ScriptedTurn::Complete(response) => Ok(response),
            ScriptedTurn::Stream(_) => Err(ApiError {
                kind: ApiErrorKind::ServerError,
                message: "next scripted turn is a stream, not a completion".to_string(),
                param: None,
            }),
        }
    }

    async fn stream(&self, _request: ProviderRequest) -> Result<mpsc::Receiver<ProviderEvent>, ApiError> {
        let events = match self.next()? {
            ScriptedTurn::Stream(events) => events,
            ScriptedTurn::Complete(_) => {
                return Err(ApiError {
                    kind: ApiErrorKind::ServerError,
                    message: "next scripted turn is a completion, not a stream".to_string(),
                    param: None,
                })
            }
        };
        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(async move {
            for event in events {
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }
}

/// A `ToolExecutor` returning one canned result (ok or error) per call,
/// recording every call it received for later assertions.
pub struct ScriptedExecutor {
    tool_name: String,
    kind: ExecutorKind,
    result: Mutex<Result<String, String>>,
    pub calls: Mutex<Vec<ToolCall>>,
}

impl ScriptedExecutor {
    pub fn ok(tool_name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            kind: ExecutorKind::Function,
            result: Mutex::new(Ok(output.into())),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_kind(mut self, kind: ExecutorKind) -> Self {
        self.kind = kind;
        self
    }
}

#[async_trait]
impl ToolExecutor for ScriptedExecutor {
    fn name(&self) -> &str {
        &self.tool_name
    }

    fn kind(&self) -> ExecutorKind {
        self.kind
    }

    async fn execute(&self, call: &ToolCall) -> Result<String, String> {
        self.calls.lock().unwrap().push(call.clone());
        self.result.lock().unwrap().clone()
    }
}

/// A minimal request with one user-text input item and the given model.
pub fn request_with_input(model: &str, text: &str) -> CreateResponseRequest {
    let mut req: CreateResponseRequest = serde_json::from_value(serde_json::json!({})).unwrap();
    req.model = Some(model.to_string());
    req.input.push(Item::user_text("item_in", text));
    req
}
