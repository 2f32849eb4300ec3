//! Antwort: a gateway translating the OpenResponses protocol onto
//! OpenAI-compatible chat completion backends (spec §1).
//!
//! The [`Engine`] is the single entry point: it validates a
//! [`model::CreateResponseRequest`], translates it to the protocol-neutral
//! provider model, drives a [`provider::Provider`] (optionally looping over
//! tool calls via registered [`executor::ToolExecutor`]s), and writes the
//! result through a [`writer::ResponseWriter`].

pub mod agentic;
pub mod capability;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod history;
pub mod ids;
pub mod metrics;
pub mod model;
pub mod provider;
pub mod store;
pub mod stream;
pub mod translate;
pub mod writer;

pub use capability::ProviderCapabilities;
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{ApiError, ApiErrorKind};
pub use executor::{ExecutorKind, ToolExecutor, ToolResult};
pub use metrics::{MetricsSink, NoopMetrics};
pub use model::{CreateResponseRequest, Response, ResponseStatus, StreamEvent};
pub use provider::{ChatCompletionsProvider, Provider};
pub use store::ResponseStore;
pub use writer::ResponseWriter;
