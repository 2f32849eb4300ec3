//! The `Provider` seam: one trait implemented by each concrete backend
//! adapter (spec §1, §4.5).
//!
//! Grounded on the teacher's `LLMProvider` trait (`llm/provider.rs`),
//! trimmed to the operations the engine actually drives (no `chat`,
//! `prompt_cache`, `compact`, or history accessors — those are teacher-only
//! conveniences with no counterpart here) and generalized from
//! provider-specific types to the protocol-neutral `ProviderRequest`/
//! `ProviderResponse`/`ProviderEvent`.

pub mod chat_completions;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::capability::ProviderCapabilities;
use crate::error::ApiError;
use crate::model::{ProviderEvent, ProviderRequest, ProviderResponse};

pub use chat_completions::ChatCompletionsProvider;

/// One entry of `Provider::list_models` (spec §6).
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub id: String,
}

/// One backend LLM API, reduced to what the engine orchestrator needs.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    fn capabilities(&self) -> ProviderCapabilities;

    /// Non-streaming completion (spec §4.2's input).
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ApiError>;

    /// Streaming completion: the returned receiver yields `ProviderEvent`s
    /// as they are parsed off the wire (spec §4.3). The channel is bounded;
    /// a slow consumer applies backpressure to the underlying HTTP read
    /// rather than buffering unboundedly.
    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> Result<mpsc::Receiver<ProviderEvent>, ApiError>;

    /// Enumerate models the backend currently serves. Not on the engine's
    /// critical path; adapters that can't cheaply enumerate models may
    /// return an empty list.
    async fn list_models(&self) -> Result<Vec<ModelInfo>, ApiError> {
        Ok(Vec::new())
    }

    /// Release any held resources (connection pools, background tasks).
    /// Most adapters have nothing to do here.
    async fn close(&self) {}
}
