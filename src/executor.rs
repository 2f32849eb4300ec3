//! `ToolExecutor` — the tool-executor seam (spec §1, §4.6, §9).
//!
//! Concrete tool implementations (shell, file-search, MCP bridges, ...) are
//! explicit external collaborators; the core only defines the trait and the
//! `Function | Builtin | MCP` kind tag used for streaming-lifecycle
//! dispatch (spec §4.6's "streaming addendum", §9's "capability-based
//! dispatch ... is a sealed tag on the executor value").

use async_trait::async_trait;

use crate::error::ApiError;
use crate::model::{ToolCall, ToolDefinition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorKind {
    Function,
    Builtin,
    Mcp,
}

/// The outcome of executing one tool call (spec §4.6 step 8).
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub call_id: String,
    pub output: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn ok(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            output: output.into(),
            is_error: false,
        }
    }

    pub fn error(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            output: output.into(),
            is_error: true,
        }
    }
}

#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// The tool name this executor handles (matched against
    /// `FunctionCall.name`).
    fn name(&self) -> &str;

    fn kind(&self) -> ExecutorKind;

    /// Execute one call. Executor errors are never fatal to the request
    /// (spec §7): callers convert `Err` into an `is_error: true`
    /// `ToolResult` and feed it back to the model.
    async fn execute(&self, call: &ToolCall) -> Result<String, String>;

    /// For `ExecutorKind::Mcp` executors: the tool definitions they expose,
    /// discovered lazily on first request (spec §4.5 step 3). Non-MCP
    /// executors don't override this.
    async fn discover_tools(&self) -> Result<Vec<ToolDefinition>, ApiError> {
        Ok(Vec::new())
    }
}
