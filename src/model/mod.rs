//! The wire-level and protocol-neutral data model (spec §3).

pub mod item;
pub mod provider_types;
pub mod request;
pub mod response;
pub mod stream_event;
pub mod tool;

pub use item::{ContentPart, Item, ItemKind, ItemStatus, MessageRole, OutputContentPart, ToolCall};
pub use provider_types::{
    ContentBlock, ImageUrl, MessageContent, ProviderFunctionCall, ProviderMessage,
    ProviderRequest, ProviderResponse, ProviderResponseStatus, ProviderToolCall, ResponseFormat,
};
pub use request::{CreateResponseRequest, ReasoningOptions, StreamOptions, TextFormat, TextOptions, Truncation};
pub use response::{IncompleteDetails, Response, ResponseError, ResponseStatus, Usage};
pub use stream_event::{StreamEvent, ToolLifecycleKind, ToolLifecyclePhase};
pub use tool::{
    FunctionDefinition, NamedToolChoice, ProviderTool, ProviderToolChoice, ToolChoice,
    ToolChoiceMode, ToolDefinition,
};

pub use provider_types::ProviderEvent;
