//! Capability validation (spec §4.8) — pre-flight checks run before any
//! backend call.
//!
//! Grounded on the `ProviderError::{ToolCallingNotSupported,
//! CachingNotSupported}` vocabulary already present in the teacher's
//! `llm/provider.rs`, turned into a single proactive pass over the request.

use crate::error::ApiError;
use crate::model::{ContentPart, CreateResponseRequest, ItemKind};

#[derive(Debug, Clone, Default)]
pub struct ProviderCapabilities {
    pub streaming: bool,
    pub tool_calling: bool,
    pub vision: bool,
    pub audio: bool,
    pub reasoning: bool,
    pub max_context_window: Option<u32>,
    pub supported_models: Option<Vec<String>>,
}

/// Validate `request` against `caps`, failing fast with the first
/// unsupported feature encountered (spec §4.8 checks each in order: stream,
/// tools, then per-part vision/audio).
pub fn validate_request(
    request: &CreateResponseRequest,
    caps: &ProviderCapabilities,
) -> Result<(), ApiError> {
    if request.stream && !caps.streaming {
        return Err(ApiError::invalid_request(
            "stream",
            "this backend does not support streaming responses",
        ));
    }

    if !request.tools.is_empty() && !caps.tool_calling {
        return Err(ApiError::invalid_request(
            "tools",
            "this backend does not support tool calling",
        ));
    }

    for item in &request.input {
        if let ItemKind::Message { inbound_parts, .. } = &item.kind {
            for part in inbound_parts {
                match part {
                    ContentPart::InputImage { .. } if !caps.vision => {
                        return Err(ApiError::invalid_request(
                            "input",
                            "this backend does not support image input",
                        ));
                    }
                    ContentPart::InputAudio { .. } if !caps.audio => {
                        return Err(ApiError::invalid_request(
                            "input",
                            "this backend does not support audio input",
                        ));
                    }
                    ContentPart::InputVideo { .. } if !caps.vision => {
                        return Err(ApiError::invalid_request(
                            "input",
                            "this backend does not support video input",
                        ));
                    }
                    _ => {}
                }
            }
        }
    }

    Ok(())
}
