//! Tool definitions and tool-choice, shared between the OpenResponses
//! request shape and the protocol-neutral provider request.
//!
//! Grounded on the teacher's `Tool`/`OpenAITool`/`OpenAIFunction` structs
//! (`llm/provider.rs`, `llm/openai.rs`).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

/// A tool as it appears in an OpenResponses request. Built-in tool "stubs"
/// (`code_interpreter`, `file_search`, `web_search_preview`) carry an empty
/// `function.name` until expanded via the built-in tool registration table
/// (spec §4.1 rule 8).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolDefinition {
    Function {
        #[serde(flatten)]
        function: FunctionDefinition,
    },
    CodeInterpreter,
    FileSearch,
    WebSearchPreview,
}

impl ToolDefinition {
    pub fn function_name(&self) -> Option<&str> {
        match self {
            ToolDefinition::Function { function } => Some(function.name.as_str()),
            _ => None,
        }
    }
}

/// `tool_choice` as it appears in an OpenResponses request: either the
/// string mode, or `{function: name}` naming a single required function
/// (spec §3). The provider-facing wire shape nests this differently — see
/// `ProviderToolChoice`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolChoice {
    Mode(ToolChoiceMode),
    Named { function: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoiceMode {
    Auto,
    Required,
    None,
}

/// The provider (Chat Completions) wire shape for tool_choice: either the
/// string mode, or `{type:"function", function:{name}}` (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderToolChoice {
    Mode(ToolChoiceMode),
    Named {
        #[serde(rename = "type")]
        kind: String,
        function: NamedToolChoice,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedToolChoice {
    pub name: String,
}

impl From<ToolChoice> for ProviderToolChoice {
    fn from(choice: ToolChoice) -> Self {
        match choice {
            ToolChoice::Mode(mode) => ProviderToolChoice::Mode(mode),
            ToolChoice::Named { function } => ProviderToolChoice::Named {
                kind: "function".to_string(),
                function: NamedToolChoice { name: function },
            },
        }
    }
}

impl ToolChoice {
    pub fn is_none(&self) -> bool {
        matches!(self, ToolChoice::Mode(ToolChoiceMode::None))
    }

    pub fn default_auto() -> Self {
        ToolChoice::Mode(ToolChoiceMode::Auto)
    }
}

/// A provider-facing tool definition, always `{type:"function", function:{...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderTool {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionDefinition,
}

impl ProviderTool {
    pub fn function(def: FunctionDefinition) -> Self {
        Self {
            kind: "function".to_string(),
            function: def,
        }
    }
}
