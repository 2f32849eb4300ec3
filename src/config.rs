//! Configuration surface (spec §6).
//!
//! Grounded on the teacher's `ProviderConfig::default()` pattern
//! (`llm/provider.rs`): a plain struct with a `Default` impl, no builder
//! layer. `from_env` uses only `std::env::var` since the teacher's own
//! dependency set carries no dedicated config-loading crate.

use std::time::Duration;

/// Core engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub default_model: Option<String>,
    pub max_agentic_turns: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_model: None,
            max_agentic_turns: 10,
        }
    }
}

impl EngineConfig {
    /// Load overrides from environment variables:
    /// `ANTWORT_DEFAULT_MODEL`, `ANTWORT_MAX_AGENTIC_TURNS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(model) = std::env::var("ANTWORT_DEFAULT_MODEL") {
            if !model.is_empty() {
                config.default_model = Some(model);
            }
        }
        if let Ok(turns) = std::env::var("ANTWORT_MAX_AGENTIC_TURNS") {
            if let Ok(parsed) = turns.parse() {
                config.max_agentic_turns = parsed;
            }
        }
        config
    }

    /// The effective turn cap for one request: the configured default,
    /// clamped downward by `request.max_tool_calls` when positive and
    /// smaller (spec §4.6).
    pub fn effective_max_turns(&self, request_max_tool_calls: Option<u32>) -> u32 {
        match request_max_tool_calls {
            Some(n) if n > 0 && n < self.max_agentic_turns => n,
            _ => self.max_agentic_turns,
        }
    }
}

/// Configuration for the Chat Completions provider adapter (spec §6).
#[derive(Debug, Clone)]
pub struct ChatCompletionsConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub max_retries: u32,
}

#[derive(Debug, thiserror::Error)]
#[error("chat completions provider misconfigured: {0}")]
pub struct ConfigError(pub String);

impl ChatCompletionsConfig {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ConfigError> {
        let base_url = base_url.into();
        if base_url.is_empty() {
            return Err(ConfigError("base_url is required".to_string()));
        }
        Ok(Self {
            base_url,
            api_key: None,
            timeout: Duration::from_secs(120),
            max_retries: 0,
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_max_turns_clamps_downward() {
        let config = EngineConfig {
            default_model: None,
            max_agentic_turns: 10,
        };
        assert_eq!(config.effective_max_turns(Some(3)), 3);
        assert_eq!(config.effective_max_turns(Some(0)), 10);
        assert_eq!(config.effective_max_turns(None), 10);
        assert_eq!(config.effective_max_turns(Some(100)), 10);
    }

    #[test]
    fn missing_base_url_is_a_config_error() {
        let err = ChatCompletionsConfig::new("").unwrap_err();
        assert!(err.0.contains("base_url"));
    }
}
