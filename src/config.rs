//! Typed inputs for a generation run: the `provider:model` identifier and
//! the knobs that apply to every backend call.

use std::time::Duration;

use crate::error::AiError;

/// Default sampling temperature for commit message generation.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default cap on generated tokens.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Default number of attempts for the top-level generation call.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default per-HTTP-call timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default token budget for the preprocessed diff sent to the backend.
pub const DEFAULT_DIFF_TOKEN_BUDGET: usize = 6000;

/// A parsed `provider:modelname` identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelId {
    pub provider: String,
    pub model: String,
}

impl ModelId {
    /// Parse `provider:modelname`. Both halves must be non-empty.
    ///
    /// Model names may themselves contain colons (e.g. ollama tags like
    /// `llama3:8b`), so only the first colon splits.
    pub fn parse(raw: &str) -> Result<Self, AiError> {
        let Some((provider, model)) = raw.split_once(':') else {
            return Err(AiError::config(format!(
                "Invalid model identifier '{raw}': expected 'provider:modelname'"
            )));
        };

        let provider = provider.trim();
        let model = model.trim();
        if provider.is_empty() || model.is_empty() {
            return Err(AiError::config(format!(
                "Invalid model identifier '{raw}': provider and model must both be non-empty"
            )));
        }

        Ok(Self {
            provider: provider.to_string(),
            model: model.to_string(),
        })
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.provider, self.model)
    }
}

/// Knobs shared by every generation call.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Sampling temperature, clamped to [0, 1].
    pub temperature: f32,
    /// Maximum output tokens; must be > 0.
    pub max_tokens: u32,
    /// Total attempts for the top-level commit-message generation.
    pub max_retries: u32,
    /// Per-HTTP-call timeout.
    pub timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl GenerationConfig {
    /// Validate ranges, returning a config-kind error on violation.
    pub fn validate(&self) -> Result<(), AiError> {
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(AiError::config(format!(
                "temperature must be within [0, 1], got {}",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(AiError::config("max_tokens must be greater than 0"));
        }
        Ok(())
    }
}
