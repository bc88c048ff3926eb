//! Provider abstraction: one capability contract over ~24 HTTP backends.
//!
//! Every backend is the same generic HTTP adapter parameterized by a
//! declarative [`ProviderDescriptor`]; the per-vendor differences (auth
//! scheme, endpoint construction, body field names, response shape) live in
//! data, not in subclasses.

pub mod auth;
pub mod classify;
pub mod descriptor;
pub mod http;
pub mod retry;

use async_trait::async_trait;

use crate::error::AiError;

pub use auth::Credential;
pub use classify::{classify_message, classify_status, redact_credentials};
pub use descriptor::{ProviderDescriptor, ProviderKind, RequestStyle};
pub use http::HttpGenerator;
pub use retry::generate_with_retry;

/// Message author role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One message in a conversation.
///
/// A conversation is an insertion-ordered list of messages, mutated only by
/// appending (regenerate/feedback loops push onto the end); it is never
/// reordered or deduplicated.
#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One generation call's inputs.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub messages: Vec<Message>,
    /// Sampling temperature in [0, 1].
    pub temperature: f32,
    /// Maximum output tokens (> 0).
    pub max_tokens: u32,
    /// Provider-specific parameters, passed through to the request body
    /// verbatim.
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: crate::config::DEFAULT_TEMPERATURE,
            max_tokens: crate::config::DEFAULT_MAX_TOKENS,
            extra: serde_json::Map::new(),
        }
    }
}

/// The single capability contract every backend implements.
///
/// A successful result is always non-empty text; adapters convert null or
/// empty content into a `model`-kind [`AiError`] instead of returning it.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, AiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_as_str() {
        assert_eq!(Role::System.as_str(), "system");
        assert_eq!(Role::User.as_str(), "user");
        assert_eq!(Role::Assistant.as_str(), "assistant");
    }

    #[test]
    fn test_request_defaults() {
        let req = GenerationRequest::new("gpt-4o", vec![Message::user("hi")]);
        assert!(req.extra.is_empty());
        assert!(req.max_tokens > 0);
        assert!((0.0..=1.0).contains(&req.temperature));
    }
}
