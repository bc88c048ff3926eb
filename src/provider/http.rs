//! The generic HTTP adapter behind every backend.
//!
//! One POST per generation call. The request body and response parsing are
//! driven entirely by the backend's [`ProviderDescriptor`]; there is no
//! per-vendor subclass. Credentials travel only in headers.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::error::AiError;
use crate::provider::auth::{self, Credential};
use crate::provider::classify::{classify_status, classify_transport};
use crate::provider::descriptor::{AuthStyle, ProviderDescriptor, ProviderKind, RequestStyle};
use crate::provider::{GenerationRequest, Message, Role, TextGenerator};

/// HTTP adapter for one backend.
pub struct HttpGenerator {
    descriptor: ProviderDescriptor,
    endpoint: String,
    credential: Credential,
    client: reqwest::Client,
}

impl HttpGenerator {
    /// Construct an adapter, resolving endpoint and credentials up front.
    ///
    /// Missing environment values surface here as `config` /
    /// `authentication` errors, before any network traffic.
    pub fn new(kind: ProviderKind, timeout: Duration) -> Result<Self, AiError> {
        let descriptor = kind.descriptor();
        let endpoint = descriptor.url.resolve()?;
        let credential = auth::resolve(&descriptor)?;
        Self::build(descriptor, endpoint, credential, timeout)
    }

    /// Construct against an explicit endpoint and credential.
    ///
    /// Used by tests (mock servers) and by callers that manage credentials
    /// themselves.
    pub fn with_endpoint(
        kind: ProviderKind,
        endpoint: impl Into<String>,
        credential: Credential,
        timeout: Duration,
    ) -> Result<Self, AiError> {
        Self::build(kind.descriptor(), endpoint.into(), credential, timeout)
    }

    fn build(
        descriptor: ProviderDescriptor,
        endpoint: String,
        credential: Credential,
        timeout: Duration,
    ) -> Result<Self, AiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AiError::unknown(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            descriptor,
            endpoint,
            credential,
            client,
        })
    }

    pub fn provider_name(&self) -> &'static str {
        self.descriptor.name
    }

    /// Apply the vendor prefix rewrite when the model lacks a namespace.
    fn effective_model(&self, model: &str) -> String {
        match self.descriptor.model_prefix {
            Some(prefix) if !model.contains('/') => format!("{prefix}{model}"),
            _ => model.to_string(),
        }
    }

    /// Enforce the pinned-system exception for subscription-OAuth backends:
    /// the system slot gets the fixed literal, and whatever the caller put
    /// there moves to the front of the first user message.
    fn shape_messages(&self, messages: &[Message]) -> Vec<Message> {
        let Some(pinned) = self.descriptor.pinned_system else {
            return messages.to_vec();
        };

        let caller_system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();

        let mut shaped: Vec<Message> = vec![Message::system(pinned)];
        let mut relocated = caller_system.join("\n\n");
        for message in messages.iter().filter(|m| m.role != Role::System) {
            if message.role == Role::User && !relocated.is_empty() {
                shaped.push(Message::user(format!("{relocated}\n\n{}", message.content)));
                relocated = String::new();
            } else {
                shaped.push(message.clone());
            }
        }
        if !relocated.is_empty() {
            shaped.push(Message::user(relocated));
        }
        shaped
    }

    fn build_body(&self, request: &GenerationRequest, messages: &[Message]) -> Value {
        let mut body = Map::new();
        body.insert("model".into(), json!(self.effective_model(&request.model)));
        body.insert("temperature".into(), json!(request.temperature));
        body.insert(
            self.descriptor.max_tokens_field.into(),
            json!(request.max_tokens),
        );

        match self.descriptor.style {
            RequestStyle::ChatCompletions => {
                let entries: Vec<Value> = messages
                    .iter()
                    .map(|m| json!({"role": m.role.as_str(), "content": m.content}))
                    .collect();
                body.insert("messages".into(), Value::Array(entries));
            }
            RequestStyle::Messages => {
                let system: Vec<&str> = messages
                    .iter()
                    .filter(|m| m.role == Role::System)
                    .map(|m| m.content.as_str())
                    .collect();
                if !system.is_empty() {
                    body.insert("system".into(), json!(system.join("\n\n")));
                }
                let entries: Vec<Value> = messages
                    .iter()
                    .filter(|m| m.role != Role::System)
                    .map(|m| json!({"role": m.role.as_str(), "content": m.content}))
                    .collect();
                body.insert("messages".into(), Value::Array(entries));
            }
        }

        // Provider-specific extras pass through verbatim.
        for (key, value) in &request.extra {
            body.insert(key.clone(), value.clone());
        }

        Value::Object(body)
    }

    fn apply_headers(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let mut builder = builder;
        match &self.credential {
            // OAuth tokens always travel as a bearer, even when the static
            // key would use a vendor header.
            Credential::OauthToken(token) => {
                builder = builder.header("Authorization", format!("Bearer {token}"));
            }
            Credential::Key(key) => match self.descriptor.auth {
                AuthStyle::Bearer | AuthStyle::None => {
                    builder = builder.header("Authorization", format!("Bearer {key}"));
                }
                AuthStyle::Header(name) => {
                    builder = builder.header(name, key);
                }
            },
            Credential::None => {}
        }
        for (name, value) in self.descriptor.extra_headers {
            builder = builder.header(*name, *value);
        }
        builder
    }

    fn parse_response(&self, value: &Value) -> Result<String, AiError> {
        let content = match self.descriptor.style {
            RequestStyle::ChatCompletions => value
                .pointer("/choices/0/message")
                .map(|message| &message["content"])
                .ok_or_else(|| {
                    self.model_error("unexpected response shape: missing choices[0].message")
                })?,
            RequestStyle::Messages => &value["content"],
        };

        self.extract_text(content)
    }

    /// Extract text from a content node that may be a flat string or a list
    /// of typed parts. Null and empty are errors, never valid results.
    fn extract_text(&self, content: &Value) -> Result<String, AiError> {
        let text = match content {
            Value::Null => return Err(self.model_error("backend returned null content")),
            Value::String(s) => s.clone(),
            Value::Array(parts) => parts
                .iter()
                .filter_map(|part| {
                    // Typed parts: {"type": "text", "text": "..."}; tolerate
                    // bare strings as well.
                    part.get("text")
                        .and_then(Value::as_str)
                        .or_else(|| part.as_str())
                })
                .collect::<Vec<_>>()
                .join(""),
            _ => return Err(self.model_error("unexpected response shape: content field")),
        };

        if text.trim().is_empty() {
            return Err(self.model_error("backend returned empty content"));
        }
        Ok(text)
    }

    fn model_error(&self, detail: &str) -> AiError {
        AiError::model(format!("{}: {detail}", self.descriptor.name))
    }
}

#[async_trait]
impl TextGenerator for HttpGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, AiError> {
        let messages = self.shape_messages(&request.messages);
        let body = self.build_body(request, &messages);

        debug!(
            provider = self.descriptor.name,
            model = %request.model,
            messages = messages.len(),
            "sending generation request"
        );

        let response = self
            .apply_headers(self.client.post(&self.endpoint))
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport(self.descriptor.name, &e))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| classify_transport(self.descriptor.name, &e))?;

        if !(200..300).contains(&status) {
            return Err(classify_status(self.descriptor.name, status, &text));
        }

        let value: Value = serde_json::from_str(&text)
            .map_err(|e| self.model_error(&format!("response was not valid JSON: {e}")))?;

        self.parse_response(&value)
    }
}
