//! Provider adapters: one per backend.
//!
//! An adapter knows how to build a client from the resolved selection, how
//! to shape a chat request in its backend's native format and how to pull a
//! plain-text answer back out. The orchestrator only ever talks to the
//! [`ProviderAdapter`] trait and picks the implementation through an
//! [`AdapterRegistry`] lookup keyed on [`ProviderKind`].

mod anthropic;
mod gemini;
mod groq;
mod ollama;

pub use anthropic::AnthropicAdapter;
pub use gemini::GeminiAdapter;
pub use groq::GroqAdapter;
pub use ollama::{ChunkDecoder, OllamaAdapter, drain_chat_stream};

use crate::error::{BuddyError, Result};
use crate::history::{ChatTurn, ConversationHistory};
use crate::log_debug;
use crate::providers::{ProviderKind, ProviderSelection};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A complete answer from a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    pub raw_text: String,
    /// Whether the answer was assembled from a token stream
    pub streamed: bool,
}

impl InvocationResult {
    pub fn complete(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            streamed: false,
        }
    }

    pub fn streamed(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            streamed: true,
        }
    }
}

/// Backend-specific client handle built fresh for each invocation
#[derive(Clone)]
pub struct ProviderClient {
    http: Client,
    kind: ProviderKind,
    credential: String,
    base_url: String,
}

impl fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderClient")
            .field("kind", &self.kind)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ProviderClient {
    pub fn new(selection: &ProviderSelection) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("codebuddy/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BuddyError::configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            kind: selection.kind,
            credential: selection.credential.clone(),
            base_url: selection.effective_base_url().to_string(),
        })
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// How one backend is driven
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Whether remembered turns are sent back with each request.
    ///
    /// Gemini only ever receives the new prompt; its history lives in the
    /// session cache alone.
    fn sends_history_inline(&self) -> bool {
        true
    }

    /// Construct a client handle for `selection`.
    ///
    /// Backends that require a credential reject a blank credential or
    /// model here, before any network traffic.
    fn build_client(&self, selection: &ProviderSelection) -> Result<ProviderClient> {
        let kind = self.kind();
        if kind.requires_credential() {
            if selection.credential.is_empty() {
                return Err(BuddyError::configuration(format!(
                    "missing API key for {kind} ({})",
                    kind.api_key_key()
                )));
            }
            if selection.model.is_empty() {
                return Err(BuddyError::configuration(format!(
                    "missing model name for {kind} ({})",
                    kind.model_key()
                )));
            }
        }
        ProviderClient::new(selection)
    }

    /// Turns that go on the wire: history (when sent inline) then the new prompt
    fn request_turns(&self, history: &ConversationHistory, prompt: &str) -> Vec<ChatTurn> {
        if self.sends_history_inline() {
            history.with_turn(ChatTurn::user(prompt))
        } else {
            vec![ChatTurn::user(prompt)]
        }
    }

    /// The native request body for this backend
    fn build_request(&self, history: &ConversationHistory, prompt: &str, model: &str) -> Value;

    /// Send the conversation and return the complete answer
    async fn invoke(
        &self,
        client: &ProviderClient,
        history: &ConversationHistory,
        prompt: &str,
        model: &str,
    ) -> Result<InvocationResult>;
}

/// Adapter lookup keyed on provider kind
#[derive(Clone)]
pub struct AdapterRegistry {
    adapters: HashMap<ProviderKind, Arc<dyn ProviderAdapter>>,
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(GeminiAdapter));
        registry.register(Arc::new(GroqAdapter));
        registry.register(Arc::new(AnthropicAdapter));
        registry.register(Arc::new(OllamaAdapter));
        registry
    }
}

impl AdapterRegistry {
    pub fn empty() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Install `adapter` for its kind, replacing any previous one
    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(adapter.kind(), adapter);
    }

    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(&kind).cloned()
    }
}

/// POST `body` and return the decoded JSON response
pub(crate) async fn post_json(
    kind: ProviderKind,
    request: reqwest::RequestBuilder,
    body: &Value,
) -> Result<Value> {
    let response = request
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await?;

    let response = ensure_success(kind, response).await?;
    Ok(response.json().await?)
}

pub(crate) async fn ensure_success(
    kind: ProviderKind,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    log_debug!("{} request failed with status {}: {}", kind, status, text);
    Err(BuddyError::provider(format!(
        "{kind} API request failed with status {status}: {text}"
    )))
}

/// A blank answer is a malformed response, never an empty success
pub(crate) fn require_text(kind: ProviderKind, text: Option<String>) -> Result<String> {
    match text {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(BuddyError::provider(format!(
            "malformed response from {kind}: no answer text"
        ))),
    }
}
