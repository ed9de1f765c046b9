//! Response orchestration.
//!
//! One invocation runs these stages strictly in order, each a hard gate:
//!
//! 1. Resolve the active provider, its credential and model
//! 2. Acquire input (supplied error text, else the selection)
//! 3. Build the prompt through the action
//! 4. Invoke the provider adapter with the remembered history
//! 5. Record the exchange in session memory
//! 6. Post-process and format the answer
//! 7. Deliver it to the active provider's display surface
//!
//! Any stage failure ends the invocation in [`Outcome::Failed`] after exactly
//! one error notification. Nothing is retried.

use crate::actions::Action;
use crate::config::{ConfigResolver, HISTORY_WINDOW_KEY, TIMEOUT_SECONDS_KEY};
use crate::error::{BuddyError, ErrorKind, Result};
use crate::history::{ConversationHistory, DEFAULT_HISTORY_WINDOW};
use crate::host::{DisplayMessage, DisplayRegistry, Notifier, SelectionSource};
use crate::llm_providers::{AdapterRegistry, InvocationResult, ProviderAdapter, ProviderClient};
use crate::memory::SessionMemoryCache;
use crate::providers::{ProviderKind, ProviderSelection};
use crate::{log_debug, log_error, log_warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// Terminal state of one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The formatted answer that was posted to the display surface
    Delivered(String),
    Failed(ErrorKind),
}

impl Outcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered(_))
    }
}

/// Collapse the `|>` artifact models emit in chart edges
pub fn clean_chart_delimiters(text: &str) -> String {
    if text.contains("|>") {
        text.replace("|>", "|")
    } else {
        text.to_string()
    }
}

/// Output of stages 1 to 6
struct Generated {
    kind: ProviderKind,
    text: String,
}

/// Drives actions against the active provider
pub struct ResponseOrchestrator {
    config: Arc<dyn ConfigResolver>,
    selection: Arc<dyn SelectionSource>,
    notifier: Arc<dyn Notifier>,
    displays: DisplayRegistry,
    cache: Arc<SessionMemoryCache>,
    adapters: AdapterRegistry,
    history_window: usize,
    timeout: Option<Duration>,
    history_locks: Mutex<HashMap<ProviderKind, Arc<tokio::sync::Mutex<()>>>>,
}

/// Builder for [`ResponseOrchestrator`]
pub struct ResponseOrchestratorBuilder {
    config: Arc<dyn ConfigResolver>,
    selection: Arc<dyn SelectionSource>,
    notifier: Arc<dyn Notifier>,
    displays: DisplayRegistry,
    cache: Option<Arc<SessionMemoryCache>>,
    adapters: AdapterRegistry,
    history_window: usize,
    timeout: Option<Duration>,
}

impl ResponseOrchestratorBuilder {
    pub fn displays(mut self, displays: DisplayRegistry) -> Self {
        self.displays = displays;
        self
    }

    /// Share an existing session store (normally one per process)
    pub fn cache(mut self, cache: Arc<SessionMemoryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn adapters(mut self, adapters: AdapterRegistry) -> Self {
        self.adapters = adapters;
        self
    }

    /// Window used when the configuration does not set one
    pub fn history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    /// Timeout used when the configuration does not set one
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> ResponseOrchestrator {
        ResponseOrchestrator {
            config: self.config,
            selection: self.selection,
            notifier: self.notifier,
            displays: self.displays,
            cache: self
                .cache
                .unwrap_or_else(|| Arc::new(SessionMemoryCache::new())),
            adapters: self.adapters,
            history_window: self.history_window,
            timeout: self.timeout,
            history_locks: Mutex::new(HashMap::new()),
        }
    }
}

impl ResponseOrchestrator {
    pub fn builder(
        config: Arc<dyn ConfigResolver>,
        selection: Arc<dyn SelectionSource>,
        notifier: Arc<dyn Notifier>,
    ) -> ResponseOrchestratorBuilder {
        ResponseOrchestratorBuilder {
            config,
            selection,
            notifier,
            displays: DisplayRegistry::new(),
            cache: None,
            adapters: AdapterRegistry::default(),
            history_window: DEFAULT_HISTORY_WINDOW,
            timeout: None,
        }
    }

    pub fn cache(&self) -> &Arc<SessionMemoryCache> {
        &self.cache
    }

    /// Remembered turns for `kind` (empty when absent or expired)
    pub fn history(&self, kind: ProviderKind) -> ConversationHistory {
        self.cache.get(kind.history_key()).unwrap_or_default()
    }

    /// Forget the conversation held for `kind`
    pub fn reset_history(&self, kind: ProviderKind) {
        if self.cache.delete(kind.history_key()) {
            log_debug!("Cleared {} chat history", kind);
        }
    }

    /// Run stages 1 to 6 and return the post-processed answer.
    ///
    /// Failures are notified once and come back as `None`.
    pub async fn generate_response(
        &self,
        action: &dyn Action,
        error_text: Option<&str>,
    ) -> Option<String> {
        let span = tracing::info_span!("generate_response", action = %action.kind());
        async {
            self.notifier.show_info(&action.status_message());
            match self.generate(action, error_text).await {
                Ok(generated) => Some(generated.text),
                Err(err) => {
                    self.report(&err);
                    None
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Run every stage and deliver the formatted answer
    pub async fn execute(&self, action: &dyn Action, error_text: Option<&str>) -> Outcome {
        let span = tracing::info_span!("execute", action = %action.kind());
        async {
            self.notifier.show_info(&action.status_message());
            match self.execute_stages(action, error_text).await {
                Ok(delivered) => Outcome::Delivered(delivered),
                Err(err) => {
                    self.report(&err);
                    Outcome::Failed(err.kind())
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute_stages(&self, action: &dyn Action, error_text: Option<&str>) -> Result<String> {
        let generated = self.generate(action, error_text).await?;

        let formatted = action.format_response(&generated.text);
        if formatted.trim().is_empty() {
            return Err(BuddyError::Format(format!(
                "{} produced no displayable output",
                action.kind()
            )));
        }

        self.deliver(generated.kind, &formatted).await;
        Ok(formatted)
    }

    async fn generate(&self, action: &dyn Action, error_text: Option<&str>) -> Result<Generated> {
        // 1. Resolve
        let selection = ProviderSelection::resolve(self.config.as_ref())?;
        log_debug!("Resolved provider: {:?}", selection);
        let adapter = self.adapters.get(selection.kind).ok_or_else(|| {
            BuddyError::configuration(format!("no adapter registered for {}", selection.kind))
        })?;
        let client = adapter.build_client(&selection)?;

        // 2. Acquire input
        let input = self.acquire_input(error_text)?;

        // 3. Build prompt
        let prompt = action
            .create_prompt(&input)
            .filter(|prompt| !prompt.trim().is_empty())
            .ok_or_else(|| {
                BuddyError::Prompt(format!("{} produced an empty prompt", action.kind()))
            })?;

        // 4 and 5. Invoke and record
        let result = self
            .invoke_and_record(adapter.as_ref(), &client, &selection, &prompt)
            .await?;
        log_debug!(
            "{} answered with {} characters (streamed: {})",
            selection.kind,
            result.raw_text.len(),
            result.streamed
        );

        // 6. Post-process
        let text = if action.kind().is_chart() {
            clean_chart_delimiters(&result.raw_text)
        } else {
            result.raw_text
        };

        Ok(Generated {
            kind: selection.kind,
            text,
        })
    }

    fn acquire_input(&self, error_text: Option<&str>) -> Result<String> {
        if let Some(error) = error_text.map(str::trim).filter(|e| !e.is_empty()) {
            return Ok(error.to_string());
        }
        self.selection
            .get_selected_text()
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| BuddyError::Input("no text selected and no error supplied".to_string()))
    }

    /// Stages 4 and 5 under the provider's history lock, so two overlapping
    /// invocations cannot drop each other's turns
    async fn invoke_and_record(
        &self,
        adapter: &dyn ProviderAdapter,
        client: &ProviderClient,
        selection: &ProviderSelection,
        prompt: &str,
    ) -> Result<InvocationResult> {
        let lock = self.history_lock(selection.kind);
        let _guard = lock.lock().await;

        let key = selection.kind.history_key();
        let history = self.cache.get(key).unwrap_or_default();
        log_debug!(
            "Invoking {} with {} remembered turns",
            selection.kind,
            history.len()
        );

        let call = adapter.invoke(client, &history, prompt, &selection.model);
        let outcome = match self.effective_timeout() {
            Some(limit) => tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
                Err(BuddyError::provider(format!(
                    "{} did not answer within {}s",
                    selection.kind,
                    limit.as_secs()
                )))
            }),
            None => call.await,
        };

        let result = match outcome {
            Ok(result) => result,
            Err(err) => {
                // A failed backend leaves the conversation in an unknown state
                self.cache.delete(key);
                return Err(err);
            }
        };

        let updated = history.recorded(prompt, &result.raw_text, self.effective_window());
        self.cache.set(key, updated);
        Ok(result)
    }

    async fn deliver(&self, kind: ProviderKind, formatted: &str) {
        let Some(surface) = self.displays.get(kind) else {
            log_warn!("No display surface registered for {}", kind);
            return;
        };
        if !surface
            .post_message(DisplayMessage::user_input(formatted))
            .await
        {
            log_warn!("{} display surface rejected the message", kind);
        }
    }

    fn report(&self, err: &BuddyError) {
        log_error!("Invocation failed: {}", err);
        self.notifier.show_error(&err.user_message());
    }

    fn history_lock(&self, kind: ProviderKind) -> Arc<tokio::sync::Mutex<()>> {
        self.history_locks.lock().entry(kind).or_default().clone()
    }

    fn effective_window(&self) -> usize {
        self.config
            .get_config_value(HISTORY_WINDOW_KEY)
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(self.history_window)
    }

    fn effective_timeout(&self) -> Option<Duration> {
        match self
            .config
            .get_config_value(TIMEOUT_SECONDS_KEY)
            .and_then(|value| value.trim().parse::<u64>().ok())
        {
            Some(0) => None,
            Some(seconds) => Some(Duration::from_secs(seconds)),
            None => self.timeout,
        }
    }
}
