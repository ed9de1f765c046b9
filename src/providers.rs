//! Provider kinds and per-invocation provider selection.
//!
//! Single source of truth for supported backends, their settings keys and
//! their defaults.

use crate::config::ConfigResolver;
use crate::error::BuddyError;
use std::fmt;
use std::str::FromStr;

/// Settings key naming the active provider
pub const PROVIDER_OPTION_KEY: &str = "generativeAi.option";

/// Supported generative-model backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderKind {
    Gemini,
    Groq,
    Anthropic,
    Ollama,
}

impl ProviderKind {
    /// All available providers
    pub const ALL: &'static [ProviderKind] = &[
        ProviderKind::Gemini,
        ProviderKind::Groq,
        ProviderKind::Anthropic,
        ProviderKind::Ollama,
    ];

    /// Provider name as used in settings and on the CLI
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Gemini => "Gemini",
            Self::Groq => "Groq",
            Self::Anthropic => "Anthropic",
            Self::Ollama => "Ollama",
        }
    }

    /// Settings key holding the credential
    pub const fn api_key_key(&self) -> &'static str {
        match self {
            Self::Gemini => "google.gemini.apiKeys",
            Self::Groq => "groq.llama3.apiKey",
            Self::Anthropic => "anthropic.apiKey",
            Self::Ollama => "ollama.llama3.apiKey",
        }
    }

    /// Settings key holding the model identifier
    pub const fn model_key(&self) -> &'static str {
        match self {
            Self::Gemini => "google.gemini.model",
            Self::Groq => "groq.llama3.model",
            Self::Anthropic => "anthropic.model",
            Self::Ollama => "ollama.llama3.model",
        }
    }

    /// Settings key overriding the backend base URL
    pub const fn base_url_key(&self) -> &'static str {
        match self {
            Self::Gemini => "google.gemini.baseUrl",
            Self::Groq => "groq.baseUrl",
            Self::Anthropic => "anthropic.baseUrl",
            Self::Ollama => "ollama.baseUrl",
        }
    }

    /// Environment variable consulted for the credential
    pub const fn api_key_env(&self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::Groq => "GROQ_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::Ollama => "OLLAMA_API_KEY",
        }
    }

    /// Model written into a fresh config file
    pub const fn default_model(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini-2.0-flash",
            Self::Groq => "llama-3.1-70b-versatile",
            Self::Anthropic => "claude-3-5-sonnet-latest",
            Self::Ollama => "llama3.2",
        }
    }

    pub const fn default_base_url(&self) -> &'static str {
        match self {
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            Self::Groq => "https://api.groq.com",
            Self::Anthropic => "https://api.anthropic.com",
            Self::Ollama => "http://127.0.0.1:11434",
        }
    }

    /// Whether a blank credential or model is rejected before any client is built.
    ///
    /// Gemini and Anthropic build a client anyway and fail on the first call.
    pub const fn requires_credential(&self) -> bool {
        matches!(self, Self::Groq | Self::Ollama)
    }

    /// Session cache key for this provider's conversation history
    pub const fn history_key(&self) -> &'static str {
        match self {
            Self::Gemini => "geminiChatHistory",
            Self::Groq => "groqChatHistory",
            Self::Anthropic => "anthropicChatHistory",
            Self::Ollama => "ollamaChatHistory",
        }
    }

    /// Get all provider names as strings
    pub fn all_names() -> Vec<&'static str> {
        Self::ALL.iter().map(Self::name).collect()
    }
}

impl FromStr for ProviderKind {
    type Err = BuddyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        // "google" is how the Gemini settings are namespaced
        let normalized = if lower == "google" { "gemini" } else { &lower };

        Self::ALL
            .iter()
            .find(|p| p.name().to_lowercase() == normalized)
            .copied()
            .ok_or_else(|| {
                BuddyError::configuration(format!(
                    "unknown provider '{s}', supported: {}",
                    Self::all_names().join(", ")
                ))
            })
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Provider, credential and model resolved for one invocation
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderSelection {
    pub kind: ProviderKind,
    pub credential: String,
    pub model: String,
    /// Backend base URL override, if configured
    pub base_url: Option<String>,
}

// Hand-written so credentials never reach the logs
impl fmt::Debug for ProviderSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSelection")
            .field("kind", &self.kind)
            .field("credential", &if self.credential.is_empty() { "" } else { "***" })
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ProviderSelection {
    /// Read the active provider and its settings.
    ///
    /// Called on every invocation, never cached, so backend and model
    /// changes apply to the next action without a restart.
    pub fn resolve(config: &dyn ConfigResolver) -> Result<Self, BuddyError> {
        let option = config
            .get_config_value(PROVIDER_OPTION_KEY)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| BuddyError::configuration("no generative AI provider selected"))?;
        let kind: ProviderKind = option.parse()?;

        let credential = config
            .get_config_value(kind.api_key_key())
            .map(|value| value.trim().to_string())
            .unwrap_or_default();
        let model = config
            .get_config_value(kind.model_key())
            .map(|value| value.trim().to_string())
            .unwrap_or_default();
        let base_url = config
            .get_config_value(kind.base_url_key())
            .filter(|value| !value.trim().is_empty());

        Ok(Self {
            kind,
            credential,
            model,
            base_url,
        })
    }

    /// Base URL to send requests to
    pub fn effective_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.kind.default_base_url())
            .trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("groq".parse::<ProviderKind>().ok(), Some(ProviderKind::Groq));
        assert_eq!(
            "ANTHROPIC".parse::<ProviderKind>().ok(),
            Some(ProviderKind::Anthropic)
        );
        assert_eq!("google".parse::<ProviderKind>().ok(), Some(ProviderKind::Gemini));
        assert!("openai".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_history_keys_are_distinct() {
        let mut keys: Vec<_> = ProviderKind::ALL.iter().map(ProviderKind::history_key).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), ProviderKind::ALL.len());
    }

    #[test]
    fn test_resolve_reads_active_provider_only() {
        let config = settings(&[
            (PROVIDER_OPTION_KEY, "Groq"),
            ("groq.llama3.apiKey", " gsk-test "),
            ("groq.llama3.model", "llama3-70b-8192"),
            ("anthropic.apiKey", "sk-ant"),
        ]);

        let selection = ProviderSelection::resolve(&config).expect("selection should resolve");
        assert_eq!(selection.kind, ProviderKind::Groq);
        assert_eq!(selection.credential, "gsk-test");
        assert_eq!(selection.model, "llama3-70b-8192");
        assert_eq!(selection.effective_base_url(), "https://api.groq.com");
    }

    #[test]
    fn test_resolve_without_provider_is_configuration_error() {
        let err = ProviderSelection::resolve(&settings(&[])).expect_err("must fail");
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);

        let err = ProviderSelection::resolve(&settings(&[(PROVIDER_OPTION_KEY, "Bard")]))
            .expect_err("must fail");
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
    }

    #[test]
    fn test_debug_hides_credential() {
        let config = settings(&[
            (PROVIDER_OPTION_KEY, "Anthropic"),
            ("anthropic.apiKey", "sk-secret"),
        ]);
        let selection = ProviderSelection::resolve(&config).expect("selection should resolve");
        assert!(!format!("{selection:?}").contains("sk-secret"));
    }
}
