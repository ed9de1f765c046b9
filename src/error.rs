//! Error taxonomy for a single action invocation.
//!
//! Every stage of the orchestrator fails with exactly one of these variants.
//! They are caught at the orchestrator boundary and turned into one
//! user-visible notification; callers only ever see an absent result.

use std::fmt;

/// Failure raised by one stage of an invocation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuddyError {
    /// Missing or invalid provider selection or credentials
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// No selection and no error text supplied
    #[error("Input error: {0}")]
    Input(String),
    /// The action's prompt builder produced nothing
    #[error("Prompt error: {0}")]
    Prompt(String),
    /// Network, auth or malformed-response failure from a backend
    #[error("Provider error: {0}")]
    Provider(String),
    /// Post-processing left nothing to display
    #[error("Format error: {0}")]
    Format(String),
}

/// Fieldless mirror of [`BuddyError`], used for terminal states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Input,
    Prompt,
    Provider,
    Format,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configuration => "configuration",
            Self::Input => "input",
            Self::Prompt => "prompt",
            Self::Provider => "provider",
            Self::Format => "format",
        };
        write!(f, "{name}")
    }
}

impl BuddyError {
    pub fn configuration(detail: impl Into<String>) -> Self {
        Self::Configuration(detail.into())
    }

    pub fn provider(detail: impl Into<String>) -> Self {
        Self::Provider(detail.into())
    }

    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Input(_) => ErrorKind::Input,
            Self::Prompt(_) => ErrorKind::Prompt,
            Self::Provider(_) => ErrorKind::Provider,
            Self::Format(_) => ErrorKind::Format,
        }
    }

    /// Text shown through the notification sink.
    ///
    /// Provider details can contain raw response bodies, so only the
    /// configuration and input messages echo their detail.
    pub fn user_message(&self) -> String {
        match self {
            Self::Configuration(detail) => format!(
                "Configuration not found: {detail}. Go to settings, search for CodeBuddy and fill in the provider, model and API key."
            ),
            Self::Input(_) => "Select a piece of code first.".to_string(),
            Self::Prompt(_) | Self::Format(_) => {
                "Model not responding, try again later.".to_string()
            }
            Self::Provider(_) => {
                "An error occurred while generating the response. Check your API key and model name, then try again."
                    .to_string()
            }
        }
    }
}

impl From<reqwest::Error> for BuddyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Provider(format!("request timed out: {err}"))
        } else if err.is_decode() {
            Self::Provider(format!("malformed response: {err}"))
        } else {
            Self::Provider(err.to_string())
        }
    }
}

pub type Result<T, E = BuddyError> = std::result::Result<T, E>;
