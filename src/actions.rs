//! Editor actions.
//!
//! An action is a thin specialization of the orchestrator: it supplies a
//! prompt for the selected text and shapes the raw answer for display.
//! Everything else (provider resolution, history, invocation) is shared.

use crate::prompts::PromptLibrary;
use std::fmt;
use std::str::FromStr;

/// Prefix of every "work in progress" notification
pub const USER_MESSAGE: &str = "☕️ Hold on while CodeBuddy";

/// Built-in actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Comment,
    Review,
    Refactor,
    Optimize,
    Explain,
    Fix,
    InterviewMe,
    UnitTest,
    Chart,
}

impl ActionKind {
    pub const ALL: &'static [ActionKind] = &[
        ActionKind::Comment,
        ActionKind::Review,
        ActionKind::Refactor,
        ActionKind::Optimize,
        ActionKind::Explain,
        ActionKind::Fix,
        ActionKind::InterviewMe,
        ActionKind::UnitTest,
        ActionKind::Chart,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::Review => "review",
            Self::Refactor => "refactor",
            Self::Optimize => "optimize",
            Self::Explain => "explain",
            Self::Fix => "fix",
            Self::InterviewMe => "interview-me",
            Self::UnitTest => "unit-test",
            Self::Chart => "chart",
        }
    }

    /// What CodeBuddy is doing, completing [`USER_MESSAGE`]
    const fn progress(&self) -> &'static str {
        match self {
            Self::Comment => "generates the code comments...",
            Self::Review => "reviews the code...",
            Self::Refactor => "refactors the code...",
            Self::Optimize => "optimizes the code...",
            Self::Explain => "explains the code...",
            Self::Fix => "finds a solution to the error...",
            Self::InterviewMe => "generates interview questions...",
            Self::UnitTest => "generates unit tests...",
            Self::Chart => "generates a code chart...",
        }
    }

    /// Whether answers need the chart delimiter clean-up
    pub const fn is_chart(&self) -> bool {
        matches!(self, Self::Chart)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase().replace('_', "-");
        Self::ALL
            .iter()
            .find(|kind| kind.name() == lower)
            .copied()
            .ok_or_else(|| format!("Unknown action: {s}"))
    }
}

/// An editor action driven by the orchestrator
pub trait Action: Send + Sync {
    fn kind(&self) -> ActionKind;

    /// Shown through the notifier when the action starts
    fn status_message(&self) -> String {
        format!("{USER_MESSAGE} {}", self.kind().progress())
    }

    /// Build the provider input from selected text or an error string
    fn create_prompt(&self, input: &str) -> Option<String>;

    /// Shape the raw answer for display
    fn format_response(&self, response: &str) -> String;
}

/// Standard action backed by the prompt library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptAction {
    kind: ActionKind,
}

impl PromptAction {
    pub const fn new(kind: ActionKind) -> Self {
        Self { kind }
    }
}

impl Action for PromptAction {
    fn kind(&self) -> ActionKind {
        self.kind
    }

    fn create_prompt(&self, input: &str) -> Option<String> {
        PromptLibrary::for_action(self.kind, input)
    }

    fn format_response(&self, response: &str) -> String {
        let trimmed = response.trim();
        if self.kind.is_chart() && !trimmed.is_empty() && !trimmed.starts_with("```") {
            format!("```mermaid\n{trimmed}\n```")
        } else {
            trimmed.to_string()
        }
    }
}
