//! Conversation turns and the bounded per-provider history.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Turns kept per provider when nothing else is configured
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

/// Role of a turn, normalized across backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

/// One role-tagged message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    role: ChatRole,
    content: String,
}

impl ChatTurn {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, content)
    }

    pub fn role(&self) -> ChatRole {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Ordered turns for one provider, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationHistory {
    turns: VecDeque<ChatTurn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> impl ExactSizeIterator<Item = &ChatTurn> {
        self.turns.iter()
    }

    pub fn push(&mut self, turn: ChatTurn) {
        self.turns.push_back(turn);
    }

    /// Drop the oldest turns until at most `window` remain.
    ///
    /// An answer whose question was evicted goes with it, so the history
    /// never opens on an assistant turn.
    pub fn truncate_to_window(&mut self, window: usize) {
        while self.turns.len() > window {
            self.turns.pop_front();
        }
        while self
            .turns
            .front()
            .is_some_and(|turn| turn.role() == ChatRole::Assistant)
        {
            self.turns.pop_front();
        }
    }

    /// This history followed by `turn`, without touching `self`
    pub fn with_turn(&self, turn: ChatTurn) -> Vec<ChatTurn> {
        self.turns
            .iter()
            .cloned()
            .chain(std::iter::once(turn))
            .collect()
    }

    /// Copy of this history with a completed exchange appended and the
    /// window applied
    pub fn recorded(&self, prompt: &str, response: &str, window: usize) -> Self {
        let mut next = self.clone();
        next.push(ChatTurn::user(prompt));
        next.push(ChatTurn::assistant(response));
        next.truncate_to_window(window);
        next
    }
}

impl FromIterator<ChatTurn> for ConversationHistory {
    fn from_iter<I: IntoIterator<Item = ChatTurn>>(iter: I) -> Self {
        Self {
            turns: iter.into_iter().collect(),
        }
    }
}
